//! # Groundwork
//!
//! A retrieval-augmented question answering engine with cached embeddings
//! and grounded, source-attributed answers.
//!
//! Groundwork ingests free-text documents, splits them into retrievable
//! chunks, embeds and durably caches those chunks, ranks them against a
//! query by cosine similarity, and synthesizes a grounded answer with
//! traceable sources and a deterministic confidence score.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────────────┐   ┌───────────────┐
//! │ Documents │──▶│ Segment + Embed     │──▶│ Knowledge     │
//! │ (ingest)  │   │ (fingerprint cache) │   │ Store (RAM)   │
//! └───────────┘   └────────────────────┘   └──────┬────────┘
//!                                                 │
//! ┌───────────┐   ┌────────────────────┐   ┌──────▼────────┐
//! │ Question  │──▶│ Embed + Rank        │──▶│ Synthesize    │──▶ Answer
//! │ (ask)     │   │ (cosine, threshold) │   │ (generation)  │
//! └───────────┘   └────────────────────┘   └───────────────┘
//! ```
//!
//! The embedding and generation models are external services behind the
//! narrow [`embedding::EmbeddingProvider`] and
//! [`generation::GenerationProvider`] traits; either can be swapped or
//! mocked without touching retrieval or ranking logic. The only durable
//! state is the embedding cache, a single JSON file keyed by chunk-text
//! fingerprint.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Engine error taxonomy |
//! | [`segment`] | Lossless bounded-size text segmentation |
//! | [`cache`] | Durable fingerprint-keyed embedding cache |
//! | [`embedding`] | Embedding provider adapters + cosine similarity |
//! | [`generation`] | Generation provider adapters |
//! | [`store`] | In-memory knowledge store |
//! | [`rank`] | Similarity ranking and relevance scoring |
//! | [`synthesize`] | Context assembly, prompting, confidence |
//! | [`status`] | TTL-cached provider health monitor |
//! | [`engine`] | Ingest / search / ask orchestration |
//! | [`server`] | JSON HTTP API |

pub mod cache;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod generation;
pub mod models;
pub mod rank;
pub mod segment;
pub mod server;
pub mod status;
pub mod store;
pub mod synthesize;
