//! Core data models used throughout Groundwork.
//!
//! These types represent the documents, chunks, search hits, and answers
//! that flow through the ingestion and question-answering pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who may see a document's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Public,
    Private,
}

/// Raw ingestion payload, validated at the API boundary.
///
/// `title`, `source`, `url`, and `text` are required and must be non-empty;
/// everything else has a sensible default. `metadata` is an open extension
/// map — insertion order is irrelevant and no key is interpreted by the
/// engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub title: String,
    pub source: String,
    pub url: String,
    #[serde(default)]
    pub access: AccessLevel,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Normalized document held in the knowledge store.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    /// Monotonic insertion sequence, used as a ranking tie-break.
    /// A re-ingested document keeps its original sequence.
    pub seq: u64,
    pub title: String,
    pub category: String,
    pub source: String,
    pub url: String,
    pub access: AccessLevel,
    pub text: String,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bounded-size slice of a document's text, the atomic retrievable unit.
///
/// Invariant: `embedding` is always derived from text matching the current
/// `fingerprint`; a fingerprint mismatch against the cache means the cached
/// vector is stale and must be recomputed.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    /// Position within the document. Concatenating chunk texts in ordinal
    /// order reproduces the document text exactly.
    pub ordinal: usize,
    pub text: String,
    /// SHA-256 hex digest of the exact chunk text.
    pub fingerprint: String,
    pub embedding: Vec<f32>,
    pub embedded_at: Option<DateTime<Utc>>,
}

/// A single search result returned by the `search` operation.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document_id: String,
    pub title: String,
    pub category: String,
    pub source: String,
    pub url: String,
    pub chunk_id: String,
    pub ordinal: usize,
    /// Raw cosine similarity in `[-1.0, 1.0]`. Selection and ordering are
    /// always based on this score.
    pub similarity: f32,
    /// Similarity adjusted by bounded keyword/metadata boosts, for display
    /// only. Never changes which results are selected.
    pub relevance: f32,
    pub snippet: String,
}

/// How an answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMethod {
    /// Grounded in retrieved chunks.
    Retrieval,
    /// The generation provider was asked directly, with no retrieval.
    Direct,
}

/// A source reference attached to an answer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerSource {
    pub title: String,
    pub category: String,
    pub similarity: f32,
}

/// A synthesized answer with traceable grounding.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    /// Ranked source references; empty for direct-mode and fallback answers.
    pub sources: Vec<AnswerSource>,
    /// Verbatim chunk texts that were fed to the generation provider.
    pub context_used: Vec<String>,
    /// Retrieval-signal confidence in `[0.0, 1.0]`, computed deterministically
    /// and independent of the generator's own output.
    pub confidence: f32,
    pub method: AnswerMethod,
}

/// Receipt returned by a successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub document_id: String,
    pub chunks: usize,
}

/// Aggregate view of what the knowledge store currently holds.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeBaseStats {
    pub total_documents: usize,
    pub total_chunks: usize,
    pub categories: BTreeMap<String, usize>,
    pub last_updated: Option<DateTime<Utc>>,
}
