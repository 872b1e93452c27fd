//! Engine orchestration: ingestion, search, and ask.
//!
//! Wires the segmenter, embedding cache, providers, knowledge store,
//! ranker, and synthesizer into the three public operations. Each request
//! is an independent unit of work; the only shared mutable state is the
//! store and the cache, both safe for concurrent callers.
//!
//! Ingestion is all-or-nothing per document: every chunk is embedded
//! (cache-checked) before anything is written to the store, so a provider
//! failure mid-document leaves the previous state for that document
//! identifier untouched.

use std::sync::Arc;

use chrono::Utc;

use crate::cache::EmbeddingCache;
use crate::config::EngineConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{EngineError, EngineResult};
use crate::generation::GenerationProvider;
use crate::models::{
    Answer, Document, DocumentInput, IngestReceipt, KnowledgeBaseStats, SearchHit,
};
use crate::rank::{rank_units, relevance_score, snippet};
use crate::segment::segment_text;
use crate::store::KnowledgeStore;
use crate::synthesize::{
    fallback_answer, synthesize_direct, synthesize_grounded, SynthesisOptions,
};

/// Parameters for the ask operation.
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub question: String,
    /// When false, the generation provider is asked directly and the answer
    /// carries no sources.
    pub use_retrieval: bool,
    /// Free-form caller context, prepended to the assembled prompt.
    pub context: Option<String>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            use_retrieval: true,
            context: None,
        }
    }
}

/// The retrieval-augmented question-answering engine.
pub struct RagEngine {
    config: EngineConfig,
    store: KnowledgeStore,
    cache: EmbeddingCache,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
}

impl RagEngine {
    pub fn new(
        config: EngineConfig,
        cache: EmbeddingCache,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            config,
            store: KnowledgeStore::new(),
            cache,
            embedder,
            generator,
        }
    }

    /// Ingest a document: segment, embed (cache-checked), and store.
    ///
    /// Re-ingesting under the same identifier supersedes all prior chunks
    /// for that document. Unchanged chunks hit the embedding cache and cost
    /// no provider calls.
    pub async fn ingest(&self, input: DocumentInput) -> EngineResult<IngestReceipt> {
        validate_input(&input)?;

        let document_id = slugify(&input.title);
        let mut chunks = segment_text(&document_id, &input.text, self.config.max_chunk_chars);

        let mut cache_hits = 0usize;
        let mut cache_misses = 0usize;

        for chunk in &mut chunks {
            match self.cache.lookup(&chunk.fingerprint) {
                Some(embedding) => {
                    chunk.embedding = embedding;
                    cache_hits += 1;
                }
                None => {
                    let embedding = self.embedder.embed(&chunk.text).await?;
                    self.cache.store(&chunk.fingerprint, &embedding);
                    chunk.embedding = embedding;
                    cache_misses += 1;
                }
            }
            chunk.embedded_at = Some(Utc::now());
        }

        let chunk_count = chunks.len();
        let now = Utc::now();
        let document = Document {
            id: document_id.clone(),
            seq: 0, // assigned by the store
            title: input.title,
            category: input.category.unwrap_or_else(|| "General".to_string()),
            source: input.source,
            url: input.url,
            access: input.access,
            text: input.text,
            tags: input.tags,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
        };

        self.store.upsert(document, chunks);

        tracing::info!(
            document = %document_id,
            chunks = chunk_count,
            cache_hits,
            cache_misses,
            "ingested document"
        );

        Ok(IngestReceipt {
            document_id,
            chunks: chunk_count,
        })
    }

    /// Rank stored chunks against a query.
    ///
    /// `limit` is clamped to the configured maximum; `threshold` defaults
    /// to the configured search threshold. An empty knowledge base returns
    /// an empty list without calling the embedding provider.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        threshold: Option<f32>,
    ) -> EngineResult<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(EngineError::validation("query must not be empty"));
        }

        let limit = limit
            .unwrap_or(self.config.search_limit)
            .clamp(1, self.config.max_search_limit);
        let threshold = threshold.unwrap_or(self.config.search_threshold);

        if self.store.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed(query).await?;
        let ranked = rank_units(&query_vec, self.store.all_chunks(), limit, threshold);

        Ok(ranked
            .into_iter()
            .map(|r| {
                let relevance = relevance_score(query, &r.unit, r.similarity);
                SearchHit {
                    document_id: r.unit.document_id,
                    title: r.unit.title,
                    category: r.unit.category,
                    source: r.unit.source,
                    url: r.unit.url,
                    chunk_id: r.unit.chunk_id,
                    ordinal: r.unit.ordinal,
                    similarity: r.similarity,
                    relevance,
                    snippet: snippet(&r.unit.text),
                }
            })
            .collect())
    }

    /// Answer a question, grounded in retrieved chunks unless the caller
    /// opts out of retrieval.
    pub async fn ask(&self, request: AskRequest) -> EngineResult<Answer> {
        if request.question.trim().is_empty() {
            return Err(EngineError::validation("question must not be empty"));
        }

        if !request.use_retrieval {
            return synthesize_direct(
                self.generator.as_ref(),
                &request.question,
                request.context.as_deref(),
            )
            .await;
        }

        // An empty knowledge base cannot ground anything: skip both
        // provider calls and return the fixed fallback.
        if self.store.is_empty() {
            return Ok(fallback_answer());
        }

        let query_vec = self.embedder.embed(&request.question).await?;
        let ranked = rank_units(
            &query_vec,
            self.store.all_chunks(),
            self.config.search_limit,
            self.config.ask_threshold,
        );

        let opts = SynthesisOptions {
            answer_floor: self.config.answer_floor,
            max_context_chars: self.config.max_context_chars,
        };

        let answer = synthesize_grounded(
            self.generator.as_ref(),
            &request.question,
            &ranked,
            request.context.as_deref(),
            &opts,
        )
        .await?;

        tracing::debug!(
            sources = answer.sources.len(),
            confidence = answer.confidence,
            method = ?answer.method,
            "answered question"
        );

        Ok(answer)
    }

    /// Delete a document and its chunks. Returns the number of chunks
    /// removed.
    pub fn remove(&self, document_id: &str) -> usize {
        self.store.remove(document_id)
    }

    pub fn stats(&self) -> KnowledgeBaseStats {
        self.store.stats()
    }

    /// Number of fingerprints currently in the embedding cache.
    pub fn cached_embeddings(&self) -> usize {
        self.cache.len()
    }
}

fn validate_input(input: &DocumentInput) -> EngineResult<()> {
    for (field, value) in [
        ("title", &input.title),
        ("source", &input.source),
        ("url", &input.url),
        ("text", &input.text),
    ] {
        if value.trim().is_empty() {
            return Err(EngineError::validation(format!(
                "{} is required and must not be empty",
                field
            )));
        }
    }
    Ok(())
}

/// Derive a stable document identifier from the title.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if (c.is_whitespace() || c == '-') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}
