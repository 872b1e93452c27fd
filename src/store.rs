//! In-memory knowledge store.
//!
//! Holds documents and their embedded chunks behind `std::sync::RwLock` for
//! concurrent callers. Re-ingesting a document replaces all of its chunks
//! wholesale; chunk ordinal order is preserved for context-window assembly,
//! and each document keeps a stable insertion sequence used as a ranking
//! tie-break.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::{Chunk, Document, KnowledgeBaseStats};

/// A chunk snapshot enriched with its document's metadata, ready for
/// ranking without further store lookups.
#[derive(Debug, Clone)]
pub struct RetrievalUnit {
    pub chunk_id: String,
    pub document_id: String,
    pub ordinal: usize,
    /// Insertion sequence of the owning document.
    pub doc_seq: u64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub title: String,
    pub category: String,
    pub source: String,
    pub url: String,
    pub tags: Vec<String>,
}

struct StoreInner {
    documents: HashMap<String, Document>,
    chunks: Vec<Chunk>,
    next_seq: u64,
}

/// Thread-safe in-memory collection of documents and embedded chunks.
pub struct KnowledgeStore {
    inner: RwLock<StoreInner>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                documents: HashMap::new(),
                chunks: Vec::new(),
                next_seq: 0,
            }),
        }
    }

    /// Insert or replace a document and its chunks.
    ///
    /// All previous chunks for the document identifier are removed first,
    /// so a failed ingestion upstream never leaves a half-replaced
    /// document: callers only reach this once every chunk is embedded.
    /// A re-ingested document keeps its original insertion sequence and
    /// creation timestamp.
    pub fn upsert(&self, mut doc: Document, chunks: Vec<Chunk>) {
        let mut inner = self.inner.write().unwrap();

        match inner.documents.get(&doc.id) {
            Some(existing) => {
                doc.seq = existing.seq;
                doc.created_at = existing.created_at;
            }
            None => {
                doc.seq = inner.next_seq;
                inner.next_seq += 1;
            }
        }

        let doc_id = doc.id.clone();
        inner.chunks.retain(|c| c.document_id != doc_id);
        inner.chunks.extend(chunks);
        inner.documents.insert(doc_id, doc);
    }

    /// Delete a document and all of its chunks. Returns the number of
    /// chunks removed.
    pub fn remove(&self, document_id: &str) -> usize {
        let mut inner = self.inner.write().unwrap();
        let before = inner.chunks.len();
        inner.chunks.retain(|c| c.document_id != document_id);
        inner.documents.remove(document_id);
        before - inner.chunks.len()
    }

    /// Snapshot every stored chunk with its document metadata attached.
    pub fn all_chunks(&self) -> Vec<RetrievalUnit> {
        let inner = self.inner.read().unwrap();
        inner
            .chunks
            .iter()
            .filter_map(|c| {
                let doc = inner.documents.get(&c.document_id)?;
                Some(RetrievalUnit {
                    chunk_id: c.id.clone(),
                    document_id: c.document_id.clone(),
                    ordinal: c.ordinal,
                    doc_seq: doc.seq,
                    text: c.text.clone(),
                    embedding: c.embedding.clone(),
                    title: doc.title.clone(),
                    category: doc.category.clone(),
                    source: doc.source.clone(),
                    url: doc.url.clone(),
                    tags: doc.tags.clone(),
                })
            })
            .collect()
    }

    /// Fetch a document by identifier.
    pub fn document(&self, id: &str) -> Option<Document> {
        self.inner.read().unwrap().documents.get(id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().documents.is_empty()
    }

    /// Aggregate counts over the stored documents.
    pub fn stats(&self) -> KnowledgeBaseStats {
        let inner = self.inner.read().unwrap();

        let mut categories = std::collections::BTreeMap::new();
        let mut last_updated = None;
        for doc in inner.documents.values() {
            *categories.entry(doc.category.clone()).or_insert(0) += 1;
            if last_updated.map_or(true, |ts| doc.updated_at > ts) {
                last_updated = Some(doc.updated_at);
            }
        }

        KnowledgeBaseStats {
            total_documents: inner.documents.len(),
            total_chunks: inner.chunks.len(),
            categories,
            last_updated,
        }
    }
}

impl Default for KnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}
