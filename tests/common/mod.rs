//! Deterministic mock providers shared by the integration tests.
//!
//! The embedder produces a bag-of-words vector (hash-bucketed word counts,
//! L2-normalized), so texts sharing vocabulary score high cosine similarity
//! while unrelated texts score near zero. The generator echoes its prompt,
//! which lets tests assert that retrieved context actually reaches the
//! generation provider.

#![allow(dead_code)] // not every test binary uses every helper

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use groundwork::config::EngineConfig;
use groundwork::error::EngineResult;
use groundwork::embedding::EmbeddingProvider;
use groundwork::generation::GenerationProvider;

pub const DIMS: usize = 128;

/// Counting bag-of-words embedder.
pub struct HashEmbedder {
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vec = vec![0.0f32; DIMS];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        vec[(hasher.finish() as usize) % DIMS] += 1.0;
    }
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vec {
            *x /= norm;
        }
    }
    vec
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn provider_name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "bag-of-words"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(bag_of_words(text))
    }
    async fn probe(&self) -> bool {
        true
    }
}

/// Generator that returns its prompt, so answers provably contain the
/// context that was assembled for them.
pub struct EchoGenerator;

#[async_trait]
impl GenerationProvider for EchoGenerator {
    fn provider_name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "echo"
    }
    async fn complete(&self, prompt: &str) -> EngineResult<String> {
        Ok(prompt.to_string())
    }
    async fn probe(&self) -> bool {
        true
    }
}

/// Engine tunables for tests: default sizing, but thresholds relaxed to
/// suit bag-of-words similarity (which is coarser than a real embedding
/// model's).
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        search_threshold: 0.3,
        ask_threshold: 0.3,
        answer_floor: 0.3,
        ..EngineConfig::default()
    }
}
