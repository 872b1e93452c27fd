//! End-to-end engine tests with deterministic mock providers.

mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use common::{bag_of_words, test_engine_config, EchoGenerator, HashEmbedder};
use groundwork::cache::EmbeddingCache;
use groundwork::embedding::EmbeddingProvider;
use groundwork::engine::{AskRequest, RagEngine};
use groundwork::error::{EngineError, EngineResult};
use groundwork::models::{AccessLevel, AnswerMethod, DocumentInput};
use groundwork::synthesize::{DIRECT_CONFIDENCE, FALLBACK_CONFIDENCE};

fn engine_with(embedder: Arc<dyn EmbeddingProvider>, cache: EmbeddingCache) -> RagEngine {
    RagEngine::new(test_engine_config(), cache, embedder, Arc::new(EchoGenerator))
}

fn doc(title: &str, text: &str) -> DocumentInput {
    DocumentInput {
        title: title.to_string(),
        source: format!("page:/{}", title.to_lowercase()),
        url: format!("/{}", title.to_lowercase()),
        access: AccessLevel::Public,
        text: text.to_string(),
        category: None,
        tags: Vec::new(),
        metadata: BTreeMap::new(),
    }
}

#[tokio::test]
async fn test_ingest_reports_document_and_chunks() {
    let embedder = Arc::new(HashEmbedder::new());
    let engine = engine_with(embedder.clone(), EmbeddingCache::in_memory());

    let receipt = engine
        .ingest(doc("Routes", "A short note about climbing routes."))
        .await
        .unwrap();

    assert_eq!(receipt.document_id, "routes");
    assert_eq!(receipt.chunks, 1);
    assert_eq!(embedder.calls(), 1);

    let stats = engine.stats();
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.total_chunks, 1);
    assert_eq!(stats.categories["General"], 1);
}

#[tokio::test]
async fn test_reingest_unchanged_makes_zero_embedding_calls() {
    let embedder = Arc::new(HashEmbedder::new());
    let engine = engine_with(embedder.clone(), EmbeddingCache::in_memory());

    let text = "First paragraph about glacier travel.\n\nSecond paragraph about rope teams.";
    engine.ingest(doc("Glaciers", text)).await.unwrap();
    let calls_after_first = embedder.calls();
    assert!(calls_after_first >= 1);

    engine.ingest(doc("Glaciers", text)).await.unwrap();
    assert_eq!(embedder.calls(), calls_after_first, "every chunk must hit the cache");

    // The store was replaced wholesale, not duplicated.
    assert_eq!(engine.stats().total_documents, 1);
}

#[tokio::test]
async fn test_single_edit_invalidates_only_touched_chunk() {
    let embedder = Arc::new(HashEmbedder::new());
    let mut config = test_engine_config();
    config.max_chunk_chars = 64;
    let engine = RagEngine::new(
        config,
        EmbeddingCache::in_memory(),
        embedder.clone(),
        Arc::new(EchoGenerator),
    );

    let part_a = "Alpha paragraph with enough words to stand alone here.";
    let part_b = "Beta paragraph, also long enough to form its own chunk.";
    engine
        .ingest(doc("Manual", &format!("{}\n\n{}", part_a, part_b)))
        .await
        .unwrap();
    let calls_after_first = embedder.calls();
    assert_eq!(calls_after_first, 2, "expected two chunks for this layout");

    // Change only the second paragraph: the first chunk's fingerprint is
    // unchanged and must stay cached.
    let part_b_edited = "Beta paragraph, now reworded but still its own chunk.";
    engine
        .ingest(doc("Manual", &format!("{}\n\n{}", part_a, part_b_edited)))
        .await
        .unwrap();

    assert_eq!(embedder.calls(), calls_after_first + 1);
}

#[tokio::test]
async fn test_search_ordering_threshold_and_limit() {
    let embedder = Arc::new(HashEmbedder::new());
    let engine = engine_with(embedder.clone(), EmbeddingCache::in_memory());

    engine
        .ingest(doc(
            "Avalanche",
            "Avalanche safety requires beacon probe and shovel training.",
        ))
        .await
        .unwrap();
    engine
        .ingest(doc(
            "Nutrition",
            "High altitude nutrition means four thousand calories per day.",
        ))
        .await
        .unwrap();
    engine
        .ingest(doc(
            "Knots",
            "The figure eight knot secures the rope to the harness.",
        ))
        .await
        .unwrap();

    let hits = engine
        .search("avalanche beacon training", Some(2), Some(0.2))
        .await
        .unwrap();

    assert!(!hits.is_empty());
    assert!(hits.len() <= 2);
    for pair in hits.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    for hit in &hits {
        assert!(hit.similarity >= 0.2);
    }
    assert_eq!(hits[0].title, "Avalanche");
}

#[tokio::test]
async fn test_search_limit_is_capped() {
    let embedder = Arc::new(HashEmbedder::new());
    let engine = engine_with(embedder.clone(), EmbeddingCache::in_memory());

    for i in 0..30 {
        engine
            .ingest(doc(
                &format!("Note {}", i),
                "The same repeated note about crampons and ice axes.",
            ))
            .await
            .unwrap();
    }

    let hits = engine
        .search("crampons and ice axes", Some(500), Some(0.0))
        .await
        .unwrap();
    assert!(hits.len() <= 20, "limit must be capped by config");
}

#[tokio::test]
async fn test_empty_knowledge_base_behaviour() {
    let embedder = Arc::new(HashEmbedder::new());
    let engine = engine_with(embedder.clone(), EmbeddingCache::in_memory());

    let hits = engine.search("anything", None, None).await.unwrap();
    assert!(hits.is_empty());

    let answer = engine.ask(AskRequest::new("anything?")).await.unwrap();
    assert_eq!(answer.confidence, FALLBACK_CONFIDENCE);
    assert!(answer.sources.is_empty());

    // Neither operation should have touched the embedding provider.
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_expeditions_example() {
    let embedder = Arc::new(HashEmbedder::new());
    let engine = engine_with(embedder.clone(), EmbeddingCache::in_memory());

    engine
        .ingest(DocumentInput {
            title: "Expeditions".to_string(),
            source: "page:/expeditions".to_string(),
            url: "/expeditions".to_string(),
            access: AccessLevel::Public,
            text: "The next expedition is Everest, targeted for 2027.".to_string(),
            category: None,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        })
        .await
        .unwrap();

    let answer = engine
        .ask(AskRequest::new("What is the next expedition?"))
        .await
        .unwrap();

    assert!(answer.sources.iter().any(|s| s.title == "Expeditions"));
    assert!(answer.answer.contains("Everest"));
    assert!(answer.answer.contains("2027"));
    assert!(answer.confidence > FALLBACK_CONFIDENCE);
    assert_eq!(answer.method, AnswerMethod::Retrieval);
    assert!(!answer.context_used.is_empty());
}

#[tokio::test]
async fn test_direct_mode_skips_retrieval() {
    let embedder = Arc::new(HashEmbedder::new());
    let engine = engine_with(embedder.clone(), EmbeddingCache::in_memory());

    engine
        .ingest(doc("Filled", "The knowledge base is not empty."))
        .await
        .unwrap();
    let calls_after_ingest = embedder.calls();

    let answer = engine
        .ask(AskRequest {
            question: "What is a bergschrund?".to_string(),
            use_retrieval: false,
            context: None,
        })
        .await
        .unwrap();

    assert!(answer.sources.is_empty());
    assert_eq!(answer.method, AnswerMethod::Direct);
    assert_eq!(answer.confidence, DIRECT_CONFIDENCE);
    // Direct mode never embeds the question.
    assert_eq!(embedder.calls(), calls_after_ingest);
}

#[tokio::test]
async fn test_cache_survives_process_restart() {
    let tmp = TempDir::new().unwrap();
    let cache_path = tmp.path().join("cache.json");
    let text = "Crevasse rescue drills.\n\nPulley systems and prusik backup.";

    let first_embedder = Arc::new(HashEmbedder::new());
    {
        let engine = engine_with(first_embedder.clone(), EmbeddingCache::open(&cache_path));
        engine.ingest(doc("Rescue", text)).await.unwrap();
    }
    assert!(first_embedder.calls() >= 1);

    // A new engine over the same cache file sees every fingerprint.
    let second_embedder = Arc::new(HashEmbedder::new());
    let engine = engine_with(second_embedder.clone(), EmbeddingCache::open(&cache_path));
    engine.ingest(doc("Rescue", text)).await.unwrap();
    assert_eq!(second_embedder.calls(), 0);
}

/// Embedder that starts failing after a fixed number of calls.
struct FlakyEmbedder {
    calls: AtomicUsize,
    fail_after: usize,
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    fn provider_name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "flaky"
    }
    fn dims(&self) -> usize {
        common::DIMS
    }
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n >= self.fail_after {
            return Err(EngineError::provider("mock", "synthetic outage"));
        }
        Ok(bag_of_words(text))
    }
    async fn probe(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn test_failed_reingest_leaves_prior_document_intact() {
    let embedder = Arc::new(FlakyEmbedder {
        calls: AtomicUsize::new(0),
        fail_after: 1,
    });
    let engine = engine_with(embedder.clone(), EmbeddingCache::in_memory());

    engine
        .ingest(doc("Weather", "Monsoon windows decide summit pushes."))
        .await
        .unwrap();

    // The provider is now failing; re-ingestion with changed text must
    // abort without touching the stored document.
    let err = engine
        .ingest(doc("Weather", "Completely rewritten forecast text."))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Provider { .. }));

    let stats = engine.stats();
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.total_chunks, 1);

    // The embedder is still down, so search reports a provider error
    // rather than silently returning stale-looking output.
    let search_err = engine
        .search("monsoon summit windows", None, Some(0.1))
        .await
        .unwrap_err();
    assert!(matches!(search_err, EngineError::Provider { .. }));
}

#[tokio::test]
async fn test_remove_empties_the_store() {
    let embedder = Arc::new(HashEmbedder::new());
    let engine = engine_with(embedder.clone(), EmbeddingCache::in_memory());

    engine
        .ingest(doc("Ephemeral", "Text that will be removed."))
        .await
        .unwrap();
    assert_eq!(engine.remove("ephemeral"), 1);

    let answer = engine.ask(AskRequest::new("removed text?")).await.unwrap();
    assert_eq!(answer.confidence, FALLBACK_CONFIDENCE);
}
