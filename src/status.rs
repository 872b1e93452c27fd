//! Provider health monitoring with a short-TTL result cache.
//!
//! Probing the embedding and generation providers costs real network calls,
//! so a busy status endpoint must not probe on every request. The monitor
//! holds the last probe result with its timestamp and reuses it until the
//! TTL expires; expiry triggers exactly one fresh probe, and concurrent
//! callers inside the same expiry window all see the same cached result.
//!
//! The monitor is constructed once at process start and passed to whoever
//! serves status requests. There is no global state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::embedding::EmbeddingProvider;
use crate::generation::GenerationProvider;

/// Connectivity snapshot for one provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub provider: String,
    pub model: String,
    pub connected: bool,
}

/// Result of probing both providers.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub embedding: ProviderStatus,
    pub generation: ProviderStatus,
    pub checked_at: DateTime<Utc>,
}

impl StatusReport {
    /// True when both providers answered their probes.
    pub fn connected(&self) -> bool {
        self.embedding.connected && self.generation.connected
    }
}

struct CachedReport {
    taken_at: Instant,
    report: StatusReport,
}

/// TTL-cached health monitor over the two providers.
pub struct StatusMonitor {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    ttl: Duration,
    cached: Mutex<Option<CachedReport>>,
}

impl StatusMonitor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        ttl: Duration,
    ) -> Self {
        Self {
            embedder,
            generator,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Return the current provider status, probing at most once per TTL
    /// window.
    ///
    /// The cache lock is held across the probe itself, so a burst of
    /// callers arriving at expiry produces a single probe whose result
    /// they all share.
    pub async fn status(&self) -> StatusReport {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref() {
            if entry.taken_at.elapsed() < self.ttl {
                return entry.report.clone();
            }
        }

        let report = self.probe().await;
        *cached = Some(CachedReport {
            taken_at: Instant::now(),
            report: report.clone(),
        });
        report
    }

    async fn probe(&self) -> StatusReport {
        let (embedding_ok, generation_ok) =
            tokio::join!(self.embedder.probe(), self.generator.probe());

        StatusReport {
            embedding: ProviderStatus {
                provider: self.embedder.provider_name().to_string(),
                model: self.embedder.model_name().to_string(),
                connected: embedding_ok,
            },
            generation: ProviderStatus {
                provider: self.generator.provider_name().to_string(),
                model: self.generator.model_name().to_string(),
                connected: generation_ok,
            },
            checked_at: Utc::now(),
        }
    }
}
