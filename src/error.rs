//! Engine error taxonomy.
//!
//! Three failure classes cross the engine boundary:
//!
//! - [`EngineError::Validation`] — malformed ingestion or query fields.
//!   Reported immediately; never reaches a provider.
//! - [`EngineError::Provider`] — an embedding or generation call failed or
//!   timed out. Surfaced to the caller with the provider's name; never
//!   retried inside the engine.
//! - [`EngineError::CacheWrite`] — durable persistence of the embedding
//!   cache failed. Logged and swallowed at the call site; the in-memory
//!   cache stays valid for the rest of the process lifetime.
//!
//! A query with no chunk above threshold is *not* an error: it is a
//! successful [`Answer`](crate::models::Answer) carrying the fallback text
//! and the fixed low-confidence constant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A required field is missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// An embedding or generation provider call failed.
    #[error("{provider} provider error: {message}")]
    Provider { provider: String, message: String },

    /// The embedding cache could not be persisted to disk.
    #[error("cache write failed: {0}")]
    CacheWrite(String),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
