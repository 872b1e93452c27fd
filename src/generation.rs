//! Generation provider abstraction and implementations.
//!
//! Mirrors the embedding side: a narrow [`GenerationProvider`] trait
//! (`complete(prompt) -> text`) with Cohere, Ollama, and disabled
//! implementations, selected by configuration. Either side can be swapped
//! or mocked without touching retrieval or synthesis logic.
//!
//! As with embeddings, calls carry an explicit timeout and failures surface
//! as [`EngineError::Provider`] with no automatic retry.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::{EngineError, EngineResult};

/// Narrow interface to a text-generation backend.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the provider identifier (e.g. `"ollama"`).
    fn provider_name(&self) -> &str;
    /// Returns the model identifier (e.g. `"command-r"`).
    fn model_name(&self) -> &str;
    /// Produce a completion for a fully assembled prompt.
    async fn complete(&self, prompt: &str) -> EngineResult<String>;
    /// Cheap connectivity check; never errors.
    async fn probe(&self) -> bool;
}

/// Create the appropriate [`GenerationProvider`] based on configuration.
pub fn create_generator(config: &GenerationConfig) -> anyhow::Result<Box<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "cohere" => Ok(Box::new(CohereGenerator::new(config)?)),
        "ollama" => Ok(Box::new(OllamaGenerator::new(config)?)),
        other => anyhow::bail!("Unknown generation provider: {}", other),
    }
}

// ============ Disabled provider ============

/// A no-op generation provider that always returns errors.
pub struct DisabledGenerator;

#[async_trait]
impl GenerationProvider for DisabledGenerator {
    fn provider_name(&self) -> &str {
        "disabled"
    }
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _prompt: &str) -> EngineResult<String> {
        Err(EngineError::provider(
            "disabled",
            "generation provider is disabled",
        ))
    }
    async fn probe(&self) -> bool {
        false
    }
}

// ============ Cohere provider ============

/// Generation provider using the Cohere chat API (`POST /v1/chat`).
///
/// Requires the `COHERE_API_KEY` environment variable.
pub struct CohereGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl CohereGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Cohere provider"))?;
        let api_key = std::env::var("COHERE_API_KEY")
            .map_err(|_| anyhow::anyhow!("COHERE_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            temperature: config.temperature,
        })
    }
}

#[derive(Deserialize)]
struct CohereChatResponse {
    text: String,
}

#[async_trait]
impl GenerationProvider for CohereGenerator {
    fn provider_name(&self) -> &str {
        "cohere"
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> EngineResult<String> {
        let body = serde_json::json!({
            "model": self.model,
            "message": prompt,
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post("https://api.cohere.com/v1/chat")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::provider("cohere", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EngineError::provider(
                "cohere",
                format!("chat returned {}: {}", status, detail),
            ));
        }

        let parsed: CohereChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::provider("cohere", e.to_string()))?;

        Ok(parsed.text.trim().to_string())
    }

    async fn probe(&self) -> bool {
        self.client
            .get("https://api.cohere.com/v1/models")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

// ============ Ollama provider ============

/// Generation provider using a local Ollama instance (`POST /api/generate`).
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Ollama provider"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model,
            temperature: config.temperature,
        })
    }
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    fn provider_name(&self) -> &str {
        "ollama"
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> EngineResult<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::provider("ollama", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EngineError::provider(
                "ollama",
                format!("generate returned {}: {}", status, detail),
            ));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| EngineError::provider("ollama", e.to_string()))?;

        Ok(parsed.response.trim().to_string())
    }

    async fn probe(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_generator_errors() {
        let provider = DisabledGenerator;
        let err = provider.complete("anything").await.unwrap_err();
        assert!(matches!(err, EngineError::Provider { .. }));
        assert!(!provider.probe().await);
    }
}
