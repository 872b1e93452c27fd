use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

/// Retrieval and synthesis tunables.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Maximum characters per chunk.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    /// Default number of search results.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Hard cap on the number of search results per request.
    #[serde(default = "default_max_search_limit")]
    pub max_search_limit: usize,
    /// Default similarity threshold for search.
    #[serde(default = "default_search_threshold")]
    pub search_threshold: f32,
    /// Similarity threshold for ask-path retrieval (more permissive than
    /// search so the synthesizer sees corroborating chunks).
    #[serde(default = "default_ask_threshold")]
    pub ask_threshold: f32,
    /// Minimum top-result similarity for a grounded answer; below this the
    /// fallback response is returned without a generation call.
    #[serde(default = "default_answer_floor")]
    pub answer_floor: f32,
    /// Character budget for the assembled context window.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Directory of seed documents ingested at startup.
    #[serde(default)]
    pub seed_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            search_limit: default_search_limit(),
            max_search_limit: default_max_search_limit(),
            search_threshold: default_search_threshold(),
            ask_threshold: default_ask_threshold(),
            answer_floor: default_answer_floor(),
            max_context_chars: default_max_context_chars(),
            seed_dir: None,
        }
    }
}

fn default_max_chunk_chars() -> usize {
    1200
}
fn default_search_limit() -> usize {
    5
}
fn default_max_search_limit() -> usize {
    20
}
fn default_search_threshold() -> f32 {
    0.7
}
fn default_ask_threshold() -> f32 {
    0.6
}
fn default_answer_floor() -> f32 {
    0.45
}
fn default_max_context_chars() -> usize {
    3000
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"disabled"`, `"cohere"`, or `"ollama"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for self-hosted providers (Ollama).
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            timeout_secs: default_embed_timeout_secs(),
            base_url: default_ollama_base_url(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// `"disabled"`, `"cohere"`, or `"ollama"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_generate_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Base URL for self-hosted providers (Ollama).
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            timeout_secs: default_generate_timeout_secs(),
            temperature: default_temperature(),
            base_url: default_ollama_base_url(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_embed_timeout_secs() -> u64 {
    30
}
fn default_generate_timeout_secs() -> u64 {
    60
}
fn default_temperature() -> f32 {
    0.7
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Path of the durable embedding-cache file.
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/embedding-cache.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7431".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatusConfig {
    /// How long a provider probe result is reused before re-probing.
    #[serde(default = "default_status_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_status_ttl_secs(),
        }
    }
}

fn default_status_ttl_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.engine.max_chunk_chars == 0 {
        anyhow::bail!("engine.max_chunk_chars must be > 0");
    }
    if config.engine.search_limit == 0 || config.engine.max_search_limit == 0 {
        anyhow::bail!("engine.search_limit and engine.max_search_limit must be >= 1");
    }
    if config.engine.search_limit > config.engine.max_search_limit {
        anyhow::bail!("engine.search_limit must not exceed engine.max_search_limit");
    }
    for (name, value) in [
        ("engine.search_threshold", config.engine.search_threshold),
        ("engine.ask_threshold", config.engine.ask_threshold),
        ("engine.answer_floor", config.engine.answer_floor),
    ] {
        if !(-1.0..=1.0).contains(&value) {
            anyhow::bail!("{} must be in [-1.0, 1.0]", name);
        }
    }
    if config.engine.max_context_chars == 0 {
        anyhow::bail!("engine.max_context_chars must be > 0");
    }

    for (section, provider, model, dims) in [
        (
            "embedding",
            &config.embedding.provider,
            &config.embedding.model,
            config.embedding.dims,
        ),
        (
            "generation",
            &config.generation.provider,
            &config.generation.model,
            Some(0),
        ),
    ] {
        match provider.as_str() {
            "disabled" => {}
            "cohere" | "ollama" => {
                if model.is_none() {
                    anyhow::bail!(
                        "{}.model must be specified when provider is '{}'",
                        section,
                        provider
                    );
                }
                if section == "embedding" && (dims.is_none() || dims == Some(0)) {
                    anyhow::bail!(
                        "embedding.dims must be > 0 when provider is '{}'",
                        provider
                    );
                }
            }
            other => anyhow::bail!(
                "Unknown {} provider: '{}'. Must be disabled, cohere, or ollama.",
                section,
                other
            ),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_gets_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.max_chunk_chars, 1200);
        assert_eq!(config.engine.search_limit, 5);
        assert_eq!(config.engine.max_search_limit, 20);
        assert_eq!(config.embedding.provider, "disabled");
        assert_eq!(config.status.ttl_secs, 30);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_provider_requires_model_and_dims() {
        let config: Config = toml::from_str(
            r#"
[embedding]
provider = "cohere"
"#,
        )
        .unwrap();
        assert!(validate(&config).is_err());

        let config: Config = toml::from_str(
            r#"
[embedding]
provider = "cohere"
model = "embed-english-v3.0"
dims = 1024
"#,
        )
        .unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config: Config = toml::from_str(
            r#"
[generation]
provider = "parrot"
"#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_threshold_bounds_checked() {
        let config: Config = toml::from_str(
            r#"
[engine]
search_threshold = 1.5
"#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_limit_must_not_exceed_cap() {
        let config: Config = toml::from_str(
            r#"
[engine]
search_limit = 50
max_search_limit = 20
"#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }
}
