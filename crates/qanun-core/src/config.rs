use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{QanunError, Result};

/// Top-level configuration for the Qanun application.
///
/// Loaded from `~/.qanun/config.toml` by default. Each section corresponds
/// to a bounded context or cross-cutting concern. Secrets (API keys) never
/// live here; they are read from the environment via [`Credentials`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QanunConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl Default for QanunConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl QanunConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: QanunConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| QanunError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Language-model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the OpenAI-compatible completion API.
    pub api_base: String,
    /// Model used for answer synthesis.
    pub answer_model: String,
    /// Cheaper model used for intent classification and translation.
    pub fast_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            answer_model: "gpt-4o".to_string(),
            fast_model: "gpt-3.5-turbo".to_string(),
        }
    }
}

/// Trusted-source search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Google Custom Search endpoint.
    pub endpoint: String,
    /// Maximum number of results per query.
    pub result_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            result_limit: 5,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend: "file" or "memory".
    pub backend: String,
    /// Data directory for file-backed records.
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            data_dir: "~/.qanun/data".to_string(),
        }
    }
}

/// History windowing settings for prompt construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Messages kept when no memory facts were extracted.
    pub full_window: usize,
    /// Messages kept after the synthetic memory message.
    pub memory_window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            full_window: 8,
            memory_window: 6,
        }
    }
}

// =============================================================================
// Environment credentials
// =============================================================================

/// API credentials read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Language-model API key. Mandatory.
    pub api_key: String,
    /// Search credentials; `None` when the search integration is unconfigured.
    pub search: Option<SearchCredentials>,
}

/// Google Custom Search credentials. Both parts must be present for the
/// trusted-source search to be configured.
#[derive(Debug, Clone)]
pub struct SearchCredentials {
    pub api_key: String,
    pub engine_id: String,
}

impl Credentials {
    /// Read credentials from the environment.
    ///
    /// `OPENAI_API_KEY` is mandatory; its absence is a configuration error
    /// raised before any network activity. `GOOGLE_CSE_API_KEY` and
    /// `GOOGLE_CSE_ENGINE_ID` are optional as a pair; if either is missing
    /// or empty the search integration is reported as unconfigured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let api_key = non_empty("OPENAI_API_KEY")
            .ok_or_else(|| QanunError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let search = match (
            non_empty("GOOGLE_CSE_API_KEY"),
            non_empty("GOOGLE_CSE_ENGINE_ID"),
        ) {
            (Some(api_key), Some(engine_id)) => Some(SearchCredentials { api_key, engine_id }),
            _ => None,
        };

        Ok(Self { api_key, search })
    }
}
