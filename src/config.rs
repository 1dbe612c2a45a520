//! Engine configuration
//!
//! Stored as JSON in the user's config directory.
//! Default location: `<config dir>/KeroMix/config.json`
//!
//! Environment variables override the file:
//! - `KEROMIX_API_URL`: chat-completions endpoint
//! - `KEROMIX_API_KEY`: bearer token
//! - `KEROMIX_MODEL`: model name
//! - `KEROMIX_TIMEOUT_MS`: request timeout

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::suggest::{PromptTemplate, DEFAULT_MAX_EXCHANGES};

/// Directory name under the platform config dir
pub const APP_DIR: &str = "KeroMix";

/// Suggestion service connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// OpenAI-compatible chat-completions URL
    pub endpoint: String,
    pub model: String,
    /// Empty means "not configured"
    pub api_key: String,
    /// Connect + read timeout
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key: String::new(),
            timeout_ms: 12_000,
            max_tokens: 300,
            temperature: 0.2,
        }
    }
}

impl ServiceConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub service: ServiceConfig,
    /// Exchanges kept in the conversation history
    pub history_exchanges: usize,
    /// Directory holding one JSON file per preset
    pub preset_dir: PathBuf,
    pub prompt: PromptTemplate,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            history_exchanges: DEFAULT_MAX_EXCHANGES,
            preset_dir: default_preset_dir(),
            prompt: PromptTemplate::default(),
        }
    }
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(APP_DIR)
}

/// `<config dir>/KeroMix/config.json`
pub fn default_config_path() -> PathBuf {
    app_dir().join("config.json")
}

/// `<config dir>/KeroMix/Patches`
pub fn default_preset_dir() -> PathBuf {
    app_dir().join("Patches")
}

impl EngineConfig {
    /// Load from a JSON file.
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is an
    /// error. Environment overrides are not applied here.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&contents)?;
        tracing::debug!(?path, model = %config.service.model, "Loaded config");
        Ok(config)
    }

    /// Load the default file, falling back to defaults on any error, then
    /// apply environment overrides.
    pub fn load_or_default() -> Self {
        let path = default_config_path();
        let config = Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!(?path, error = %e, "Failed to load config, using defaults");
            Self::default()
        });
        config.with_env_overrides()
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(?path, "Saved config");
        Ok(())
    }

    /// Apply `KEROMIX_*` variables from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("KEROMIX_API_URL") {
            self.service.endpoint = url;
        }
        if let Some(key) = lookup("KEROMIX_API_KEY") {
            self.service.api_key = key;
        }
        if let Some(model) = lookup("KEROMIX_MODEL") {
            self.service.model = model;
        }
        if let Some(timeout) = lookup("KEROMIX_TIMEOUT_MS").and_then(|s| s.parse().ok()) {
            self.service.timeout_ms = timeout;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.service.timeout_ms, 12_000);
        assert_eq!(config.service.max_tokens, 300);
        assert_eq!(config.history_exchanges, 6);
        assert!(!config.service.has_api_key());
        assert!(config.preset_dir.ends_with("KeroMix/Patches"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = EngineConfig::default();
        config.service.api_key = "gsk_test".to_string();
        config.history_exchanges = 3;
        config.save(&path).unwrap();

        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"service":{"model":"other-model"}}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.service.model, "other-model");
        assert_eq!(config.service.temperature, 0.2);
        assert_eq!(config.history_exchanges, 6);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("KEROMIX_API_KEY", "secret"),
            ("KEROMIX_TIMEOUT_MS", "5000"),
            ("KEROMIX_MODEL", "m"),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::default()
            .with_overrides_from(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.service.api_key, "secret");
        assert_eq!(config.service.timeout_ms, 5000);
        assert_eq!(config.service.model, "m");
        assert_eq!(config.service.endpoint, ServiceConfig::default().endpoint);
    }
}
