use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};
use crate::highlight::MatchConfig;

const API_KEY_ENV: &str = "GLINT_API_KEY";

/// User settings, stored as JSON in the config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of a chat-completions compatible API
    pub api_endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Language code used for page translations
    pub target_language: String,
    /// Delay before the highlight pass once a page's text is laid out
    pub debounce_ms: u64,
    pub matching: MatchConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            target_language: "zh".to_string(),
            debounce_ms: 50,
            matching: MatchConfig::default(),
        }
    }
}

impl Settings {
    /// Returns the path to the settings file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("glint").join("settings.json"))
    }

    /// Load settings from the default location, applying env overrides
    pub fn load() -> Result<Self> {
        let mut settings = match Self::default_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        settings.apply_env(std::env::var(API_KEY_ENV).ok());
        Ok(settings)
    }

    /// Load settings from `path`; a missing file yields defaults, which are
    /// written there as a template to edit
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Self::default();
            if let Err(e) = settings.save_to(path) {
                warn!(path = %path.display(), "could not write default settings: {}", e);
            }
            return Ok(settings);
        }
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    fn apply_env(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.matching.anchor_cap, 30);

        // first run leaves an editable template behind
        assert!(path.exists());
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.model = "local-llm".to_string();
        settings.matching.max_span_factor = 2.0;
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"debounce_ms": 80, "matching": {"anchor_cap": 20}}"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.debounce(), Duration::from_millis(80));
        assert_eq!(settings.matching.anchor_cap, 20);
        assert_eq!(settings.matching.min_query_len, 5);
        assert_eq!(settings.model, "gpt-4o-mini");
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_env_key_overrides() {
        let mut settings = Settings::default();
        settings.api_key = Some("from-file".to_string());
        settings.apply_env(Some("   ".to_string()));
        assert_eq!(settings.api_key.as_deref(), Some("from-file"));
        settings.apply_env(Some("from-env".to_string()));
        assert_eq!(settings.api_key.as_deref(), Some("from-env"));
    }
}
