use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TOP: u32 = 10;

pub const API_URL_ENV: &str = "CINEREC_API_URL";
pub const LOG_ENV: &str = "CINEREC_LOG";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    /// Number of recommendations requested per prediction
    pub top: u32,
    /// Persist credentials between sessions; otherwise they live in memory only
    pub remember_credentials: bool,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            top: DEFAULT_TOP,
            remember_credentials: true,
            log_level: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// API base URL - env var first, then config
    pub fn api_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.api_url.clone())
    }

    /// Log filter directive - env var first, then config, then "info"
    pub fn log_filter(&self) -> String {
        std::env::var(LOG_ENV)
            .ok()
            .or_else(|| self.log_level.clone())
            .unwrap_or_else(|| "info".to_string())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("cinerec"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.top, 10);
        assert!(config.remember_credentials);
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            api_url: "http://films.local:9000".to_string(),
            top: 5,
            remember_credentials: false,
            log_level: Some("debug".to_string()),
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"top": 3}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.top, 3);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    // One test for both variables: the process environment is shared
    #[test]
    fn test_env_overrides_config_values() {
        let saved_url = std::env::var(API_URL_ENV).ok();
        let saved_log = std::env::var(LOG_ENV).ok();

        let config = Config {
            api_url: "http://films.local:9000".to_string(),
            log_level: Some("warn".to_string()),
            ..Config::default()
        };

        std::env::set_var(API_URL_ENV, "http://override:1234");
        std::env::set_var(LOG_ENV, "cinerec_core=debug");
        assert_eq!(config.api_url(), "http://override:1234");
        assert_eq!(config.log_filter(), "cinerec_core=debug");

        // blank url falls back to the file value
        std::env::set_var(API_URL_ENV, "  ");
        assert_eq!(config.api_url(), "http://films.local:9000");

        std::env::remove_var(API_URL_ENV);
        std::env::remove_var(LOG_ENV);
        assert_eq!(config.api_url(), "http://films.local:9000");
        assert_eq!(config.log_filter(), "warn");
        assert_eq!(Config::default().log_filter(), "info");

        match saved_url {
            Some(v) => std::env::set_var(API_URL_ENV, v),
            None => std::env::remove_var(API_URL_ENV),
        }
        match saved_log {
            Some(v) => std::env::set_var(LOG_ENV, v),
            None => std::env::remove_var(LOG_ENV),
        }
    }
}
