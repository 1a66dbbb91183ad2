//! Configuration loading.
//!
//! TOML file with environment variable overrides. Every field has a default,
//! so a missing file is not an error.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::SeismodashError;
use crate::transform::DEFAULT_PAGE_SIZE;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
        }
    }
}

/// Where the local key-value mirror lives
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("seismodash"))
        .unwrap_or_else(|| PathBuf::from("./seismodash_data"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, SeismodashError> {
        let content = std::fs::read_to_string(path).map_err(|e| SeismodashError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| SeismodashError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this structure.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from an explicit path, or the first default location that
    /// exists, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error only when an explicit path cannot be loaded.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, SeismodashError> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("seismodash").join("config.toml")),
            Some(PathBuf::from("./seismodash.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::debug!("loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        Self::default()
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SEISMODASH_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(dir) = std::env::var("SEISMODASH_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Ok(level) = std::env::var("SEISMODASH_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::parse(
            r#"
            [api]
            base_url = "https://quake.example.org/api"
            "#,
        )
        .expect("parse");
        assert_eq!(config.api.base_url, "https://quake.example.org/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Config::load(&dir.path().join("absent.toml")).expect_err("missing");
        assert!(matches!(err, SeismodashError::Config { .. }));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\ndata_dir = \"/tmp/sd\"\n[logging]\nlevel = \"debug\"\n",
        )
        .expect("write");
        let config = Config::load(&path).expect("load");
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/sd"));
        assert_eq!(config.logging.level, "debug");
    }
}
