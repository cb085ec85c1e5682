//! Configuration management for jwtgen.
//!
//! Loads configuration from ${JWTGEN_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the provider base URL.
pub const BASE_URL_ENV: &str = "JWTGEN_AUTH_BASE_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for jwtgen configuration and data directories.
    //!
    //! JWTGEN_HOME resolution order:
    //! 1. JWTGEN_HOME environment variable (if set)
    //! 2. ~/.config/jwtgen (default)
    //! 3. ./.jwtgen when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the jwtgen home directory.
    pub fn jwtgen_home() -> PathBuf {
        if let Ok(home) = std::env::var("JWTGEN_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".jwtgen"),
            |h| h.join(".config").join("jwtgen"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        jwtgen_home().join("config.toml")
    }

    /// Returns the path to the persisted UI state (cached API key).
    pub fn state_path() -> PathBuf {
        jwtgen_home().join("state.json")
    }

    /// Returns the directory that holds log files.
    pub fn logs_dir() -> PathBuf {
        jwtgen_home().join("logs")
    }
}

/// Identity provider endpoint configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the Identity Toolkit REST API.
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Default Identity Toolkit endpoint.
    pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

    /// Returns the configured base URL, treating empty/whitespace as unset.
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Resolves the base URL: env override, then config, then default.
    pub fn resolve_base_url(&self) -> String {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
        self.effective_base_url()
            .unwrap_or(Self::DEFAULT_BASE_URL)
            .to_string()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when RUST_LOG is unset (trace, debug, info, warn, error).
    pub level: String,
    /// Log file name inside ${JWTGEN_HOME}/logs, used by the interactive UI.
    pub file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: "jwtgen.log".to_string(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity provider settings.
    pub provider: ProviderConfig,

    /// Logging settings.
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Returns the log file path for interactive sessions.
    pub fn log_file_path(&self) -> PathBuf {
        paths::logs_dir().join(&self.log.file)
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.provider.base_url, None);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "[log]\nlevel = \"debug\"\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.file, "jwtgen.log");
        assert_eq!(config.provider.base_url, None);
    }

    #[test]
    fn test_base_url_loaded_from_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "[provider]\nbase_url = \"http://127.0.0.1:9099/identitytoolkit.googleapis.com\"\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(
            config.provider.effective_base_url(),
            Some("http://127.0.0.1:9099/identitytoolkit.googleapis.com")
        );
    }

    #[test]
    fn test_base_url_empty_is_none() {
        let provider = ProviderConfig {
            base_url: Some("   ".to_string()),
        };
        assert_eq!(provider.effective_base_url(), None);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[provider\nbase_url = 1").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("[provider]"));
        assert!(contents.contains("# base_url ="));

        // The template itself must parse back into defaults.
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.provider.effective_base_url(), None);
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        let result = Config::init(&config_path);
        assert!(result.is_err());
    }
}
