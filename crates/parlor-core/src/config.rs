//! Configuration management for parlor.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const BASE_URL_ENV: &str = "PARLOR_BASE_URL";
pub const TOKEN_ENV: &str = "PARLOR_TOKEN";

pub mod paths {
    //! Path resolution for parlor configuration and data directories.
    //!
    //! PARLOR_HOME resolution order:
    //! 1. PARLOR_HOME environment variable (if set)
    //! 2. ~/.config/parlor (default)

    use std::path::PathBuf;

    pub const HOME_ENV: &str = "PARLOR_HOME";

    /// Returns the parlor home directory.
    pub fn parlor_home() -> PathBuf {
        if let Ok(home) = std::env::var(HOME_ENV)
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".parlor"),
            |h| h.join(".config").join("parlor"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        parlor_home().join("config.toml")
    }

    /// Returns the directory for rolling log files.
    pub fn logs_dir() -> PathBuf {
        parlor_home().join("logs")
    }
}

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL
    pub base_url: Option<String>,
    /// Bearer token for authenticated sessions
    pub token: Option<String>,
    /// Exchange watchdog in seconds (0 = disabled)
    pub request_timeout_secs: u32,
    /// Default stderr log filter
    pub log_level: String,
    /// Also log to a daily file under `$PARLOR_HOME/logs`
    pub log_to_file: bool,
}

impl Config {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8080";
    pub const DEFAULT_LOG_LEVEL: &'static str = "warn";

    /// Loads configuration from the default path.
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

    /// Writes the commented default template to `path`.
    ///
    /// Fails if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Base URL after applying `PARLOR_BASE_URL`, the config file and the
    /// default, in that order.
    pub fn effective_base_url(&self) -> Result<String> {
        resolve_base_url(std::env::var(BASE_URL_ENV).ok().as_deref(), self.base_url.as_deref())
    }

    /// Token after applying `PARLOR_TOKEN` over the config file.
    pub fn effective_token(&self) -> Option<String> {
        resolve_token(std::env::var(TOKEN_ENV).ok().as_deref(), self.token.as_deref())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
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

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            request_timeout_secs: 0,
            log_level: Self::DEFAULT_LOG_LEVEL.to_string(),
            log_to_file: false,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn resolve_base_url(env_url: Option<&str>, config_url: Option<&str>) -> Result<String> {
    let url = non_empty(env_url)
        .or_else(|| non_empty(config_url))
        .unwrap_or(Config::DEFAULT_BASE_URL);
    url::Url::parse(url).with_context(|| format!("Invalid backend base URL: {url}"))?;
    Ok(url.to_string())
}

fn resolve_token(env_token: Option<&str>, config_token: Option<&str>) -> Option<String> {
    non_empty(env_token)
        .or_else(|| non_empty(config_token))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "token = \"abc\"\nrequest_timeout_secs = 30\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.base_url, None);
        assert!(!config.log_to_file);
    }

    #[test]
    fn test_load_invalid_toml_names_the_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "request_timeout_secs = \"soon\"").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err}").contains("Failed to parse config"));
    }

    #[test]
    fn test_init_creates_config_from_template() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# token = \"\""));
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some(Config::DEFAULT_BASE_URL));
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_timeout_zero_disables() {
        let config = Config {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_base_url_precedence() {
        assert_eq!(
            resolve_base_url(Some("http://env:1"), Some("http://cfg:2")).unwrap(),
            "http://env:1"
        );
        assert_eq!(
            resolve_base_url(Some("  "), Some("http://cfg:2")).unwrap(),
            "http://cfg:2"
        );
        assert_eq!(
            resolve_base_url(None, None).unwrap(),
            Config::DEFAULT_BASE_URL
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = resolve_base_url(None, Some("localhost without scheme")).unwrap_err();
        assert!(err.to_string().contains("Invalid backend base URL"));
    }

    #[test]
    fn test_token_precedence() {
        assert_eq!(resolve_token(Some("env"), Some("cfg")).as_deref(), Some("env"));
        assert_eq!(resolve_token(None, Some(" cfg ")).as_deref(), Some("cfg"));
        assert_eq!(resolve_token(Some(""), None), None);
    }
}
