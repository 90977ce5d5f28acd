// Application settings
// Loaded from ~/.config/cardtrail/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PORTAL_URL: &str = "https://dkykt.info.bit.edu.cn";
pub const DEFAULT_GIST_FILENAME: &str = "bit_card_cookies.json";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Campus card portal endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSettings {
    pub base_url: String,
    /// Per-request timeout, seconds
    pub timeout_secs: u64,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PORTAL_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Windowed retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub window_days: u32,
    /// Replies this large are flagged as possibly truncated
    pub record_cap: usize,
    /// Lookback when no start date is given
    pub default_days: u32,
    pub retries: u32,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            window_days: 7,
            record_cap: 100,
            default_days: 60,
            retries: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub gist_filename: String,
    pub github_api: String,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            gist_filename: DEFAULT_GIST_FILENAME.to_string(),
            github_api: DEFAULT_GITHUB_API.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceSettings {
    /// Low-balance threshold, yuan as text ("20.00")
    pub min_balance: String,
}

impl Default for BalanceSettings {
    fn default() -> Self {
        Self {
            min_balance: "20.00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub portal: PortalSettings,
    pub query: QuerySettings,
    pub credentials: CredentialSettings,
    pub balance: BalanceSettings,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cardtrail");
        config_dir.join("config.toml")
    }

    /// Load settings from `path`. A missing file yields defaults; an
    /// unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("loaded config from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in
    /// production; empty values are ignored.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("CARDTRAIL_PORTAL_URL") {
            self.portal.base_url = url;
        }
        if let Some(name) = get("GIST_FILENAME") {
            self.credentials.gist_filename = name;
        }
        self
    }

    /// Portal base URL without a trailing slash
    pub fn portal_url(&self) -> &str {
        self.portal.base_url.trim_end_matches('/')
    }

    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.query.window_days, 7);
        assert_eq!(settings.query.record_cap, 100);
        assert_eq!(settings.query.default_days, 60);
        assert_eq!(settings.portal.timeout_secs, 10);
        assert_eq!(settings.credentials.gist_filename, "bit_card_cookies.json");
        assert_eq!(settings.balance.min_balance, "20.00");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[query]\nwindow_days = 5\nretries = 2\n\n[portal]\nbase_url = \"http://localhost:8080/\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.query.window_days, 5);
        assert_eq!(settings.query.retries, 2);
        assert_eq!(settings.query.record_cap, 100);
        assert_eq!(settings.portal_url(), "http://localhost:8080");
        assert_eq!(settings.portal.timeout_secs, 10);
    }

    #[test]
    fn malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[query]\nwindow_days = \"seven\"\n").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CARDTRAIL_PORTAL_URL", "http://127.0.0.1:9000"),
            ("GIST_FILENAME", "cookies.json"),
        ]
        .into_iter()
        .collect();

        let settings = Settings::default().with_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.portal.base_url, "http://127.0.0.1:9000");
        assert_eq!(settings.credentials.gist_filename, "cookies.json");
    }

    #[test]
    fn blank_env_ignored() {
        let settings = Settings::default().with_env(|_| Some("  ".to_string()));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn config_path_under_cardtrail() {
        let path = Settings::config_path();
        assert!(path.ends_with("cardtrail/config.toml"));
    }
}
