//! Configuration loading, validation, and management for the VoterInfo tool.
//!
//! Loads configuration from `~/.voterinfo/config.toml` with environment
//! variable overrides, and merges the JSON payload delivered once by the
//! host page over the embed channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.voterinfo/config.toml`; the same field names are
/// accepted in the host page's JSON config payload.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// API key for the civic-information and places services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for the JSON API endpoints.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Election to look up voter information for.
    #[serde(default = "default_election_id")]
    pub election_id: String,

    /// Whether to request only data from official sources.
    #[serde(default)]
    pub official_only: bool,

    /// Address to look up immediately on startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Pre-selected state/region. An explicitly empty string means
    /// "do not guess a region".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// The referring page or parent frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,

    /// Country restriction for address autocompletion.
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_api_base() -> String {
    "https://www.googleapis.com".into()
}
fn default_election_id() -> String {
    "4000".into()
}
fn default_country() -> String {
    "us".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_base", &self.api_base)
            .field("election_id", &self.election_id)
            .field("official_only", &self.official_only)
            .field("address", &self.address)
            .field("region", &self.region)
            .field("referrer", &self.referrer)
            .field("country", &self.country)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            election_id: default_election_id(),
            official_only: false,
            address: None,
            region: None,
            referrer: None,
            country: default_country(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.voterinfo/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `VOTERINFO_API_KEY`
    /// - `VOTERINFO_ELECTION_ID`
    /// - `VOTERINFO_API_BASE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(key) = std::env::var("VOTERINFO_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(election_id) = std::env::var("VOTERINFO_ELECTION_ID") {
            config.election_id = election_id;
        }
        if let Ok(base) = std::env::var("VOTERINFO_API_BASE") {
            config.api_base = base;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".voterinfo")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.election_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "election_id must not be empty".into(),
            ));
        }
        if !self.api_base.starts_with("http") {
            return Err(ConfigError::ValidationError(
                "api_base must be an http(s) URL".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Merge a host-delivered JSON config payload over this configuration.
    /// Unknown keys are ignored; known keys override the current values.
    pub fn merged_with_payload(&self, payload: &str) -> Result<Self, ConfigError> {
        let overrides: Value =
            serde_json::from_str(payload).map_err(|e| ConfigError::PayloadError(e.to_string()))?;
        let Value::Object(overrides) = overrides else {
            return Err(ConfigError::PayloadError(
                "config payload must be a JSON object".into(),
            ));
        };

        let mut base = serde_json::to_value(self)
            .map_err(|e| ConfigError::PayloadError(e.to_string()))?;
        if let Value::Object(base) = &mut base {
            for (key, value) in overrides {
                // Explicit nulls are kept so "region": null can mean
                // "do not guess a region" distinctly from an absent key.
                base.insert(key, value);
            }
        }

        let merged: Self = serde_json::from_value(base)
            .map_err(|e| ConfigError::PayloadError(e.to_string()))?;
        merged.validate()?;
        Ok(merged)
    }

    /// Rebuild a config from the value stored under the `CONFIG` context key.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value.clone()).map_err(|e| ConfigError::PayloadError(e.to_string()))
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

impl From<ConfigError> for voterinfo_core::Error {
    fn from(err: ConfigError) -> Self {
        voterinfo_core::Error::config(err.to_string())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid host config payload: {0}")]
    PayloadError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.election_id, "4000");
        assert_eq!(config.country, "us");
        assert!(!config.official_only);
        assert!(!config.has_api_key());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig {
            api_key: Some("test-key".into()),
            election_id: "2000".into(),
            ..AppConfig::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), AppConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
api_key = "abc123"
election_id = "5000"
official_only = true
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.election_id, "5000");
        assert!(config.official_only);
        // Untouched fields keep their defaults
        assert_eq!(config.api_base, "https://www.googleapis.com");
    }

    #[test]
    fn empty_election_id_rejected() {
        let config = AppConfig {
            election_id: String::new(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn payload_merges_over_defaults() {
        let base = AppConfig::default();
        let merged = base
            .merged_with_payload(r#"{"election_id": "6000", "address": "1 Main St"}"#)
            .unwrap();
        assert_eq!(merged.election_id, "6000");
        assert_eq!(merged.address.as_deref(), Some("1 Main St"));
        // Untouched fields survive
        assert_eq!(merged.country, "us");
    }

    #[test]
    fn payload_null_region_clears_it() {
        let base = AppConfig {
            region: Some("IL".into()),
            ..AppConfig::default()
        };
        let merged = base.merged_with_payload(r#"{"region": null}"#).unwrap();
        assert_eq!(merged.region, None);
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let base = AppConfig::default();
        assert!(base.merged_with_payload("not json").is_err());
        assert!(base.merged_with_payload(r#""just a string""#).is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("super-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
