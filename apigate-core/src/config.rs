//! Toolkit configuration file persistence.
//!
//! The configuration is a TOML document with a `[token]` table holding the
//! [`TokenConfig`], plus `[client]` and `[corsConfiguration]` tables that the
//! import workflow never interprets. Those tables, and any other top-level
//! entries, are carried through a rewrite unchanged.
//!
//! # Example
//!
//! ```toml
//! [token]
//! username = "admin"
//! publisherEndpoint = "{baseURL}/api/am/publisher/{restVersion}"
//! baseURL = "https://localhost:9443"
//!
//! [client]
//! httpClientTimeout = 5000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::model::TokenConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file {path} not found")]
    NotFound { path: String },

    /// I/O error reading or writing the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid configuration document.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Settings loaded from the toolkit configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
    /// OAuth and endpoint settings.
    #[serde(default)]
    pub token: TokenConfig,

    /// HTTP client settings used by the gateway runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<toml::Table>,

    /// CORS settings used by the gateway runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_configuration: Option<toml::Table>,

    /// Any other top-level entries, preserved verbatim.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl StoredConfig {
    /// Load the configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the configuration to `path`, replacing the file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        tracing::debug!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// A copy of this configuration with the token table replaced.
    pub fn with_token(&self, token: TokenConfig) -> Self {
        Self {
            token,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[token]
username = "admin"
clientId = "abc"
publisherEndpoint = "{baseURL}/api/am/publisher/{restVersion}"
baseURL = "https://localhost:9443"
futureKey = "keep-me"

[client]
httpClientTimeout = 5000

[corsConfiguration]
corsConfigurationEnabled = true
accessControlAllowOrigins = ["*"]

[analytics]
enabled = false
"#;

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = StoredConfig::load(&temp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_load_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("toolkit-config.toml");
        fs::write(&path, "[token\nusername=").unwrap();
        assert!(matches!(StoredConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_round_trip_preserves_unrelated_tables() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf").join("toolkit-config.toml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, SAMPLE).unwrap();

        let config = StoredConfig::load(&path).unwrap();
        assert_eq!(config.token.username, "admin");
        assert!(config.extra.contains_key("analytics"));

        let mut token = config.token.clone();
        token.username = "operator".to_string();
        config.with_token(token).save(&path).unwrap();

        let reloaded = StoredConfig::load(&path).unwrap();
        assert_eq!(reloaded.token.username, "operator");
        assert_eq!(reloaded.token.client_id, "abc");
        assert_eq!(
            reloaded.token.extra.get("futureKey").and_then(|v| v.as_str()),
            Some("keep-me")
        );
        assert_eq!(reloaded.client, config.client);
        assert_eq!(reloaded.cors_configuration, config.cors_configuration);
        assert_eq!(reloaded.extra, config.extra);
    }
}
