//! Domain model types for apigate.
//!
//! This module defines the core types used throughout the import workflow:
//! - [`TokenConfig`] - Persisted OAuth and endpoint settings
//! - [`Credentials`] - Operator username and password for the run
//! - [`ClientRegistration`] - OAuth client id and secret
//! - [`ImportTarget`] - Which APIs to import (by label or by name and version)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ImportError;
use crate::secret::Secret;

/// OAuth and endpoint settings as stored in the `[token]` table.
///
/// Endpoint fields are empty (defaulted at resolution time), a complete URL,
/// or a URL template using the `{baseURL}`, `{restVersion}` and
/// `{dcrVersion}` placeholders. `client_secret` and `trust_store_password`
/// hold ciphertext produced under the operator's password. Keys this tool
/// does not know are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenConfig {
    pub username: String,
    pub client_id: String,
    pub client_secret: String,
    pub trust_store_location: String,
    pub trust_store_password: String,
    pub publisher_endpoint: String,
    pub admin_endpoint: String,
    pub registration_endpoint: String,
    pub token_endpoint: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub rest_version: String,
    pub dcr_version: String,

    #[serde(flatten)]
    pub extra: toml::Table,
}

/// Operator credentials, held in memory for one run only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Secret,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password),
        }
    }
}

/// OAuth client issued by dynamic client registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: Secret,
}

impl ClientRegistration {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret),
        }
    }
}

/// Selects the APIs to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// Every API published under a gateway label.
    Label(String),

    /// A single API identified by name and version.
    NameVersion { name: String, version: String },
}

impl ImportTarget {
    /// Build a target from the command-line selectors.
    ///
    /// Either a label alone, or a name together with a version, must be
    /// given. Empty strings count as absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use apigate_core::ImportTarget;
    ///
    /// let target = ImportTarget::from_selectors(Some("prod"), None, None).unwrap();
    /// assert_eq!(target, ImportTarget::Label("prod".to_string()));
    ///
    /// assert!(ImportTarget::from_selectors(Some("prod"), Some("PetStore"), None).is_err());
    /// ```
    pub fn from_selectors(
        label: Option<&str>,
        name: Option<&str>,
        version: Option<&str>,
    ) -> Result<Self, ImportError> {
        fn present(value: Option<&str>) -> Option<&str> {
            value.filter(|v| !v.is_empty())
        }

        match (present(label), present(name), present(version)) {
            (Some(label), None, None) => Ok(Self::Label(label.to_string())),
            (None, Some(name), Some(version)) => Ok(Self::NameVersion {
                name: name.to_string(),
                version: version.to_string(),
            }),
            _ => Err(ImportError::usage(
                "Missing \"-l <label>\" or \"-a <api-name> -v <version>\" parameters",
            )),
        }
    }
}

impl fmt::Display for ImportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "label {}", label),
            Self::NameVersion { name, version } => write!(f, "{} {}", name, version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_requires_a_selector() {
        let result = ImportTarget::from_selectors(None, None, None);
        assert!(matches!(result, Err(ImportError::Usage { .. })));
    }

    #[test]
    fn test_target_label_only() {
        let target = ImportTarget::from_selectors(Some("x"), None, None).unwrap();
        assert_eq!(target, ImportTarget::Label("x".to_string()));
    }

    #[test]
    fn test_target_name_and_version() {
        let target = ImportTarget::from_selectors(None, Some("a"), Some("1")).unwrap();
        assert_eq!(
            target,
            ImportTarget::NameVersion {
                name: "a".to_string(),
                version: "1".to_string()
            }
        );
    }

    #[test]
    fn test_target_label_conflicts_with_name() {
        let result = ImportTarget::from_selectors(Some("x"), Some("a"), None);
        assert!(matches!(result, Err(ImportError::Usage { .. })));
    }

    #[test]
    fn test_target_name_without_version() {
        let result = ImportTarget::from_selectors(None, Some("a"), None);
        assert!(matches!(result, Err(ImportError::Usage { .. })));
    }

    #[test]
    fn test_target_version_without_name() {
        let result = ImportTarget::from_selectors(None, None, Some("1"));
        assert!(matches!(result, Err(ImportError::Usage { .. })));
    }

    #[test]
    fn test_empty_strings_count_as_absent() {
        let target = ImportTarget::from_selectors(Some("x"), Some(""), Some("")).unwrap();
        assert_eq!(target, ImportTarget::Label("x".to_string()));
    }

    #[test]
    fn test_token_config_uses_camel_case_keys() {
        let token: TokenConfig = toml::from_str(
            r#"
            username = "admin"
            publisherEndpoint = "{baseURL}/api/am/publisher/{restVersion}"
            baseURL = "https://apim.example.com:9443"
            dcrVersion = "v0.14"
            "#,
        )
        .unwrap();

        assert_eq!(token.username, "admin");
        assert_eq!(token.base_url, "https://apim.example.com:9443");
        assert_eq!(token.dcr_version, "v0.14");
        assert!(token.token_endpoint.is_empty());
        assert!(token.extra.is_empty());
    }
}
