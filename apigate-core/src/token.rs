//! Access tokens issued for the run.

use chrono::{DateTime, Utc};

use crate::secret::Secret;

/// A bearer token, held for the remainder of the process and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: Secret,

    /// When this token expires (None if the server did not say).
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        assert_eq!(AccessToken::new("abc").bearer(), "Bearer abc");
    }

    #[test]
    fn test_debug_hides_token() {
        let token = AccessToken::new("abc").with_expiry(Utc::now());
        let debug = format!("{:?}", token);
        assert!(!debug.contains("abc"));
        assert!(debug.contains("expires_at"));
    }
}
