//! Secret values and recovery of secrets stored encrypted at rest.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`SecretRecovery`] - The outcome of decrypting a stored secret
//! - [`recover`] - Decrypt a stored value with the operator's password
//!
//! # Fallback on wrong passwords
//!
//! A stored value that cannot be decrypted with the current password is not
//! an error. It is reported as [`SecretRecovery::Undecryptable`] and callers
//! treat it exactly like a value that was never stored, so an operator who
//! changed their password is simply asked again.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value.
/// The buffer is wiped when the secret is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret holds an empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Outcome of recovering a secret that is stored encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRecovery {
    /// The stored ciphertext decrypted with the supplied password.
    Recovered(Secret),

    /// Nothing was stored.
    NotStored,

    /// A value was stored but the password does not open it.
    Undecryptable,
}

impl SecretRecovery {
    /// Collapse the outcome into an optional, non-empty secret.
    ///
    /// Both absent variants, and a recovered empty string, yield `None`.
    pub fn into_secret(self) -> Option<Secret> {
        match self {
            Self::Recovered(secret) if !secret.is_empty() => Some(secret),
            _ => None,
        }
    }

    /// Check if a usable value was recovered.
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered(secret) if !secret.is_empty())
    }
}

/// Decrypt a stored value with the operator's password.
///
/// `what` names the value in log output only.
pub fn recover(stored: &str, password: &Secret, what: &str) -> SecretRecovery {
    if stored.trim().is_empty() {
        tracing::debug!("No stored {} found", what);
        return SecretRecovery::NotStored;
    }

    match cipher::decrypt(stored, password.expose()) {
        Ok(plaintext) => {
            tracing::debug!("Recovered stored {}", what);
            SecretRecovery::Recovered(Secret::new(plaintext))
        }
        Err(e) => {
            tracing::warn!(
                "Stored {} could not be decrypted with the supplied password ({}); treating it as absent",
                what,
                e
            );
            SecretRecovery::Undecryptable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_secret_display_redacted() {
        let secret = Secret::new("super-secret");
        let display = format!("{}", secret);
        assert!(!display.contains("super-secret"));
        assert!(display.contains("REDACTED"));
    }

    #[test]
    fn test_recover_with_matching_password() {
        let stored = cipher::encrypt("client-secret", "hunter2").unwrap();
        let recovery = recover(&stored, &Secret::new("hunter2"), "client secret");
        assert_eq!(recovery, SecretRecovery::Recovered(Secret::new("client-secret")));
        assert!(recovery.is_recovered());
    }

    #[test]
    fn test_recover_with_wrong_password_is_undecryptable() {
        let stored = cipher::encrypt("client-secret", "hunter2").unwrap();
        let recovery = recover(&stored, &Secret::new("changed"), "client secret");
        assert_eq!(recovery, SecretRecovery::Undecryptable);
        assert!(recovery.into_secret().is_none());
    }

    #[test]
    fn test_recover_nothing_stored() {
        let recovery = recover("  ", &Secret::new("hunter2"), "client secret");
        assert_eq!(recovery, SecretRecovery::NotStored);
    }

    #[test]
    fn test_recovered_empty_value_is_not_usable() {
        let recovery = SecretRecovery::Recovered(Secret::new(""));
        assert!(!recovery.is_recovered());
        assert!(recovery.into_secret().is_none());
    }
}
