//! Top-level error types for apigate.
//!
//! Every failure of the import workflow lands in one of three tiers, each
//! with its own process exit status.

use thiserror::Error;

use crate::oauth::OAuthError;
use crate::prompt::PromptError;
use crate::publisher::PublisherError;

/// Exit status for usage errors (`EX_USAGE`).
pub const EXIT_USAGE: u8 = 64;

/// Exit status for remote or environment failures (`EX_UNAVAILABLE`).
pub const EXIT_RUNTIME: u8 = 69;

/// Exit status for internal failures (`EX_SOFTWARE`).
pub const EXIT_INTERNAL: u8 = 70;

/// Top-level error type for the import workflow.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The operator supplied missing or conflicting input.
    #[error("{message}")]
    Usage { message: String },

    /// This tool's own configuration or logic is inconsistent.
    #[error("{message}")]
    Internal { message: String },

    /// The environment or the remote service failed.
    #[error("{message}")]
    Runtime { message: String },
}

impl ImportError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage { .. } => EXIT_USAGE,
            Self::Internal { .. } => EXIT_INTERNAL,
            Self::Runtime { .. } => EXIT_RUNTIME,
        }
    }

    /// Whether command usage should be printed alongside the message.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. })
    }
}

impl From<OAuthError> for ImportError {
    fn from(e: OAuthError) -> Self {
        Self::runtime(e.to_string())
    }
}

impl From<PublisherError> for ImportError {
    fn from(e: PublisherError) -> Self {
        Self::runtime(e.to_string())
    }
}

impl From<PromptError> for ImportError {
    fn from(e: PromptError) -> Self {
        Self::runtime(e.to_string())
    }
}
