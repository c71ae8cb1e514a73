//! # apigate Core
//!
//! Core library for importing API definitions from an API management
//! publisher into a local gateway project.
//!
//! This crate provides:
//! - Resolution of partially specified settings (flags, configuration file,
//!   interactive prompts) into service endpoints, credentials and a trust store
//! - OAuth client registration and password-grant token acquisition
//! - Publisher API lookups by label or by name and version
//! - The [`Importer`] workflow tying it all together
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apigate_core::{HttpConnector, ImportOptions, Importer, TerminalPrompter, Toolkit};
//!
//! async fn import(options: ImportOptions) -> Result<(), apigate_core::ImportError> {
//!     let toolkit = Toolkit::from_env()?;
//!     let prompter = TerminalPrompter::new();
//!     let report = Importer::new(&toolkit, &prompter, &HttpConnector).run(&options).await?;
//!     println!("Imported {} API(s)", report.apis.len());
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod cipher;
pub mod config;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod import;
pub mod model;
pub mod oauth;
pub mod prompt;
pub mod publisher;
pub mod remote;
pub mod secret;
pub mod token;
pub mod truststore;
pub mod workspace;

// Re-export commonly used types at crate root
pub use model::{
    ClientRegistration,
    Credentials,
    ImportTarget,
    TokenConfig,
};

pub use config::{ConfigError, StoredConfig};

pub use secret::{Secret, SecretRecovery};

pub use endpoints::{EndpointResolution, ResolvedEndpoints, resolve_endpoints};

pub use credentials::{CredentialResolution, resolve_credentials};

pub use truststore::{TlsOptions, TrustStore, TrustStoreResolution, resolve_trust_store};

pub use prompt::{PromptError, Prompter, ScriptedPrompter, TerminalPrompter};

pub use token::AccessToken;

pub use oauth::{Bootstrap, OAuthError, bootstrap};

pub use publisher::{ApiDefinition, PublisherError};

pub use remote::{Connector, HttpConnector, HttpRemoteService, RemoteService};

pub use import::{ImportOptions, ImportReport, Importer};

pub use workspace::Toolkit;

pub use error::ImportError;
