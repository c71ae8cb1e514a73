//! The `import` workflow.
//!
//! [`Importer::run`] drives one import from start to finish:
//!
//! 1. Check the project exists and prepare the install home
//! 2. Load the toolkit configuration
//! 3. Validate the import target
//! 4. Resolve credentials, endpoints and the trust store
//! 5. Recover the stored OAuth client and bootstrap an access token
//! 6. Fetch the APIs and save their definitions into the project
//! 7. Rewrite the configuration if anything was newly entered
//!
//! Every failure aborts the run; the configuration file is only written
//! after the definitions were saved.

use std::path::PathBuf;

use crate::artifacts;
use crate::cipher;
use crate::config::StoredConfig;
use crate::credentials::resolve_credentials;
use crate::endpoints::resolve_endpoints;
use crate::error::ImportError;
use crate::model::{ClientRegistration, ImportTarget, TokenConfig};
use crate::oauth;
use crate::prompt::Prompter;
use crate::publisher::ApiDefinition;
use crate::remote::{Connector, RemoteService};
use crate::secret::{self, Secret};
use crate::truststore::resolve_trust_store;
use crate::workspace::Toolkit;

/// Name of the command-line tool, used in operator hints.
pub const TOOL_NAME: &str = "apigate";

/// Options for one import, as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub project_name: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub label: Option<String>,
    pub server_url: Option<String>,
    pub trust_store: Option<String>,
    pub trust_store_password: Option<String>,
    pub config_path: Option<PathBuf>,
    pub api_name: Option<String>,
    pub version: Option<String>,
    pub insecure: bool,
}

/// Summary of a successful import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    /// The imported APIs, in the order the publisher returned them.
    pub apis: Vec<ApiDefinition>,

    /// Definition files written into the project.
    pub saved: Vec<PathBuf>,

    /// Whether the configuration file was rewritten.
    pub config_rewritten: bool,
}

/// Runs the import workflow with injected prompting and remote access.
pub struct Importer<'a, P: Prompter, C: Connector> {
    toolkit: &'a Toolkit,
    prompter: &'a P,
    connector: &'a C,
}

impl<'a, P: Prompter, C: Connector> Importer<'a, P, C> {
    pub fn new(toolkit: &'a Toolkit, prompter: &'a P, connector: &'a C) -> Self {
        Self {
            toolkit,
            prompter,
            connector,
        }
    }

    /// Run one import.
    pub async fn run(&self, options: &ImportOptions) -> Result<ImportReport, ImportError> {
        let project_dir = self.toolkit.project_dir(&options.project_name);
        if !project_dir.is_dir() {
            return Err(ImportError::usage(format!(
                "Project {name} does not exist. Please use '{tool} init {name}' to initialize the project.",
                name = options.project_name,
                tool = TOOL_NAME
            )));
        }

        self.toolkit.prepare()?;

        let config_path = options
            .config_path
            .clone()
            .unwrap_or_else(|| self.toolkit.default_config_path());
        let config = StoredConfig::load(&config_path).map_err(|e| {
            tracing::error!("Error occurred while loading configuration {:?}: {}", config_path, e);
            ImportError::internal("Error occurred while loading configurations.")
        })?;
        tracing::info!("Loaded configuration from {:?}", config_path);

        let target = ImportTarget::from_selectors(
            options.label.as_deref(),
            options.api_name.as_deref(),
            options.version.as_deref(),
        )?;

        let mut needs_persist = false;

        let credentials = resolve_credentials(
            &config.token,
            options.username.as_deref(),
            options.password.as_deref(),
            self.prompter,
        )?;
        needs_persist |= credentials.needs_persist;
        let credentials = credentials.credentials;

        let endpoints = resolve_endpoints(&config.token, options.server_url.as_deref(), self.prompter)?;
        needs_persist |= endpoints.needs_persist;
        let endpoints = endpoints.endpoints;

        let trust_store = resolve_trust_store(
            &config.token,
            options.trust_store.as_deref(),
            options.trust_store_password.as_deref(),
            &credentials.password,
            self.toolkit.home(),
            self.prompter,
        )?;
        needs_persist |= trust_store.needs_persist;
        let trust_store = trust_store.trust_store;

        let service = self
            .connector
            .connect(&trust_store, options.insecure, &endpoints)?;

        let cached = stored_client(&config.token, &credentials.password);
        let bootstrap = oauth::bootstrap(&service, &endpoints, &credentials, cached).await?;
        needs_persist |= bootstrap.registered;

        let apis = fetch(&service, &target, &bootstrap.access_token).await?;
        tracing::info!("Fetched {} API(s) for {}", apis.len(), target);

        let saved = artifacts::save_definitions(&project_dir, &apis).map_err(|e| {
            tracing::error!("Failed to save API definitions into {:?}: {}", project_dir, e);
            ImportError::internal("Exception occurred while saving the API definitions.")
        })?;

        if needs_persist {
            let token = TokenConfig {
                username: credentials.username.clone(),
                client_id: bootstrap.client.client_id.clone(),
                client_secret: seal(&bootstrap.client.client_secret, &credentials.password)?,
                trust_store_location: trust_store.location.clone(),
                trust_store_password: seal(&trust_store.password, &credentials.password)?,
                ..endpoints.apply_to(&config.token)
            };
            config.with_token(token).save(&config_path).map_err(|e| {
                tracing::error!("Failed to write configuration {:?}: {}", config_path, e);
                ImportError::internal("Error occurred while saving configurations.")
            })?;
            tracing::info!("Updated configuration at {:?}", config_path);
        }

        self.prompter.notify(&format!(
            "\n(Use \"{} build {}\" to build the project)",
            TOOL_NAME, options.project_name
        ));

        Ok(ImportReport {
            apis,
            saved,
            config_rewritten: needs_persist,
        })
    }
}

/// The OAuth client stored in the configuration, if it can be unlocked.
fn stored_client(token: &TokenConfig, password: &Secret) -> Option<ClientRegistration> {
    let client_id = token.client_id.trim();
    if client_id.is_empty() {
        return None;
    }

    secret::recover(&token.client_secret, password, "client secret")
        .into_secret()
        .map(|client_secret| ClientRegistration {
            client_id: client_id.to_string(),
            client_secret,
        })
}

async fn fetch<S: RemoteService + ?Sized>(
    service: &S,
    target: &ImportTarget,
    token: &crate::token::AccessToken,
) -> Result<Vec<ApiDefinition>, ImportError> {
    let apis = match target {
        ImportTarget::Label(label) => service.list_by_label(label, token).await?,
        ImportTarget::NameVersion { name, version } => service
            .get_by_name_version(name, version, token)
            .await?
            .into_iter()
            .collect(),
    };

    if apis.is_empty() {
        let message = match target {
            ImportTarget::Label(label) => format!("No APIs found for the given label: {}", label),
            ImportTarget::NameVersion { name, version } => format!(
                "No Published APIs matched for name:{}, version:{}",
                name, version
            ),
        };
        return Err(ImportError::runtime(message));
    }

    Ok(apis)
}

fn seal(value: &Secret, password: &Secret) -> Result<String, ImportError> {
    cipher::encrypt(value.expose(), password.expose()).map_err(|e| {
        tracing::error!("Failed to encrypt a secret for the configuration: {}", e);
        ImportError::internal("Error occurred while saving configurations.")
    })
}
