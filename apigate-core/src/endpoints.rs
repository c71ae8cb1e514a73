//! Resolution of the four service endpoints.
//!
//! Endpoints in the configuration may be empty, complete URLs, or templates
//! containing the placeholders [`BASE_URL_TAG`], [`REST_VERSION_TAG`] and
//! [`DCR_VERSION_TAG`]. [`resolve_endpoints`] fills empty endpoints with the
//! built-in templates, settles the base URL and API versions (prompting only
//! for the base URL), substitutes placeholders, and validates the results.
//!
//! # Placeholder detection
//!
//! The registration endpoint is versioned by dynamic client registration, so
//! it is checked for `{dcrVersion}` while the publisher and admin endpoints
//! are checked for `{restVersion}`. A `{restVersion}` in the token endpoint is
//! substituted when versions are resolved for any other reason, but does not
//! by itself trigger version resolution.

use url::Url;

use crate::error::ImportError;
use crate::model::TokenConfig;
use crate::prompt::Prompter;

/// Placeholder for the management service base URL.
pub const BASE_URL_TAG: &str = "{baseURL}";

/// Placeholder for the publisher/admin REST API version.
pub const REST_VERSION_TAG: &str = "{restVersion}";

/// Placeholder for the dynamic client registration API version.
pub const DCR_VERSION_TAG: &str = "{dcrVersion}";

/// Base URL used when neither the command line nor the configuration has one.
pub const DEFAULT_BASE_URL: &str = "https://localhost:9443";

/// Version used for empty `restVersion` and `dcrVersion` settings.
pub const DEFAULT_REST_VERSION: &str = "v0.14";

/// Default publisher endpoint template.
pub const DEFAULT_PUBLISHER_ENDPOINT: &str = "{baseURL}/api/am/publisher/{restVersion}";

/// Default admin endpoint template.
pub const DEFAULT_ADMIN_ENDPOINT: &str = "{baseURL}/api/am/admin/{restVersion}";

/// Default dynamic client registration endpoint template.
pub const DEFAULT_REGISTRATION_ENDPOINT: &str = "{baseURL}/client-registration/{dcrVersion}/register";

/// Default token endpoint template.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "{baseURL}/oauth2/token";

/// Fully resolved service endpoints for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoints {
    pub publisher: Url,
    pub admin: Url,
    pub registration: Url,
    pub token: Url,

    /// Base URL in effect (the configured one when none was needed).
    pub base_url: String,

    /// Publisher/admin REST API version in effect.
    pub rest_version: String,

    /// Dynamic client registration API version in effect.
    pub dcr_version: String,
}

impl ResolvedEndpoints {
    /// Copy the resolved base URL and versions into a token configuration.
    ///
    /// Endpoint fields keep whatever the configuration held, templates
    /// included, so a rewritten configuration stays portable.
    pub fn apply_to(&self, token: &TokenConfig) -> TokenConfig {
        TokenConfig {
            base_url: self.base_url.clone(),
            rest_version: self.rest_version.clone(),
            dcr_version: self.dcr_version.clone(),
            ..token.clone()
        }
    }

    /// Whether the publisher REST API is v1 or later.
    ///
    /// Those versions do not embed the swagger document in API listings.
    pub fn is_rest_v1(&self) -> bool {
        self.rest_version.starts_with("v1")
    }
}

/// Result of endpoint resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolution {
    pub endpoints: ResolvedEndpoints,

    /// Set when the operator typed a new base URL.
    pub needs_persist: bool,
}

/// Resolve the four endpoints from the configuration and `--server-url`.
///
/// The operator is asked to confirm the base URL only when it is needed and
/// was not given on the command line. Any non-empty answer replaces the
/// default and marks the configuration for rewriting.
///
/// # Errors
///
/// Returns [`ImportError::Internal`] if a resolved endpoint is not a valid
/// HTTP(S) URL, and [`ImportError::Runtime`] if prompting fails.
pub fn resolve_endpoints(
    token: &TokenConfig,
    cli_base_url: Option<&str>,
    prompter: &dyn Prompter,
) -> Result<EndpointResolution, ImportError> {
    let mut publisher = token.publisher_endpoint.clone();
    let mut admin = token.admin_endpoint.clone();
    let mut registration = token.registration_endpoint.clone();
    let mut token_endpoint = token.token_endpoint.clone();
    let mut base_url = token.base_url.clone();
    let mut rest_version = token.rest_version.clone();
    let mut dcr_version = token.dcr_version.clone();
    let mut needs_persist = false;

    let needs_any_endpoint = [&publisher, &admin, &registration, &token_endpoint]
        .iter()
        .any(|endpoint| endpoint.is_empty());

    let needs_base_url = needs_any_endpoint
        || [&publisher, &admin, &registration, &token_endpoint]
            .iter()
            .any(|endpoint| endpoint.contains(BASE_URL_TAG));

    let needs_rest_version = needs_any_endpoint
        || publisher.contains(REST_VERSION_TAG)
        || admin.contains(REST_VERSION_TAG)
        || registration.contains(DCR_VERSION_TAG);

    tracing::debug!(
        needs_any_endpoint,
        needs_base_url,
        needs_rest_version,
        "Resolving service endpoints"
    );

    if needs_any_endpoint {
        fill_default(&mut publisher, DEFAULT_PUBLISHER_ENDPOINT);
        fill_default(&mut admin, DEFAULT_ADMIN_ENDPOINT);
        fill_default(&mut registration, DEFAULT_REGISTRATION_ENDPOINT);
        fill_default(&mut token_endpoint, DEFAULT_TOKEN_ENDPOINT);
    }

    if needs_base_url {
        match cli_base_url.filter(|url| !url.is_empty()) {
            Some(url) => base_url = url.to_string(),
            None => {
                if base_url.is_empty() {
                    base_url = DEFAULT_BASE_URL.to_string();
                }

                let entered = prompter.read_line(&format!("Enter APIM base URL [{}]: ", base_url))?;
                let entered = entered.trim();
                if !entered.is_empty() {
                    base_url = entered.to_string();
                    needs_persist = true;
                }
            }
        }
        tracing::debug!("Using base URL {}", base_url);
    }

    if needs_rest_version {
        if rest_version.is_empty() {
            rest_version = DEFAULT_REST_VERSION.to_string();
        }
        if dcr_version.is_empty() {
            dcr_version = DEFAULT_REST_VERSION.to_string();
        }
        prompter.notify(&format!(
            "You are using REST version - {} and dynamic client registration version - {} \
             of API Manager.\n(If you want to change this, edit the [token] section of the \
             toolkit configuration file)",
            rest_version, dcr_version
        ));
    }

    if needs_base_url || needs_rest_version {
        let substitute = |endpoint: &str, version_tag: &str, version: &str| {
            endpoint
                .replace(BASE_URL_TAG, &base_url)
                .replace(version_tag, version)
        };
        publisher = substitute(&publisher, REST_VERSION_TAG, &rest_version);
        admin = substitute(&admin, REST_VERSION_TAG, &rest_version);
        registration = substitute(&registration, DCR_VERSION_TAG, &dcr_version);
        token_endpoint = substitute(&token_endpoint, REST_VERSION_TAG, &rest_version);
    }

    let endpoints = ResolvedEndpoints {
        publisher: validate_url(&publisher)?,
        admin: validate_url(&admin)?,
        registration: validate_url(&registration)?,
        token: validate_url(&token_endpoint)?,
        base_url,
        rest_version,
        dcr_version,
    };

    Ok(EndpointResolution {
        endpoints,
        needs_persist,
    })
}

fn fill_default(endpoint: &mut String, template: &str) {
    if endpoint.is_empty() {
        *endpoint = template.to_string();
    }
}

/// Parse an endpoint, accepting only absolute HTTP(S) URLs with a host.
pub fn validate_url(endpoint: &str) -> Result<Url, ImportError> {
    let url = Url::parse(endpoint).map_err(|e| {
        tracing::error!("Malformed URL provided {}: {}", endpoint, e);
        ImportError::internal("Error occurred while setting up URL configurations.")
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        tracing::error!("Malformed URL provided {}: not an HTTP(S) URL", endpoint);
        return Err(ImportError::internal(
            "Error occurred while setting up URL configurations.",
        ));
    }

    Ok(url)
}
