//! The remote management service as seen by the import workflow.
//!
//! [`RemoteService`] is the contract the workflow needs: client registration,
//! token issuance and API lookups. A [`Connector`] builds one from the run's
//! resolved trust store and endpoints, once both are known.

use async_trait::async_trait;
use url::Url;

use crate::endpoints::ResolvedEndpoints;
use crate::error::ImportError;
use crate::model::{ClientRegistration, Credentials};
use crate::oauth::{self, OAuthError};
use crate::publisher::{ApiDefinition, PublisherClient, PublisherError};
use crate::token::AccessToken;
use crate::truststore::{TlsOptions, TrustStore};

/// Operations the import workflow performs against the management service.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Register a new OAuth client using the operator's credentials.
    async fn register_client(
        &self,
        registration_url: &Url,
        credentials: &Credentials,
    ) -> Result<ClientRegistration, OAuthError>;

    /// Exchange operator and client credentials for an access token.
    async fn issue_token(
        &self,
        token_url: &Url,
        credentials: &Credentials,
        client: &ClientRegistration,
    ) -> Result<AccessToken, OAuthError>;

    /// List the APIs published under a label.
    async fn list_by_label(
        &self,
        label: &str,
        token: &AccessToken,
    ) -> Result<Vec<ApiDefinition>, PublisherError>;

    /// Look up one API by name and version.
    async fn get_by_name_version(
        &self,
        name: &str,
        version: &str,
        token: &AccessToken,
    ) -> Result<Option<ApiDefinition>, PublisherError>;
}

/// Builds a [`RemoteService`] once TLS settings and endpoints are resolved.
pub trait Connector {
    type Service: RemoteService;

    fn connect(
        &self,
        trust_store: &TrustStore,
        insecure: bool,
        endpoints: &ResolvedEndpoints,
    ) -> Result<Self::Service, ImportError>;
}

/// [`RemoteService`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpRemoteService {
    http: reqwest::Client,
    publisher: PublisherClient,
}

impl HttpRemoteService {
    pub fn new(tls: &TlsOptions, endpoints: &ResolvedEndpoints) -> Result<Self, reqwest::Error> {
        let http = tls.build_client()?;
        let publisher = PublisherClient::new(http.clone(), &endpoints.publisher, !endpoints.is_rest_v1());
        Ok(Self { http, publisher })
    }
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn register_client(
        &self,
        registration_url: &Url,
        credentials: &Credentials,
    ) -> Result<ClientRegistration, OAuthError> {
        oauth::registration::register_client(&self.http, registration_url, credentials).await
    }

    async fn issue_token(
        &self,
        token_url: &Url,
        credentials: &Credentials,
        client: &ClientRegistration,
    ) -> Result<AccessToken, OAuthError> {
        oauth::password::issue_token(&self.http, token_url, credentials, client).await
    }

    async fn list_by_label(
        &self,
        label: &str,
        token: &AccessToken,
    ) -> Result<Vec<ApiDefinition>, PublisherError> {
        self.publisher.list_by_label(label, token).await
    }

    async fn get_by_name_version(
        &self,
        name: &str,
        version: &str,
        token: &AccessToken,
    ) -> Result<Option<ApiDefinition>, PublisherError> {
        self.publisher.get_by_name_version(name, version, token).await
    }
}

/// [`Connector`] producing [`HttpRemoteService`]s.
///
/// With `insecure` set the trust store is not read at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    type Service = HttpRemoteService;

    fn connect(
        &self,
        trust_store: &TrustStore,
        insecure: bool,
        endpoints: &ResolvedEndpoints,
    ) -> Result<Self::Service, ImportError> {
        let certificates = if insecure {
            tracing::debug!("Not reading trust store {:?}; verification is off", trust_store.path);
            Vec::new()
        } else {
            trust_store.load_certificates()?
        };
        let tls = TlsOptions::new(certificates, insecure);
        HttpRemoteService::new(&tls, endpoints).map_err(|e| {
            tracing::error!("Failed to build HTTP client: {}", e);
            ImportError::internal("Error occurred while setting up the HTTP client.")
        })
    }
}
