//! OAuth 2.0 bootstrap against the management service.
//!
//! This module provides:
//! - [`registration`] - Dynamic client registration
//! - [`password`] - Resource-owner password grant
//! - [`bootstrap`] - Register a client when needed, then obtain a token
//!
//! Every request goes through a `reqwest` client built from the run's
//! [`TlsOptions`](crate::truststore::TlsOptions), including the token request
//! made by the `oauth2` crate, which is routed through [`send_request`].

pub mod password;
pub mod registration;

use oauth2::basic::BasicClient;
use oauth2::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use oauth2::{AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, TokenUrl};
use thiserror::Error;
use url::Url;

use crate::endpoints::ResolvedEndpoints;
use crate::model::{ClientRegistration, Credentials};
use crate::remote::RemoteService;
use crate::token::AccessToken;

/// Error type for OAuth operations.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Dynamic client registration failed.
    #[error("client registration failed: {message}")]
    Registration { message: String },

    /// The token request failed.
    #[error("access token request failed: {message}")]
    Token { message: String },

    /// The request could not be sent or the response not read.
    #[error("network error: {message}")]
    Network { message: String },
}

/// Error raised by the HTTP adapter handed to the `oauth2` crate.
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("invalid HTTP message: {0}")]
    Http(String),
}

/// Outcome of the OAuth bootstrap.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub access_token: AccessToken,
    pub client: ClientRegistration,

    /// Set when the client was registered during this run.
    pub registered: bool,
}

/// Obtain an access token, registering an OAuth client first if needed.
///
/// `cached` is the client recovered from the configuration, if any. When it
/// is absent a new client is registered and [`Bootstrap::registered`] is
/// set so the caller persists it. Failures are not retried.
pub async fn bootstrap<S>(
    service: &S,
    endpoints: &ResolvedEndpoints,
    credentials: &Credentials,
    cached: Option<ClientRegistration>,
) -> Result<Bootstrap, OAuthError>
where
    S: RemoteService + ?Sized,
{
    let (client, registered) = match cached {
        Some(client) => {
            tracing::debug!("Using stored OAuth client {}", client.client_id);
            (client, false)
        }
        None => {
            tracing::info!("No usable OAuth client stored; registering a new one");
            let client = service
                .register_client(&endpoints.registration, credentials)
                .await?;
            (client, true)
        }
    };

    let access_token = service
        .issue_token(&endpoints.token, credentials, &client)
        .await?;

    Ok(Bootstrap {
        access_token,
        client,
        registered,
    })
}

/// Create an OAuth2 client for the token endpoint.
pub fn create_oauth_client(
    token_url: &Url,
    client: &ClientRegistration,
) -> Result<BasicClient, OAuthError> {
    let auth_url = AuthUrl::new(token_url.to_string()).map_err(|e| OAuthError::Token {
        message: format!("invalid token URL: {}", e),
    })?;
    let token_url = TokenUrl::new(token_url.to_string()).map_err(|e| OAuthError::Token {
        message: format!("invalid token URL: {}", e),
    })?;

    Ok(BasicClient::new(
        ClientId::new(client.client_id.clone()),
        Some(ClientSecret::new(client.client_secret.expose().to_string())),
        auth_url,
        Some(token_url),
    ))
}

/// Send an `oauth2` request with a preconfigured `reqwest` client.
pub async fn send_request(
    http: &reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, HttpClientError> {
    let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
        .map_err(|e| HttpClientError::Http(e.to_string()))?;

    let mut builder = http.request(method, request.url.as_str()).body(request.body);
    for (name, value) in request.headers.iter() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }

    let response = builder.send().await?;

    let status_code = StatusCode::from_u16(response.status().as_u16())
        .map_err(|e| HttpClientError::Http(e.to_string()))?;

    let mut headers = HeaderMap::new();
    for (name, value) in response.headers() {
        let name = HeaderName::from_bytes(name.as_str().as_bytes())
            .map_err(|e| HttpClientError::Http(e.to_string()))?;
        let value = HeaderValue::from_bytes(value.as_bytes())
            .map_err(|e| HttpClientError::Http(e.to_string()))?;
        headers.append(name, value);
    }

    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
