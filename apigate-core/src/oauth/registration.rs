//! Dynamic client registration.
//!
//! The registration endpoint is called with the operator's credentials in an
//! HTTP basic `Authorization` header and issues a fresh OAuth client id and
//! secret for the tool.

use serde::{Deserialize, Serialize};
use url::Url;

use super::OAuthError;
use crate::model::{ClientRegistration, Credentials};

/// Name under which the tool registers its OAuth client.
pub const CLIENT_NAME: &str = "rest_api_apigate";

/// Grant types requested for the registered client.
pub const GRANT_TYPES: &str = "password refresh_token";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationRequest<'a> {
    callback_url: &'a str,
    client_name: &'a str,
    owner: &'a str,
    grant_type: &'a str,
    saas_app: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationResponse {
    client_id: Option<String>,
    client_secret: Option<String>,
}

/// Register an OAuth client for `credentials.username`.
pub async fn register_client(
    http: &reqwest::Client,
    registration_url: &Url,
    credentials: &Credentials,
) -> Result<ClientRegistration, OAuthError> {
    let request = RegistrationRequest {
        callback_url: "http://localhost",
        client_name: CLIENT_NAME,
        owner: &credentials.username,
        grant_type: GRANT_TYPES,
        saas_app: true,
    };

    tracing::debug!("Registering OAuth client at {}", registration_url);

    let response = http
        .post(registration_url.clone())
        .basic_auth(&credentials.username, Some(credentials.password.expose()))
        .json(&request)
        .send()
        .await
        .map_err(|e| OAuthError::Network {
            message: format!("client registration request failed: {}", e),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Client registration failed with status {}: {}", status, body);
        return Err(OAuthError::Registration {
            message: format!("registration endpoint returned {}", status),
        });
    }

    let body: RegistrationResponse = response.json().await.map_err(|e| OAuthError::Registration {
        message: format!("invalid registration response: {}", e),
    })?;

    match (body.client_id, body.client_secret) {
        (Some(client_id), Some(client_secret))
            if !client_id.is_empty() && !client_secret.is_empty() =>
        {
            tracing::info!("Registered OAuth client {}", client_id);
            Ok(ClientRegistration::new(client_id, client_secret))
        }
        _ => Err(OAuthError::Registration {
            message: "registration response is missing the client id or secret".to_string(),
        }),
    }
}
