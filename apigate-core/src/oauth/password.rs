//! Resource-owner password grant.
//!
//! Exchanges the operator's username and password, authenticated by the
//! registered OAuth client, for an access token.

use oauth2::{ResourceOwnerPassword, ResourceOwnerUsername, Scope, TokenResponse};
use url::Url;

use super::{OAuthError, create_oauth_client, send_request};
use crate::model::{ClientRegistration, Credentials};
use crate::token::AccessToken;

/// Scope needed to list and read APIs from the publisher.
pub const API_VIEW_SCOPE: &str = "apim:api_view";

/// Request an access token from `token_url`.
pub async fn issue_token(
    http: &reqwest::Client,
    token_url: &Url,
    credentials: &Credentials,
    client: &ClientRegistration,
) -> Result<AccessToken, OAuthError> {
    let oauth_client = create_oauth_client(token_url, client)?;

    tracing::debug!("Requesting access token from {}", token_url);

    let username = ResourceOwnerUsername::new(credentials.username.clone());
    let password = ResourceOwnerPassword::new(credentials.password.expose().to_string());

    let token_result = oauth_client
        .exchange_password(&username, &password)
        .add_scope(Scope::new(API_VIEW_SCOPE.to_string()))
        .request_async(|request| send_request(http, request))
        .await
        .map_err(|e| OAuthError::Token {
            message: format!("token request failed: {}", e),
        })?;

    let mut token = AccessToken::new(token_result.access_token().secret().to_string());

    if let Some(duration) = token_result.expires_in() {
        let expires_at = chrono::Utc::now()
            + chrono::Duration::from_std(duration).map_err(|e| OAuthError::Token {
                message: format!("invalid expiration duration: {}", e),
            })?;
        tracing::debug!("Access token expires at {}", expires_at);
        token = token.with_expiry(expires_at);
    }

    tracing::info!("Obtained access token for {}", credentials.username);
    Ok(token)
}
