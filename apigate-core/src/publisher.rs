//! Publisher REST API calls.
//!
//! APIs are looked up through the publisher's search endpoint. Listings from
//! REST API versions before v1 embed each API's swagger document in the
//! `apiDefinition` field; for v1 and later it is fetched separately from
//! `apis/{id}/swagger`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::token::AccessToken;

/// Error type for publisher calls.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// The request could not be sent or the response not read.
    #[error("publisher request failed: {message}")]
    Network { message: String },

    /// The publisher answered with an unexpected status.
    #[error("publisher returned {status} for {url}")]
    Status { status: u16, url: String },

    /// The response body was not what was expected.
    #[error("invalid publisher response: {message}")]
    Decode { message: String },
}

/// An API as returned by the publisher.
///
/// Fields this tool does not interpret are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDefinition {
    #[serde(default)]
    pub id: String,

    pub name: String,

    pub version: String,

    #[serde(default)]
    pub context: String,

    /// The API's swagger/OpenAPI document, as a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_definition: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ApiDefinition {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            version: version.into(),
            context: String::new(),
            api_definition: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.api_definition = Some(definition.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct ApiList {
    #[serde(default)]
    list: Vec<ApiDefinition>,
}

/// Client for the publisher REST API.
#[derive(Debug, Clone)]
pub struct PublisherClient {
    http: reqwest::Client,
    base: String,
    embeds_definitions: bool,
}

impl PublisherClient {
    /// Create a client for the publisher at `publisher`.
    ///
    /// `embeds_definitions` is false for REST API v1 and later.
    pub fn new(http: reqwest::Client, publisher: &Url, embeds_definitions: bool) -> Self {
        Self {
            http,
            base: publisher.as_str().trim_end_matches('/').to_string(),
            embeds_definitions,
        }
    }

    /// List every API published under `label`.
    pub async fn list_by_label(
        &self,
        label: &str,
        token: &AccessToken,
    ) -> Result<Vec<ApiDefinition>, PublisherError> {
        let apis = self.search(&format!("label:{}", label), token).await?;
        tracing::debug!("Publisher returned {} API(s) for label {}", apis.len(), label);

        let mut complete = Vec::with_capacity(apis.len());
        for api in apis {
            complete.push(self.with_swagger(api, token).await?);
        }
        Ok(complete)
    }

    /// Find the API with exactly `name` and `version`.
    pub async fn get_by_name_version(
        &self,
        name: &str,
        version: &str,
        token: &AccessToken,
    ) -> Result<Option<ApiDefinition>, PublisherError> {
        let candidates = self
            .search(&format!("name:{} version:{}", name, version), token)
            .await?;

        match candidates
            .into_iter()
            .find(|api| api.name == name && api.version == version)
        {
            Some(api) => Ok(Some(self.with_swagger(api, token).await?)),
            None => Ok(None),
        }
    }

    async fn search(
        &self,
        query: &str,
        token: &AccessToken,
    ) -> Result<Vec<ApiDefinition>, PublisherError> {
        let url = format!("{}/apis", self.base);
        let response = self
            .http
            .get(&url)
            .query(&[("query", query), ("expand", "true")])
            .header(reqwest::header::AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(|e| PublisherError::Network {
                message: e.to_string(),
            })?;

        let response = check_status(response, &url)?;
        let list: ApiList = response.json().await.map_err(|e| PublisherError::Decode {
            message: e.to_string(),
        })?;
        Ok(list.list)
    }

    async fn with_swagger(
        &self,
        mut api: ApiDefinition,
        token: &AccessToken,
    ) -> Result<ApiDefinition, PublisherError> {
        if self.embeds_definitions && api.api_definition.is_some() {
            return Ok(api);
        }
        if api.id.is_empty() {
            return Err(PublisherError::Decode {
                message: format!("API {} {} has no id", api.name, api.version),
            });
        }

        let url = format!("{}/apis/{}/swagger", self.base, api.id);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(|e| PublisherError::Network {
                message: e.to_string(),
            })?;

        let response = check_status(response, &url)?;
        let swagger = response.text().await.map_err(|e| PublisherError::Decode {
            message: e.to_string(),
        })?;

        api.api_definition = Some(swagger);
        Ok(api)
    }
}

fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response, PublisherError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::error!("Publisher call {} failed with status {}", url, status);
        Err(PublisherError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}
