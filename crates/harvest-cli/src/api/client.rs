//! HTTP API client
//!
//! reqwest-backed [`JsonTransport`] with bearer-token auth.

use crate::api::endpoints;
use crate::api::transport::{FetchError, JsonTransport};
use crate::config::HarvestConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::trace;

/// API client for the paginated service
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: String, auth_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("harvest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    /// Create from a resolved configuration
    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        Self::new(
            config.endpoint_base.clone(),
            config.auth_token.clone(),
            config.request_timeout(),
        )
    }
}

#[async_trait]
impl JsonTransport for ApiClient {
    async fn get_json(&self, path: &str) -> std::result::Result<Value, FetchError> {
        let url = endpoints::join_url(&self.base_url, path);
        trace!(url = %url, "GET");

        let mut request = self.client.get(&url).header(ACCEPT, "application/json");
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }
}
