//! GraphQL transport
//!
//! The gateway speaks to the cart service through [`GraphQlTransport`]. The
//! production implementation posts JSON over HTTPS with reqwest; tests swap in
//! a scripted transport.

use crate::documents::GraphQlRequest;
use async_trait::async_trait;
use cartsync_core::{CartError, CartSyncConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

/// Header carrying the storefront access token (`X-Shopify-Storefront-Access-Token`)
pub const ACCESS_TOKEN_HEADER: &str = "x-shopify-storefront-access-token";

/// Executes one GraphQL request and returns the raw JSON body
#[async_trait]
pub trait GraphQlTransport: Send + Sync {
    /// Send `request` and return the decoded JSON body
    async fn execute(&self, request: &GraphQlRequest) -> Result<Value, CartError>;
}

/// JSON-over-HTTPS transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpTransport {
    /// Create transport for `endpoint` authenticated with `token`
    ///
    /// # Errors
    /// - `CartError::Transport` if the endpoint or token is unusable
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self, CartError> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| CartError::transport(format!("invalid endpoint: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut token = HeaderValue::from_str(token)
            .map_err(|e| CartError::transport(format!("invalid access token: {e}")))?;
        token.set_sensitive(true);
        headers.insert(HeaderName::from_static(ACCESS_TOKEN_HEADER), token);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CartError::transport(format!("http client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    /// Create transport from engine configuration
    pub fn from_config(config: &CartSyncConfig) -> Result<Self, CartError> {
        Self::new(
            &config.endpoint,
            &config.access_token,
            config.request_timeout(),
        )
    }

    /// Endpoint requests are posted to
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

#[async_trait]
impl GraphQlTransport for HttpTransport {
    async fn execute(&self, request: &GraphQlRequest) -> Result<Value, CartError> {
        tracing::debug!(operation = request.operation.name(), "posting graphql request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| CartError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CartError::transport(format!("http status {status}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CartError::transport(format!("malformed response: {e}")))
    }
}
