//! Gateway transport
//!
//! The single request function all outbound operations funnel through.
//! [`HttpGateway`] posts action descriptors to the local gateway node;
//! tests substitute their own [`GatewayTransport`] implementations.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::GatewayError;
use super::types::GatewayAction;

/// Default HTTP client timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The one asynchronous function the content network is reached through.
///
/// Implementations must not retry on the caller's behalf; the cache and
/// queue layers above rely on errors propagating verbatim.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn request(&self, action: GatewayAction) -> Result<Value, GatewayError>;
}

/// HTTP transport against a gateway node's request endpoint
pub struct HttpGateway {
    http_client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Create a transport with the default request timeout
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Create a transport with a custom request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl GatewayTransport for HttpGateway {
    async fn request(&self, action: GatewayAction) -> Result<Value, GatewayError> {
        let url = format!("{}/request", self.base_url);
        debug!(action = action.name(), "Dispatching gateway request");

        let response = self.http_client.post(&url).json(&action).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(action = action.name(), status = status, "Gateway request failed");
            return Err(GatewayError::from_status(status, &body));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Request(format!("Malformed gateway response: {e}")))?;

        Ok(value)
    }
}
