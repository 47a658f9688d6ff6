//! Collector transport
//!
//! The dispatcher only needs "post this JSON, tell me the status". Keeping
//! that behind a trait lets tests script collector behaviour without sockets.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{DispatchError, TransportError};

/// `User-Agent` sent with every request
pub const USER_AGENT: &str = concat!("telemetry-relay/", env!("CARGO_PKG_VERSION"));

/// One HTTP exchange with the collector
#[trait_variant::make(CollectorTransport: Send)]
pub trait LocalCollectorTransport {
    /// POST `body` as JSON, returning the response status
    async fn post_json(&self, url: &str, body: &Value) -> Result<u16, TransportError>;

    /// GET `url`, returning the response status
    async fn get(&self, url: &str) -> Result<u16, TransportError>;
}

/// reqwest-backed transport
///
/// Timeouts are enforced by the caller per attempt, so the client itself has
/// none.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DispatchError::ClientBuild(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap a preconfigured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl CollectorTransport for HttpTransport {
    #[instrument(name = "http_post", skip(self, body), fields(url = %url))]
    async fn post_json(&self, url: &str, body: &Value) -> Result<u16, TransportError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status().as_u16();
        debug!(status, "collector responded");
        Ok(status)
    }

    #[instrument(name = "http_get", skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> Result<u16, TransportError> {
        let response = self.client.get(url).send().await?;
        Ok(response.status().as_u16())
    }
}
