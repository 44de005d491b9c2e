//! Transport - "GET a URL, get JSON back"
//!
//! The resolver and detector only ever talk to this trait. Timeouts are
//! applied by the caller, not the transport.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::state::DesignState;
use crate::tokens::SchemaError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Endpoint returned status {0}")]
    Status(u16),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported payload schema: {0}")]
    Schema(#[from] SchemaError),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// `GET <base>/design-system/tokens?state=<state>`
pub fn tokens_url(base: &str, state: DesignState) -> String {
    format!("{}/design-system/tokens?state={}", base.trim_end_matches('/'), state)
}

/// `GET <base>/m4-optimization`
pub fn capability_url(base: &str) -> String {
    format!("{}/m4-optimization", base.trim_end_matches('/'))
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("spatialtokens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Transport that never reaches anything. Every resolution uses the embedded store.
pub struct OfflineTransport;

#[async_trait]
impl Transport for OfflineTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        Err(FetchError::Transport(format!("offline: {url}")))
    }
}
