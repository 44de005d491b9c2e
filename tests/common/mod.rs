//! Shared fixtures for integration tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spatialtokens_core::{FetchError, Settings, TokenResolver, TokenStore, Transport};

pub const PRIMARY: &str = "https://primary.test";
pub const SECONDARY: &str = "https://secondary.test";

/// Canned responses per URL. Unknown URLs are unreachable.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: HashMap<String, (Duration, Result<Value, u16>)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn respond(mut self, url: String, delay: Duration, body: Value) -> Self {
        self.routes.insert(url, (delay, Ok(body)));
        self
    }

    pub fn fail(mut self, url: String, status: u16) -> Self {
        self.routes.insert(url, (Duration::ZERO, Err(status)));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.routes.get(url) {
            Some((delay, result)) => {
                tokio::time::sleep(*delay).await;
                result.clone().map_err(FetchError::Status)
            }
            None => Err(FetchError::Transport(format!("unreachable: {url}"))),
        }
    }
}

pub fn settings() -> Settings {
    Settings {
        primary_endpoint: PRIMARY.to_string(),
        secondary_endpoint: SECONDARY.to_string(),
        ..Settings::default()
    }
}

pub fn store() -> Arc<TokenStore> {
    Arc::new(TokenStore::embedded().unwrap())
}

pub fn resolver(transport: Arc<ScriptedTransport>) -> Arc<TokenResolver> {
    Arc::new(TokenResolver::new(transport, store(), &settings()))
}
