//! Token Resolver - Primary, Secondary, Embedded
//!
//! `resolve` never fails. Transport failures fall through to the next tier;
//! partial payloads are completed from the embedded copy of the same state.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::state::DesignState;
use crate::store::TokenStore;
use crate::tokens::{TokenCategory, TokenPayload, TokenSet};
use crate::transport::{tokens_url, FetchError, Transport};

/// Which tier served a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    Primary,
    Secondary,
    Embedded,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Embedded => "embedded",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub state: DesignState,
    pub tokens: TokenSet,
    pub source: TokenSource,
    pub backfilled: Vec<TokenCategory>,
}

pub struct TokenResolver {
    transport: Arc<dyn Transport>,
    store: Arc<TokenStore>,
    primary: String,
    secondary: String,
    timeout: Duration,
}

impl TokenResolver {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<TokenStore>, settings: &Settings) -> Self {
        Self {
            transport,
            store,
            primary: settings.primary_endpoint.clone(),
            secondary: settings.secondary_endpoint.clone(),
            timeout: settings.request_timeout(),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Always returns a complete, freshly owned token set for `state`.
    pub async fn resolve(&self, state: DesignState) -> TokenSet {
        self.resolve_with_provenance(state).await.tokens
    }

    /// `resolve` for a raw state name; unknown names resolve as transitional.
    pub async fn resolve_named(&self, name: &str) -> TokenSet {
        self.resolve(DesignState::parse_lossy(name)).await
    }

    /// `resolve`, plus which tier answered and what was backfilled.
    pub async fn resolve_with_provenance(&self, state: DesignState) -> Resolution {
        let fallback = self.store.get(state);
        let tiers = [
            (TokenSource::Primary, self.primary.as_str()),
            (TokenSource::Secondary, self.secondary.as_str()),
        ];

        for (source, base) in tiers {
            if base.is_empty() {
                continue;
            }

            match self.attempt(base, state).await {
                Ok(payload) => {
                    let (tokens, backfilled) = payload.backfill(fallback);
                    if !backfilled.is_empty() {
                        warn!(%state, tier = %source, ?backfilled, "remote tokens incomplete, backfilled");
                    }
                    info!(%state, source = %source, "tokens resolved");
                    return Resolution {
                        state,
                        tokens,
                        source,
                        backfilled,
                    };
                }
                Err(err) => {
                    warn!(%state, tier = %source, %err, "token fetch failed");
                }
            }
        }

        info!(%state, source = %TokenSource::Embedded, "tokens resolved");
        Resolution {
            state,
            tokens: fallback.clone(),
            source: TokenSource::Embedded,
            backfilled: vec![],
        }
    }

    async fn attempt(&self, base: &str, state: DesignState) -> Result<TokenPayload, FetchError> {
        let url = tokens_url(base, state);
        debug!(%state, endpoint = %url, "fetching tokens");

        let value = tokio::time::timeout(self.timeout, self.transport.get_json(&url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let payload = TokenPayload::from_value(value)?;
        payload.check_schema()?;
        Ok(payload)
    }
}
