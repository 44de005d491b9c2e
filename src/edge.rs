//! Edge Handler - the token service side
//!
//! Routing and response shaping for the token endpoints, independent of any
//! HTTP server. Served data comes from the same `TokenStore` the client
//! falls back to.

use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use url::form_urlencoded;

use crate::compiler::compile;
use crate::device::{is_apple_silicon, CapabilityHint};
use crate::state::DesignState;
use crate::store::TokenStore;
use crate::ENGINE_VERSION;

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type, Authorization"),
];

#[derive(Debug, Clone, Default)]
pub struct EdgeRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub user_agent: Option<String>,
}

impl EdgeRequest {
    /// `GET` for a path with an optional `?key=value&...` query.
    /// Query keys and values are percent-decoded.
    pub fn get(path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path_and_query, ""),
        };

        let query = form_urlencoded::parse(query.as_bytes()).into_owned().collect();

        Self {
            method: "GET".to_string(),
            path: path.to_string(),
            query,
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl EdgeResponse {
    fn new(status: u16, content_type: &'static str, body: String) -> Self {
        let headers = CORS_HEADERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            status,
            content_type,
            headers,
            body,
        }
    }

    fn json(status: u16, body: &impl Serialize) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self::new(status, "application/json", body),
            Err(err) => Self::error(500, &err.to_string()),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        let body = json!({ "error": message }).to_string();
        Self::new(status, "application/json", body)
    }

    fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenFormat {
    Css,
    Liquid,
    Json,
}

impl TokenFormat {
    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("liquid") => Self::Liquid,
            Some("json") => Self::Json,
            _ => Self::Css,
        }
    }
}

pub struct EdgeHandler {
    store: Arc<TokenStore>,
}

impl EdgeHandler {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self { store }
    }

    pub fn handle(&self, request: &EdgeRequest) -> EdgeResponse {
        tracing::debug!(method = %request.method, path = %request.path, "edge request");

        match request.method.as_str() {
            "OPTIONS" => return EdgeResponse::new(204, "text/plain", String::new()),
            "GET" => {}
            _ => return EdgeResponse::error(405, "Method Not Allowed"),
        }

        match request.path.trim_end_matches('/') {
            "" => self.status(),
            "/design-system/tokens" => self.tokens(request),
            "/m4-optimization" | "/design-system/m4-optimization" => self.capabilities(request),
            "/api/design-tokens" => self.formatted_tokens(request),
            _ => EdgeResponse::error(404, "Not Found"),
        }
    }

    fn requested_state(request: &EdgeRequest, key: &str) -> DesignState {
        request
            .param(key)
            .map(DesignState::parse_lossy)
            .unwrap_or_default()
    }

    fn status(&self) -> EdgeResponse {
        let states: Vec<_> = DesignState::ALL.iter().map(DesignState::as_str).collect();
        EdgeResponse::json(
            200,
            &json!({
                "status": "Design token service active",
                "version": ENGINE_VERSION,
                "availableStates": states,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }),
        )
    }

    fn tokens(&self, request: &EdgeRequest) -> EdgeResponse {
        let tokens = self.store.get(Self::requested_state(request, "state"));
        let response = EdgeResponse::json(200, tokens).header("Cache-Control", "max-age=3600");

        match tokens.fingerprint() {
            Ok(etag) => response.header("ETag", format!("\"{etag}\"")),
            Err(_) => response,
        }
    }

    fn capabilities(&self, request: &EdgeRequest) -> EdgeResponse {
        let state = request
            .param("state")
            .map(DesignState::parse_lossy)
            .unwrap_or(DesignState::Quantum);
        let silicon = request.user_agent.as_deref().is_some_and(is_apple_silicon);
        let optimizations = self
            .store
            .get(state)
            .device_optimization
            .as_ref()
            .map(|d| d.optimizations.clone())
            .unwrap_or_default();

        let hint = CapabilityHint {
            is_m4_compatible: silicon,
            is_apple_silicon: silicon,
            use_neural_engine: silicon && optimizations.use_neural_engine,
            use_metal: silicon && optimizations.use_metal,
            rendering_api: Some(if silicon { "metal" } else { "webgl" }.to_string()),
            pixel_ratio: Some("device".to_string()),
            memory_optimization: Some(
                optimizations
                    .memory_optimization
                    .unwrap_or_else(|| "balanced".to_string()),
            ),
        };

        EdgeResponse::json(200, &hint).header("Cache-Control", "max-age=300")
    }

    fn formatted_tokens(&self, request: &EdgeRequest) -> EdgeResponse {
        let tokens = self.store.get(Self::requested_state(request, "type"));

        match TokenFormat::parse(request.param("format")) {
            TokenFormat::Css => EdgeResponse::new(200, "text/css", compile(tokens).to_css(":root")),
            TokenFormat::Liquid => EdgeResponse::new(200, "text/plain", compile(tokens).to_liquid()),
            TokenFormat::Json => EdgeResponse::json(200, tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenSet;

    fn handler() -> EdgeHandler {
        EdgeHandler::new(Arc::new(TokenStore::embedded().unwrap()))
    }

    #[test]
    fn test_query_parsing() {
        let req = EdgeRequest::get("/api/design-tokens?type=quantum&format=liquid&flag");
        assert_eq!(req.path, "/api/design-tokens");
        assert_eq!(req.param("type"), Some("quantum"));
        assert_eq!(req.param("flag"), Some(""));
    }

    #[test]
    fn test_query_values_are_percent_decoded() {
        let req = EdgeRequest::get("/design-system/tokens?state=super%70osition&note=a+b%20c");
        assert_eq!(req.param("state"), Some("superposition"));
        assert_eq!(req.param("note"), Some("a b c"));

        let response = handler().handle(&req);
        let set: TokenSet = serde_json::from_str(&response.body).unwrap();
        assert_eq!(set.meta.name, "Superposition");
    }

    #[test]
    fn test_unknown_state_served_as_transitional() {
        let handler = handler();
        let unknown = handler.handle(&EdgeRequest::get("/design-system/tokens?state=nonexistent"));
        let transitional = handler.handle(&EdgeRequest::get("/design-system/tokens?state=transitional"));

        assert_eq!(unknown.status, 200);
        assert_eq!(unknown.body, transitional.body);
        assert_eq!(unknown.header_value("etag"), transitional.header_value("etag"));

        let set: TokenSet = serde_json::from_str(&unknown.body).unwrap();
        assert_eq!(set.meta.name, "Transitional");
    }

    #[test]
    fn test_capability_hint_from_user_agent() {
        let handler = handler();
        let mac = handler.handle(
            &EdgeRequest::get("/m4-optimization").with_user_agent("Macintosh; Apple Silicon"),
        );
        let hint: CapabilityHint = serde_json::from_str(&mac.body).unwrap();
        assert!(hint.is_m4_compatible);
        assert!(hint.use_metal);
        assert_eq!(hint.rendering_api.as_deref(), Some("metal"));

        let pc = handler.handle(
            &EdgeRequest::get("/design-system/m4-optimization").with_user_agent("Windows NT 10.0"),
        );
        let hint: CapabilityHint = serde_json::from_str(&pc.body).unwrap();
        assert!(!hint.is_m4_compatible);
        assert!(!hint.use_neural_engine);
        assert_eq!(hint.rendering_api.as_deref(), Some("webgl"));
    }

    #[test]
    fn test_formatted_tokens() {
        let handler = handler();
        let css = handler.handle(&EdgeRequest::get("/api/design-tokens?type=heritage"));
        assert_eq!(css.content_type, "text/css");
        assert!(css.body.contains("--color-primary: #131A36;"));

        let liquid = handler.handle(&EdgeRequest::get("/api/design-tokens?type=heritage&format=liquid"));
        assert!(liquid.body.contains("{% assign color_primary = '#131A36' %}"));
    }

    #[test]
    fn test_unknown_route_and_method() {
        let handler = handler();
        assert_eq!(handler.handle(&EdgeRequest::get("/nope")).status, 404);

        let mut options = EdgeRequest::get("/design-system/tokens");
        options.method = "OPTIONS".into();
        let response = handler.handle(&options);
        assert_eq!(response.status, 204);
        assert_eq!(response.header_value("access-control-allow-origin"), Some("*"));

        options.method = "DELETE".into();
        assert_eq!(handler.handle(&options).status, 405);
    }
}
