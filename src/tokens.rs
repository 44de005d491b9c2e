//! Token Sets - Typed Style Configuration
//!
//! `TokenPayload` is what arrives over the wire: every category optional.
//! `TokenSet` is what the rest of the crate sees: required categories present.
//! The only way from one to the other is `TokenPayload::backfill`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::hashing::compute_fingerprint;

/// Highest token schema major version this engine understands.
pub const SUPPORTED_SCHEMA_MAJOR: u64 = 1;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid schema version: {0}")]
    InvalidVersion(String),

    #[error("Schema version {found} is newer than supported major {supported}")]
    UnsupportedVersion { found: String, supported: u64 },

    #[error("Payload carries none of the required token categories")]
    NoCategories,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    #[serde(rename = "_meta", alias = "meta")]
    pub meta: TokenMeta,
    pub colors: IndexMap<String, ColorValue>,
    pub spacing: Spacing,
    pub typography: Typography,
    pub border_radius: IndexMap<String, String>,
    pub shadows: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<Motion>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "m4")]
    pub device_optimization: Option<DeviceOptimization>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
}

/// A color is either a single value or one level of named variants
/// (`background.light`, `background.dark`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    Solid(String),
    Variants(IndexMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<u32>,
    pub scale: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub font_family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default)]
    pub headings: IndexMap<String, TextStyle>,
    #[serde(default)]
    pub body: IndexMap<String, TextStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_size: String,
    pub font_weight: u16,
    pub line_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Motion {
    #[serde(default)]
    pub duration: IndexMap<String, String>,
    #[serde(default)]
    pub easing: IndexMap<String, String>,
}

/// Rendering hints carried only by the richer states.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceOptimization {
    #[serde(default)]
    pub optimizations: OptimizationHints,
    #[serde(default)]
    pub rendering: RenderingHints,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationHints {
    #[serde(default)]
    pub use_neural_engine: bool,
    #[serde(default)]
    pub use_metal: bool,
    #[serde(default)]
    pub use_pro_motion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_optimization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_quality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderingHints {
    #[serde(default, rename = "preferredAPI", skip_serializing_if = "Option::is_none")]
    pub preferred_api: Option<String>,
    #[serde(default, rename = "fallbackAPI", skip_serializing_if = "Option::is_none")]
    pub fallback_api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antialiasing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_ratio: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenCategory {
    Meta,
    Colors,
    Spacing,
    Typography,
    BorderRadius,
    Shadows,
    Motion,
    DeviceOptimization,
}

impl TokenCategory {
    /// Categories a `TokenSet` can never be without.
    pub const REQUIRED: [TokenCategory; 6] = [
        TokenCategory::Meta,
        TokenCategory::Colors,
        TokenCategory::Spacing,
        TokenCategory::Typography,
        TokenCategory::BorderRadius,
        TokenCategory::Shadows,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Colors => "colors",
            Self::Spacing => "spacing",
            Self::Typography => "typography",
            Self::BorderRadius => "borderRadius",
            Self::Shadows => "shadows",
            Self::Motion => "motion",
            Self::DeviceOptimization => "deviceOptimization",
        }
    }
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TokenSet {
    /// SHA-256 over the canonical JSON form.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        compute_fingerprint(self)
    }

    pub fn has_device_hints(&self) -> bool {
        self.device_optimization.is_some()
    }
}

/// Wire form of a token set. Nothing is trusted until `backfill`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    #[serde(default, rename = "_meta", alias = "meta")]
    pub meta: Option<TokenMeta>,
    #[serde(default)]
    pub colors: Option<IndexMap<String, ColorValue>>,
    #[serde(default)]
    pub spacing: Option<Spacing>,
    #[serde(default)]
    pub typography: Option<Typography>,
    #[serde(default)]
    pub border_radius: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub shadows: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub motion: Option<Motion>,
    #[serde(default, alias = "m4")]
    pub device_optimization: Option<DeviceOptimization>,
}

impl TokenPayload {
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Required categories absent from this payload.
    ///
    /// An empty color/radius/shadow map or an empty spacing scale counts as absent.
    pub fn missing_categories(&self) -> Vec<TokenCategory> {
        let present = |category: &TokenCategory| match category {
            TokenCategory::Meta => self.meta.is_some(),
            TokenCategory::Colors => self.colors.as_ref().is_some_and(|c| !c.is_empty()),
            TokenCategory::Spacing => self.spacing.as_ref().is_some_and(|s| !s.scale.is_empty()),
            TokenCategory::Typography => self.typography.is_some(),
            TokenCategory::BorderRadius => {
                self.border_radius.as_ref().is_some_and(|r| !r.is_empty())
            }
            TokenCategory::Shadows => self.shadows.as_ref().is_some_and(|s| !s.is_empty()),
            TokenCategory::Motion | TokenCategory::DeviceOptimization => true,
        };

        TokenCategory::REQUIRED
            .iter()
            .filter(|c| !present(c))
            .copied()
            .collect()
    }

    /// Reject payloads written for a schema this engine does not understand.
    ///
    /// A payload without `meta` passes; the meta block is backfilled later.
    /// A payload with no required category at all is not a token set.
    pub fn check_schema(&self) -> Result<(), SchemaError> {
        if self.missing_categories().len() == TokenCategory::REQUIRED.len() {
            return Err(SchemaError::NoCategories);
        }

        let Some(meta) = &self.meta else {
            return Ok(());
        };

        let version = semver::Version::parse(&meta.version)
            .map_err(|_| SchemaError::InvalidVersion(meta.version.clone()))?;

        if version.major > SUPPORTED_SCHEMA_MAJOR {
            return Err(SchemaError::UnsupportedVersion {
                found: meta.version.clone(),
                supported: SUPPORTED_SCHEMA_MAJOR,
            });
        }

        Ok(())
    }

    /// Complete this payload from `fallback`, one whole category at a time.
    ///
    /// Returns the completed set and the categories that were spliced in.
    /// Optional categories are taken from the payload only.
    pub fn backfill(self, fallback: &TokenSet) -> (TokenSet, Vec<TokenCategory>) {
        let missing = self.missing_categories();
        let take = |category: TokenCategory| !missing.contains(&category);

        let set = TokenSet {
            meta: match self.meta {
                Some(meta) if take(TokenCategory::Meta) => meta,
                _ => fallback.meta.clone(),
            },
            colors: match self.colors {
                Some(colors) if take(TokenCategory::Colors) => colors,
                _ => fallback.colors.clone(),
            },
            spacing: match self.spacing {
                Some(spacing) if take(TokenCategory::Spacing) => spacing,
                _ => fallback.spacing.clone(),
            },
            typography: match self.typography {
                Some(typography) if take(TokenCategory::Typography) => typography,
                _ => fallback.typography.clone(),
            },
            border_radius: match self.border_radius {
                Some(radii) if take(TokenCategory::BorderRadius) => radii,
                _ => fallback.border_radius.clone(),
            },
            shadows: match self.shadows {
                Some(shadows) if take(TokenCategory::Shadows) => shadows,
                _ => fallback.shadows.clone(),
            },
            motion: self.motion,
            device_optimization: self.device_optimization,
        };

        (set, missing)
    }
}

impl From<TokenSet> for TokenPayload {
    fn from(set: TokenSet) -> Self {
        Self {
            meta: Some(set.meta),
            colors: Some(set.colors),
            spacing: Some(set.spacing),
            typography: Some(set.typography),
            border_radius: Some(set.border_radius),
            shadows: Some(set.shadows),
            motion: set.motion,
            device_optimization: set.device_optimization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fallback() -> TokenSet {
        serde_json::from_value(json!({
            "_meta": { "name": "Fallback", "description": "", "version": "1.0.0" },
            "colors": { "primary": "#000000" },
            "spacing": { "scale": { "sm": "8px" } },
            "typography": { "fontFamily": "SF Pro" },
            "borderRadius": { "small": "4px" },
            "shadows": { "small": "none" }
        }))
        .unwrap()
    }

    #[test]
    fn test_nested_colors_parse() {
        let payload = TokenPayload::from_value(json!({
            "colors": {
                "primary": "#131A36",
                "background": { "light": "#FFFFFF", "dark": "#121212" }
            }
        }))
        .unwrap();

        let colors = payload.colors.unwrap();
        assert_eq!(colors["primary"], ColorValue::Solid("#131A36".into()));
        match &colors["background"] {
            ColorValue::Variants(v) => assert_eq!(v["dark"], "#121212"),
            other => panic!("expected variants, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_categories_listed_in_order() {
        let payload = TokenPayload::from_value(json!({
            "colors": { "primary": "#fff" },
            "shadows": {}
        }))
        .unwrap();

        assert_eq!(
            payload.missing_categories(),
            vec![
                TokenCategory::Meta,
                TokenCategory::Spacing,
                TokenCategory::Typography,
                TokenCategory::BorderRadius,
                TokenCategory::Shadows,
            ]
        );
    }

    #[test]
    fn test_backfill_keeps_remote_categories() {
        let payload = TokenPayload::from_value(json!({
            "colors": { "primary": "#FF0000" },
            "motion": { "duration": { "fast": "100ms" } }
        }))
        .unwrap();

        let (set, filled) = payload.backfill(&fallback());
        assert_eq!(set.colors["primary"], ColorValue::Solid("#FF0000".into()));
        assert_eq!(set.typography.font_family, "SF Pro");
        assert_eq!(set.motion.unwrap().duration["fast"], "100ms");
        assert!(filled.contains(&TokenCategory::Typography));
        assert!(!filled.contains(&TokenCategory::Colors));
    }

    #[test]
    fn test_device_hints_alias() {
        let payload = TokenPayload::from_value(json!({
            "m4": { "rendering": { "preferredAPI": "metal" } }
        }))
        .unwrap();
        let hints = payload.device_optimization.unwrap();
        assert_eq!(hints.rendering.preferred_api.as_deref(), Some("metal"));
        assert!(!hints.optimizations.use_metal);
    }

    #[test]
    fn test_schema_gate() {
        let mut payload = TokenPayload::default();
        assert!(matches!(payload.check_schema(), Err(SchemaError::NoCategories)));

        payload.meta = Some(TokenMeta {
            name: "Next".into(),
            description: String::new(),
            version: "2.0.0".into(),
        });
        assert!(matches!(
            payload.check_schema(),
            Err(SchemaError::UnsupportedVersion { .. })
        ));

        payload.meta.as_mut().unwrap().version = "latest".into();
        assert!(matches!(payload.check_schema(), Err(SchemaError::InvalidVersion(_))));

        payload.meta.as_mut().unwrap().version = "1.1.0".into();
        assert!(payload.check_schema().is_ok());
    }

    #[test]
    fn test_error_body_is_not_a_token_set() {
        let payload = TokenPayload::from_value(json!({ "error": "maintenance" })).unwrap();
        assert!(matches!(payload.check_schema(), Err(SchemaError::NoCategories)));

        let payload = TokenPayload::from_value(json!({ "shadows": { "small": "none" } })).unwrap();
        assert!(payload.check_schema().is_ok());
    }
}
