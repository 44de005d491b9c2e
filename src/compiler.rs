//! Variable Compiler - TokenSet to flat style variables
//!
//! Output order follows the insertion order of the token set, so compiling
//! the same set twice gives byte-identical blocks.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::hashing::sha256_hex;
use crate::tokens::{ColorValue, DeviceOptimization, TextStyle, TokenSet, Typography};

const SEPARATOR: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

/// Flat, ordered list of variables. Replaced wholesale, never patched.
///
/// Names are unique: when two keys flatten to the same name
/// (`background.light` and `backgroundLight`) the earlier one is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableBlock {
    variables: Vec<Variable>,
}

impl VariableBlock {
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }

    /// CSS custom properties under `selector`
    pub fn to_css(&self, selector: &str) -> String {
        let mut css = format!("{selector} {{\n");
        for var in &self.variables {
            let _ = writeln!(css, "  --{}: {};", var.name, var.value);
        }
        css.push_str("}\n");
        css
    }

    /// Shopify Liquid `assign` statements
    pub fn to_liquid(&self) -> String {
        let mut liquid = String::new();
        for var in &self.variables {
            let name = var.name.replace(SEPARATOR, "_");
            let quoted = if var.value.contains('\'') {
                format!("\"{}\"", var.value)
            } else {
                format!("'{}'", var.value)
            };
            let _ = writeln!(liquid, "{{% assign {name} = {quoted} %}}");
        }
        liquid
    }

    /// SHA-256 over the ordered name/value lines
    pub fn fingerprint(&self) -> String {
        let mut lines = String::new();
        for var in &self.variables {
            let _ = writeln!(lines, "{}\t{}", var.name, var.value);
        }
        sha256_hex(lines.as_bytes())
    }

    /// The first variable emitted under a name wins; later ones are dropped.
    fn push(&mut self, name: String, value: impl Into<String>) {
        if self.get(&name).is_some() {
            tracing::warn!(variable = %name, "duplicate style variable after flattening, keeping first");
            return;
        }
        self.variables.push(Variable {
            name,
            value: value.into(),
        });
    }
}

/// Walk every category of `tokens` in order and emit one variable per leaf.
pub fn compile(tokens: &TokenSet) -> VariableBlock {
    let mut block = VariableBlock::default();

    for (key, value) in &tokens.colors {
        match value {
            ColorValue::Solid(color) => block.push(name(&["color", key.as_str()]), color.as_str()),
            ColorValue::Variants(variants) => {
                for (variant, color) in variants {
                    block.push(name(&["color", key.as_str(), variant.as_str()]), color.as_str());
                }
            }
        }
    }

    for (key, size) in &tokens.spacing.scale {
        block.push(name(&["spacing", key.as_str()]), size.as_str());
    }

    compile_typography(&mut block, &tokens.typography);

    for (key, radius) in &tokens.border_radius {
        block.push(name(&["radius", key.as_str()]), radius.as_str());
    }

    for (key, shadow) in &tokens.shadows {
        block.push(name(&["shadow", key.as_str()]), shadow.as_str());
    }

    if let Some(motion) = &tokens.motion {
        for (key, duration) in &motion.duration {
            block.push(name(&["duration", key.as_str()]), duration.as_str());
        }
        for (key, easing) in &motion.easing {
            block.push(name(&["easing", key.as_str()]), easing.as_str());
        }
    }

    if let Some(hints) = &tokens.device_optimization {
        compile_device_hints(&mut block, hints);
    }

    block
}

fn compile_typography(block: &mut VariableBlock, typography: &Typography) {
    block.push("font-family".to_string(), typography.font_family.as_str());
    if let Some(base) = &typography.base_size {
        block.push("font-size-base".to_string(), base.as_str());
    }

    for (key, style) in &typography.headings {
        text_style(block, &[key.as_str()], style);
    }
    for (key, style) in &typography.body {
        text_style(block, &["body", key.as_str()], style);
    }
}

fn text_style(block: &mut VariableBlock, path: &[&str], style: &TextStyle) {
    let suffix = name(path);

    block.push(format!("font-size-{suffix}"), style.font_size.as_str());
    block.push(format!("font-weight-{suffix}"), style.font_weight.to_string());
    block.push(format!("font-line-height-{suffix}"), style.line_height.to_string());
    if let Some(spacing) = &style.letter_spacing {
        block.push(format!("font-letter-spacing-{suffix}"), spacing.as_str());
    }
}

fn compile_device_hints(block: &mut VariableBlock, hints: &DeviceOptimization) {
    let opt = &hints.optimizations;
    block.push("device-neural-engine".to_string(), opt.use_neural_engine.to_string());
    block.push("device-metal".to_string(), opt.use_metal.to_string());
    block.push("device-pro-motion".to_string(), opt.use_pro_motion.to_string());
    if let Some(memory) = &opt.memory_optimization {
        block.push("device-memory-optimization".to_string(), memory.as_str());
    }
    if let Some(quality) = &opt.render_quality {
        block.push("device-render-quality".to_string(), quality.as_str());
    }

    let rendering = &hints.rendering;
    if let Some(api) = &rendering.preferred_api {
        block.push("device-rendering-preferred-api".to_string(), api.as_str());
    }
    if let Some(api) = &rendering.fallback_api {
        block.push("device-rendering-fallback-api".to_string(), api.as_str());
    }
    if let Some(aa) = rendering.antialiasing {
        block.push("device-rendering-antialiasing".to_string(), aa.to_string());
    }
    if let Some(ratio) = &rendering.pixel_ratio {
        block.push("device-rendering-pixel-ratio".to_string(), ratio.as_str());
    }
}

fn name(parts: &[&str]) -> String {
    let mut out = String::new();
    for part in parts {
        if !out.is_empty() {
            out.push(SEPARATOR);
        }
        out.push_str(&segment(part));
    }
    out
}

/// `hueRotate` -> `hue-rotate`, anything outside `[a-z0-9-_]` -> `-`
fn segment(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 2);
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push(SEPARATOR);
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else if ch.is_ascii_alphanumeric() || ch == '_' || ch == SEPARATOR {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        } else {
            out.push(SEPARATOR);
            prev_lower = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DesignState;
    use crate::store::TokenStore;

    #[test]
    fn test_segment_kebab_case() {
        assert_eq!(segment("hueRotate"), "hue-rotate");
        assert_eq!(segment("2xl"), "2xl");
        assert_eq!(segment("light dark"), "light-dark");
    }

    #[test]
    fn test_nested_colors_flatten() {
        let store = TokenStore::embedded().unwrap();
        let block = compile(store.get(DesignState::Quantum));

        assert_eq!(block.get("color-primary"), Some("#131A36"));
        assert_eq!(block.get("color-background-light"), Some("#FFFFFF"));
        assert_eq!(block.get("color-background-dark"), Some("#121212"));
        assert_eq!(block.get("color-background"), None);
    }

    #[test]
    fn test_typography_namespaces() {
        let store = TokenStore::embedded().unwrap();
        let block = compile(store.get(DesignState::Superposition));

        assert_eq!(
            block.get("font-family"),
            Some("SF Pro Display, SF Pro, system-ui, sans-serif")
        );
        assert_eq!(block.get("font-size-h1"), Some("4.5rem"));
        assert_eq!(block.get("font-weight-h1"), Some("800"));
        assert_eq!(block.get("font-line-height-h1"), Some("1.05"));
        assert_eq!(block.get("font-letter-spacing-h1"), Some("-0.02em"));
        assert_eq!(block.get("font-size-body-caption"), Some("0.75rem"));
    }

    #[test]
    fn test_order_follows_source() {
        let store = TokenStore::embedded().unwrap();
        let block = compile(store.get(DesignState::Heritage));
        let names: Vec<_> = block.iter().map(|v| v.name.as_str()).collect();

        assert_eq!(names[0], "color-primary");
        let spacing: Vec<_> = names.iter().filter(|n| n.starts_with("spacing-")).collect();
        assert_eq!(
            spacing,
            ["spacing-xs", "spacing-sm", "spacing-md", "spacing-lg", "spacing-xl", "spacing-xxl", "spacing-xxxl"]
                .iter()
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_absent_optional_categories_skipped() {
        let store = TokenStore::embedded().unwrap();
        let block = compile(store.get(DesignState::Heritage));
        assert!(block.iter().all(|v| !v.name.starts_with("duration-")));
        assert!(block.iter().all(|v| !v.name.starts_with("device-")));

        let block = compile(store.get(DesignState::Quantum));
        assert_eq!(block.get("device-rendering-preferred-api"), Some("metal"));
        assert_eq!(block.get("easing-quantum"), Some("cubic-bezier(0.15, 1.15, 0.6, 1.0)"));
    }

    #[test]
    fn test_css_and_liquid_renderings() {
        let mut block = VariableBlock::default();
        block.push("color-primary".into(), "#131A36");
        block.push("font-family".into(), "Bob's Font");

        assert_eq!(
            block.to_css(":root"),
            ":root {\n  --color-primary: #131A36;\n  --font-family: Bob's Font;\n}\n"
        );
        assert_eq!(
            block.to_liquid(),
            "{% assign color_primary = '#131A36' %}\n{% assign font_family = \"Bob's Font\" %}\n"
        );
    }

    #[test]
    fn test_flattening_collision_keeps_first() {
        let store = TokenStore::embedded().unwrap();
        let mut tokens = store.get(DesignState::Quantum).clone();
        tokens
            .colors
            .insert("backgroundLight".into(), ColorValue::Solid("#000000".into()));

        let block = compile(&tokens);
        let hits = block.iter().filter(|v| v.name == "color-background-light").count();
        assert_eq!(hits, 1);
        assert_eq!(block.get("color-background-light"), Some("#FFFFFF"));
        assert!(block.to_css(":root").contains("--color-background-light: #FFFFFF;"));
    }
}
