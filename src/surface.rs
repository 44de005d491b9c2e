//! Render Surfaces - where compiled variable blocks land
//!
//! A surface always receives a whole block. The previous block is removed
//! before the new one is inserted; nothing is patched in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::compiler::VariableBlock;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Failed to write style block to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

pub trait RenderSurface: Send + Sync {
    fn replace(&self, block: &VariableBlock) -> Result<(), SurfaceError>;
}

/// In-memory global style scope
pub struct StyleScope {
    selector: String,
    current: Mutex<Option<VariableBlock>>,
}

impl StyleScope {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            current: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Option<VariableBlock> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn css(&self) -> Option<String> {
        self.current().map(|block| block.to_css(&self.selector))
    }
}

impl RenderSurface for StyleScope {
    fn replace(&self, block: &VariableBlock) -> Result<(), SurfaceError> {
        let mut slot = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let _previous = slot.take();
        *slot = Some(block.clone());
        Ok(())
    }
}

/// A CSS file kept in sync with the active block.
///
/// Writes go to a sibling temp file which is renamed over the target, so a
/// reader sees either the old block or the new one.
pub struct CssFileSurface {
    path: PathBuf,
    selector: String,
    last_fingerprint: Mutex<Option<String>>,
}

impl CssFileSurface {
    pub fn new(path: impl Into<PathBuf>, selector: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            selector: selector.into(),
            last_fingerprint: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(&self, contents: &str) -> Result<(), SurfaceError> {
        let tmp = self.path.with_extension("css.tmp");
        let err = |source| SurfaceError::Write {
            path: self.path.clone(),
            source,
        };
        fs::write(&tmp, contents).map_err(err)?;
        fs::rename(&tmp, &self.path).map_err(err)
    }
}

impl RenderSurface for CssFileSurface {
    fn replace(&self, block: &VariableBlock) -> Result<(), SurfaceError> {
        let fingerprint = block.fingerprint();
        let mut last = self
            .last_fingerprint
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if last.as_deref() == Some(fingerprint.as_str()) && self.path.exists() {
            tracing::trace!(path = ?self.path, "style block unchanged, skipping write");
            return Ok(());
        }

        self.write_atomic(&block.to_css(&self.selector))?;
        tracing::debug!(path = ?self.path, variables = block.len(), "style block written");
        *last = Some(fingerprint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::state::DesignState;
    use crate::store::TokenStore;

    #[test]
    fn test_style_scope_replaces_whole_block() {
        let store = TokenStore::embedded().unwrap();
        let scope = StyleScope::new(":root");
        assert!(scope.css().is_none());

        scope.replace(&compile(store.get(DesignState::Quantum))).unwrap();
        assert!(scope.css().unwrap().contains("--device-metal: true;"));

        scope.replace(&compile(store.get(DesignState::Heritage))).unwrap();
        let css = scope.css().unwrap();
        assert!(!css.contains("--device-metal"));
        assert!(css.starts_with(":root {\n"));
    }

    #[test]
    fn test_css_file_surface_writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.css");
        let surface = CssFileSurface::new(&path, ":root");
        let store = TokenStore::embedded().unwrap();

        let block = compile(store.get(DesignState::Transitional));
        surface.replace(&block).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), block.to_css(":root"));

        let block = compile(store.get(DesignState::Superposition));
        surface.replace(&block).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), block.to_css(":root"));
        assert!(!path.with_extension("css.tmp").exists());
    }
}
