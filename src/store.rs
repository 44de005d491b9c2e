//! Token Store - Authoritative Token Sets
//!
//! One record per design state. The same store backs the edge handler and
//! the resolver's last-resort fallback, so the two cannot drift.

use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::state::DesignState;
use crate::tokens::TokenSet;

const EMBEDDED_TOKENS: &str = include_str!("../tokens/design-tokens.json");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Token data is not valid: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Token data has no entry for state: {0}")]
    MissingState(DesignState),

    #[error("Failed to read token data {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Immutable token store. Lookup is total once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStore {
    sets: [TokenSet; 4],
}

impl TokenStore {
    /// The token data compiled into this binary.
    pub fn embedded() -> Result<Self, StoreError> {
        Self::from_json(EMBEDDED_TOKENS)
    }

    /// Parse a `{ "<state>": TokenSet, ... }` document.
    ///
    /// Every state must be present. Keys that are not state names are ignored.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let mut entries: IndexMap<String, TokenSet> = serde_json::from_str(json)?;

        for key in entries.keys() {
            if !DesignState::ALL.iter().any(|s| s.as_str() == key) {
                tracing::warn!(key = %key, "ignoring token entry for unknown state");
            }
        }

        let mut take = |state: DesignState| {
            entries
                .shift_remove(state.as_str())
                .ok_or(StoreError::MissingState(state))
        };

        Ok(Self {
            sets: [
                take(DesignState::Heritage)?,
                take(DesignState::Transitional)?,
                take(DesignState::Quantum)?,
                take(DesignState::Superposition)?,
            ],
        })
    }

    pub fn load_from_path(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn get(&self, state: DesignState) -> &TokenSet {
        let index = match state {
            DesignState::Heritage => 0,
            DesignState::Transitional => 1,
            DesignState::Quantum => 2,
            DesignState::Superposition => 3,
        };
        &self.sets[index]
    }

    /// Lookup by raw name; unknown names get the transitional set.
    pub fn get_named(&self, name: &str) -> &TokenSet {
        self.get(DesignState::parse_lossy(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (DesignState, &TokenSet)> {
        DesignState::ALL.into_iter().map(move |state| (state, self.get(state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenPayload;

    #[test]
    fn test_embedded_store_loads() {
        let store = TokenStore::embedded().unwrap();
        assert_eq!(store.get(DesignState::Heritage).meta.name, "Heritage");
        assert_eq!(store.get(DesignState::Superposition).meta.version, "1.1.0");
    }

    #[test]
    fn test_unknown_name_returns_transitional() {
        let store = TokenStore::embedded().unwrap();
        assert_eq!(
            store.get_named("nonexistent"),
            store.get(DesignState::Transitional)
        );
    }

    #[test]
    fn test_every_state_is_complete() {
        let store = TokenStore::embedded().unwrap();
        for (state, set) in store.iter() {
            let payload = TokenPayload::from(set.clone());
            assert!(payload.missing_categories().is_empty(), "{state} incomplete");
            assert!(payload.check_schema().is_ok(), "{state} schema");
        }
    }

    #[test]
    fn test_only_rich_states_carry_device_hints() {
        let store = TokenStore::embedded().unwrap();
        assert!(!store.get(DesignState::Heritage).has_device_hints());
        assert!(!store.get(DesignState::Transitional).has_device_hints());
        assert!(store.get(DesignState::Quantum).has_device_hints());
        assert!(store.get(DesignState::Superposition).has_device_hints());
    }

    #[test]
    fn test_missing_state_rejected() {
        let store = TokenStore::embedded().unwrap();
        let mut doc = serde_json::to_value(
            store
                .iter()
                .map(|(s, t)| (s.as_str().to_string(), t.clone()))
                .collect::<IndexMap<_, _>>(),
        )
        .unwrap();
        doc.as_object_mut().unwrap().remove("quantum");

        let err = TokenStore::from_json(&doc.to_string()).unwrap_err();
        assert!(matches!(err, StoreError::MissingState(DesignState::Quantum)));
    }
}
