//! Design States - Closed Enumeration
//!
//! Unknown names never fail. They resolve to `Transitional`.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DesignState {
    /// Flat orthogonal styling
    Heritage,
    /// Emerging dimension (default)
    Transitional,
    /// Fully dimensional
    Quantum,
    /// Richest state, tuned for high-end hardware
    Superposition,
}

impl DesignState {
    pub const ALL: [DesignState; 4] = [
        DesignState::Heritage,
        DesignState::Transitional,
        DesignState::Quantum,
        DesignState::Superposition,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Heritage => "heritage",
            Self::Transitional => "transitional",
            Self::Quantum => "quantum",
            Self::Superposition => "superposition",
        }
    }

    /// Parse a state name, defaulting to `Transitional` for anything unrecognized.
    pub fn parse_lossy(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "heritage" => Self::Heritage,
            "transitional" => Self::Transitional,
            "quantum" => Self::Quantum,
            "superposition" => Self::Superposition,
            other => {
                tracing::debug!(requested = other, "unknown design state, using transitional");
                Self::Transitional
            }
        }
    }
}

impl Default for DesignState {
    fn default() -> Self {
        Self::Transitional
    }
}

impl fmt::Display for DesignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DesignState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lossy(s))
    }
}

impl<'de> Deserialize<'de> for DesignState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse_lossy(&name))
    }
}

/// What a caller asks the controller to start in.
///
/// `Auto` is only meaningful at construction and is replaced by the
/// detector's recommendation before any configuration is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateRequest {
    #[default]
    Auto,
    Concrete(DesignState),
}

impl StateRequest {
    pub fn parse(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Concrete(DesignState::parse_lossy(name))
        }
    }
}

impl From<DesignState> for StateRequest {
    fn from(state: DesignState) -> Self {
        Self::Concrete(state)
    }
}

impl fmt::Display for StateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Concrete(state) => state.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names_parse() {
        for state in DesignState::ALL {
            assert_eq!(DesignState::parse_lossy(state.as_str()), state);
        }
        assert_eq!(DesignState::parse_lossy(" Quantum "), DesignState::Quantum);
    }

    #[test]
    fn test_unknown_name_is_transitional() {
        assert_eq!(DesignState::parse_lossy("nonexistent"), DesignState::Transitional);
        assert_eq!(DesignState::parse_lossy(""), DesignState::Transitional);
        let parsed: DesignState = serde_json::from_str(r#""vaporwave""#).unwrap();
        assert_eq!(parsed, DesignState::Transitional);
    }

    #[test]
    fn test_state_request_parse() {
        assert_eq!(StateRequest::parse("AUTO"), StateRequest::Auto);
        assert_eq!(
            StateRequest::parse("heritage"),
            StateRequest::Concrete(DesignState::Heritage)
        );
        assert_eq!(
            StateRequest::parse("bogus"),
            StateRequest::Concrete(DesignState::Transitional)
        );
    }
}
