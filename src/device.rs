//! Device Capability Detector
//!
//! Local signals (platform string, logical cores) decide the tier. The
//! capability endpoint is advisory: it may upgrade Apple-silicon detection
//! and name a rendering API, and is abandoned after a short timeout.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::state::DesignState;
use crate::transport::{capability_url, Transport};

/// Logical cores an Apple-silicon host must exceed for the maximum tier.
pub const MAXIMUM_TIER_CORE_THRESHOLD: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareTier {
    Baseline,
    Enhanced,
    Maximum,
}

impl HardwareTier {
    pub const fn recommended_state(&self) -> DesignState {
        match self {
            Self::Maximum => DesignState::Superposition,
            Self::Enhanced => DesignState::Quantum,
            Self::Baseline => DesignState::Transitional,
        }
    }
}

/// Raw facts about the host, gathered without I/O.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSignals {
    pub platform: String,
    pub logical_cores: usize,
    #[serde(default)]
    pub rendering_api: Option<String>,
}

impl HostSignals {
    pub fn new(platform: impl Into<String>, logical_cores: usize) -> Self {
        Self {
            platform: platform.into(),
            logical_cores,
            rendering_api: None,
        }
    }

    /// Signals of the process this code runs in.
    pub fn from_environment() -> Self {
        let logical_cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let rendering_api = match std::env::consts::OS {
            "macos" | "ios" => Some("metal".to_string()),
            _ => None,
        };

        Self {
            platform: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            logical_cores,
            rendering_api,
        }
    }
}

/// Heuristic: a Mac/iOS platform string that does not mention Intel or x86.
pub fn is_apple_silicon(platform: &str) -> bool {
    let platform = platform.to_ascii_lowercase();
    if platform.contains("apple silicon") {
        return true;
    }
    let apple = ["mac", "darwin", "ios"].iter().any(|p| platform.contains(p));
    let intel = ["intel", "x86"].iter().any(|p| platform.contains(p));
    apple && !intel
}

pub fn classify(apple_silicon: bool, logical_cores: usize) -> HardwareTier {
    match (apple_silicon, logical_cores > MAXIMUM_TIER_CORE_THRESHOLD) {
        (true, true) => HardwareTier::Maximum,
        (true, false) => HardwareTier::Enhanced,
        (false, _) => HardwareTier::Baseline,
    }
}

/// Payload of the capability endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityHint {
    #[serde(default, rename = "isM4Compatible")]
    pub is_m4_compatible: bool,
    #[serde(default)]
    pub is_apple_silicon: bool,
    #[serde(default)]
    pub use_neural_engine: bool,
    #[serde(default)]
    pub use_metal: bool,
    #[serde(default, rename = "renderingAPI", skip_serializing_if = "Option::is_none")]
    pub rendering_api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_optimization: Option<String>,
}

/// Detected once per session. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilityProfile {
    pub platform: String,
    pub tier: HardwareTier,
    pub logical_cores: usize,
    pub recommended_state: DesignState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering_api: Option<String>,
    #[serde(default)]
    pub hint_applied: bool,
}

impl DeviceCapabilityProfile {
    pub fn from_signals(signals: &HostSignals, hint: Option<&CapabilityHint>) -> Self {
        let hinted_silicon = hint.is_some_and(|h| h.is_m4_compatible || h.is_apple_silicon);
        let apple_silicon = is_apple_silicon(&signals.platform) || hinted_silicon;
        let tier = classify(apple_silicon, signals.logical_cores);

        let rendering_api = hint
            .and_then(|h| h.rendering_api.clone())
            .or_else(|| signals.rendering_api.clone());

        Self {
            platform: signals.platform.clone(),
            tier,
            logical_cores: signals.logical_cores,
            recommended_state: tier.recommended_state(),
            rendering_api,
            hint_applied: hint.is_some(),
        }
    }
}

struct CapabilityProbe {
    transport: Arc<dyn Transport>,
    url: String,
    timeout: Duration,
}

pub struct DeviceDetector {
    signals: HostSignals,
    probe: Option<CapabilityProbe>,
}

impl DeviceDetector {
    /// Detector that uses local signals only.
    pub fn local(signals: HostSignals) -> Self {
        Self {
            signals,
            probe: None,
        }
    }

    /// Add one bounded round-trip to the capability endpoint at `base_url`.
    pub fn with_probe(
        mut self,
        transport: Arc<dyn Transport>,
        base_url: &str,
        timeout: Duration,
    ) -> Self {
        self.probe = Some(CapabilityProbe {
            transport,
            url: capability_url(base_url),
            timeout,
        });
        self
    }

    pub fn detect_local(&self) -> DeviceCapabilityProfile {
        DeviceCapabilityProfile::from_signals(&self.signals, None)
    }

    pub async fn detect(&self) -> DeviceCapabilityProfile {
        let hint = match &self.probe {
            Some(probe) => fetch_hint(probe).await,
            None => None,
        };
        let profile = DeviceCapabilityProfile::from_signals(&self.signals, hint.as_ref());
        debug!(
            platform = %profile.platform,
            tier = ?profile.tier,
            cores = profile.logical_cores,
            recommended = %profile.recommended_state,
            "device capabilities detected"
        );
        profile
    }
}

async fn fetch_hint(probe: &CapabilityProbe) -> Option<CapabilityHint> {
    let value = match tokio::time::timeout(probe.timeout, probe.transport.get_json(&probe.url)).await
    {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            warn!(%err, url = %probe.url, "capability hint unavailable");
            return None;
        }
        Err(_) => {
            warn!(timeout = ?probe.timeout, url = %probe.url, "capability hint timed out");
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(hint) => Some(hint),
        Err(err) => {
            warn!(%err, "capability hint malformed");
            None
        }
    }
}
