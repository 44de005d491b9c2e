//! SpatialTokens Core - Adaptive Design-Token Resolution
//!
//! # Guarantees
//! 1. Resolution Is Total: every state resolves to a complete token set
//! 2. Remote Before Embedded: primary, then secondary, then the built-in store
//! 3. Compilation Is Deterministic: same tokens, byte-identical variables
//! 4. Last Request Wins: stale transitions are never published
//! 5. Hardware Hints Are Advisory: detection never blocks startup

pub mod state;
pub mod tokens;
pub mod hashing;
pub mod store;
pub mod transport;
pub mod config;
pub mod device;
pub mod resolver;
pub mod compiler;
pub mod surface;
pub mod controller;
pub mod edge;
pub mod logging;

pub use state::{DesignState, StateRequest};
pub use tokens::{TokenCategory, TokenPayload, TokenSet, SUPPORTED_SCHEMA_MAJOR};
pub use hashing::{canonical_json, compute_fingerprint, sha256_hex};
pub use store::{StoreError, TokenStore};
pub use transport::{FetchError, HttpTransport, OfflineTransport, Transport};
pub use config::{ConfigError, Settings};
pub use device::{DeviceCapabilityProfile, DeviceDetector, HardwareTier, HostSignals};
pub use resolver::{Resolution, TokenResolver, TokenSource};
pub use compiler::{compile, VariableBlock};
pub use surface::{CssFileSurface, RenderSurface, StyleScope, SurfaceError};
pub use controller::{ResolvedConfiguration, StateController, TransitionOutcome};
pub use edge::{EdgeHandler, EdgeRequest, EdgeResponse};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
