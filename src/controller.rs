//! State Controller - the single owner of the active configuration
//!
//! Every transition resolves, compiles and then publishes a whole new
//! `ResolvedConfiguration`. Publishing happens only if the transition is still
//! the latest one requested; anything older is discarded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::compiler::{compile, VariableBlock};
use crate::device::{DeviceCapabilityProfile, DeviceDetector};
use crate::resolver::TokenResolver;
use crate::state::{DesignState, StateRequest};
use crate::surface::RenderSurface;
use crate::tokens::TokenSet;

/// State, tokens and compiled variables that are active together.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfiguration {
    pub id: Uuid,
    pub generation: u64,
    pub state: DesignState,
    pub tokens: TokenSet,
    pub variables: VariableBlock,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// A later request was made before this one finished.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
struct LatestRequest {
    generation: u64,
    state: DesignState,
}

pub struct StateController {
    resolver: Arc<TokenResolver>,
    latest: Mutex<LatestRequest>,
    publisher: watch::Sender<Arc<ResolvedConfiguration>>,
}

impl StateController {
    /// Start in `request`. `Auto` runs the detector once and is then forgotten.
    pub async fn start(
        request: StateRequest,
        resolver: Arc<TokenResolver>,
        detector: &DeviceDetector,
    ) -> Self {
        let initial = match request {
            StateRequest::Auto => detector.detect().await.recommended_state,
            StateRequest::Concrete(state) => state,
        };
        Self::with_initial_state(initial, resolver).await
    }

    /// Start in `request`, using an already detected profile for `Auto`.
    pub async fn with_profile(
        request: StateRequest,
        resolver: Arc<TokenResolver>,
        profile: &DeviceCapabilityProfile,
    ) -> Self {
        let initial = match request {
            StateRequest::Auto => profile.recommended_state,
            StateRequest::Concrete(state) => state,
        };
        Self::with_initial_state(initial, resolver).await
    }

    async fn with_initial_state(state: DesignState, resolver: Arc<TokenResolver>) -> Self {
        let config = build_configuration(&resolver, state, 0).await;
        info!(%state, variables = config.variables.len(), "initial design state resolved");

        let (publisher, _) = watch::channel(Arc::new(config));
        Self {
            resolver,
            latest: Mutex::new(LatestRequest {
                generation: 0,
                state,
            }),
            publisher,
        }
    }

    /// The configuration consumers should render with right now.
    pub fn current(&self) -> Arc<ResolvedConfiguration> {
        self.publisher.borrow().clone()
    }

    pub fn state(&self) -> DesignState {
        self.publisher.borrow().state
    }

    /// The most recently requested state, which may still be resolving.
    pub fn requested_state(&self) -> DesignState {
        self.lock_latest().state
    }

    /// Receiver notified after every applied transition.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ResolvedConfiguration>> {
        self.publisher.subscribe()
    }

    /// Transition to `state`. Resolves, compiles and publishes unless a
    /// newer request arrives first.
    pub async fn set_state(&self, state: DesignState) -> TransitionOutcome {
        self.begin_transition(state).run().await
    }

    /// Register `state` as the latest request without resolving it yet.
    ///
    /// Requests are ordered by when this is called, not by when `run` finishes.
    pub fn begin_transition(&self, state: DesignState) -> PendingTransition<'_> {
        let mut latest = self.lock_latest();
        latest.generation += 1;
        latest.state = state;
        debug!(%state, generation = latest.generation, "transition requested");

        PendingTransition {
            controller: self,
            state,
            generation: latest.generation,
        }
    }

    /// Keep `surface` in sync with every published configuration.
    pub fn attach_surface(&self, surface: Arc<dyn RenderSurface>) -> JoinHandle<()> {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            loop {
                let config = receiver.borrow_and_update().clone();
                if let Err(err) = surface.replace(&config.variables) {
                    warn!(%err, state = %config.state, "failed to apply style block");
                }
                if receiver.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    fn lock_latest(&self) -> std::sync::MutexGuard<'_, LatestRequest> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, config: ResolvedConfiguration) -> TransitionOutcome {
        let generation = config.generation;
        let state = config.state;

        let applied = self.publisher.send_if_modified(|current| {
            if self.lock_latest().generation != generation {
                return false;
            }
            *current = Arc::new(config);
            true
        });

        if applied {
            info!(%state, generation, "design state applied");
            TransitionOutcome::Applied
        } else {
            debug!(%state, generation, "stale resolution discarded");
            TransitionOutcome::Superseded
        }
    }
}

/// A registered transition that has not been resolved yet.
#[must_use = "a transition does nothing until it is run"]
pub struct PendingTransition<'a> {
    controller: &'a StateController,
    state: DesignState,
    generation: u64,
}

impl PendingTransition<'_> {
    pub fn state(&self) -> DesignState {
        self.state
    }

    pub async fn run(self) -> TransitionOutcome {
        let config =
            build_configuration(&self.controller.resolver, self.state, self.generation).await;
        self.controller.publish(config)
    }
}

async fn build_configuration(
    resolver: &TokenResolver,
    state: DesignState,
    generation: u64,
) -> ResolvedConfiguration {
    let tokens = resolver.resolve(state).await;
    let variables = compile(&tokens);

    ResolvedConfiguration {
        id: Uuid::new_v4(),
        generation,
        state,
        tokens,
        variables,
        resolved_at: Utc::now(),
    }
}
