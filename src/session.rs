//! Session lifecycle: configuration, credential checks, start and abort.

use crate::applier::MoveApplier;
use crate::events::{EventKind, EventSink};
use crate::failure::{Failure, FailureKind};
use crate::gateway::{ProviderGateway, SeatProviders};
use crate::orchestrator::TurnOrchestrator;
use crate::providers::{Credential, GenerationParams, ProviderConfig, ProviderKind};
use crate::rules::RulesEngine;
use crate::state::{SessionState, SessionStatus, SharedState};
use crate::transport::Transport;
use crate::types::Side;
use derive_more::{Display, Error};
use derive_setters::Setters;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Timing and policy knobs for sessions.
#[derive(Debug, Clone, Copy, PartialEq, Setters)]
#[setters(prefix = "with_")]
pub struct SessionSettings {
    /// Delay before the first turn.
    pub startup_delay: Duration,
    /// Delay between turns.
    pub turn_delay: Duration,
    /// How long the random mover pretends to think.
    pub random_think_time: Duration,
    /// Upper bound on one remote request.
    pub request_timeout: Duration,
    /// Length cap and temperature for move requests.
    pub generation: GenerationParams,
    /// Refuse to start remote providers whose credential was not probed.
    pub require_verified_credentials: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_millis(500),
            turn_delay: Duration::from_millis(500),
            random_think_time: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            generation: GenerationParams::default(),
            require_verified_credentials: true,
        }
    }
}

impl SessionSettings {
    /// No delays and no verification requirement.
    pub fn immediate() -> Self {
        Self {
            startup_delay: Duration::ZERO,
            turn_delay: Duration::ZERO,
            random_think_time: Duration::ZERO,
            require_verified_credentials: false,
            ..Self::default()
        }
    }
}

/// Why [`SessionController::start`] refused to start.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ConfigurationError {
    /// A side's provider configuration is unusable.
    #[display("{side} provider rejected: {failure}")]
    Rejected {
        /// Side with the bad configuration.
        side: Side,
        /// `NoCredential` or `ProviderUnconfigured`.
        #[error(source)]
        failure: Failure,
    },
    /// A remote credential has not passed the probe.
    #[display("{side} credential for {model} has not been verified")]
    UnverifiedCredential {
        /// Side with the untested credential.
        side: Side,
        /// Model the credential is for.
        model: String,
    },
    /// A session is already running; abort it first.
    #[display("a session is already running")]
    AlreadyRunning,
}

impl ConfigurationError {
    /// Failure kind behind a rejection, if there is one.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ConfigurationError::Rejected { failure, .. } => Some(*failure.kind()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VerifiedKey {
    endpoint: String,
    model: String,
    credential: Credential,
}

impl VerifiedKey {
    fn of(config: &ProviderConfig) -> Option<Self> {
        match config.kind() {
            ProviderKind::Random => None,
            ProviderKind::RemoteTextModel(descriptor) => Some(Self {
                endpoint: descriptor.endpoint().clone(),
                model: config.model().clone(),
                credential: config.credential().clone(),
            }),
        }
    }
}

/// Cloneable handle for observing and aborting a session from elsewhere.
#[derive(Clone)]
pub struct SessionHandle {
    state: SharedState,
    events: Arc<dyn EventSink>,
}

impl SessionHandle {
    /// Forces the running session to halt. Returns false if none was running.
    ///
    /// An outstanding provider call is not cancelled; its result is
    /// discarded when it arrives.
    #[instrument(skip(self))]
    pub fn abort(&self) -> bool {
        let halted = self.state.abort();
        if halted {
            self.events.record(EventKind::Aborted);
        }
        halted
    }

    /// Current session snapshot.
    pub fn state(&self) -> SessionState {
        self.state.snapshot()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Owns the game lifecycle and is the only externally triggered entry
/// point (start, abort).
pub struct SessionController<R> {
    rules: Arc<Mutex<R>>,
    state: SharedState,
    gateway: Arc<ProviderGateway>,
    events: Arc<dyn EventSink>,
    settings: SessionSettings,
    verified: HashSet<VerifiedKey>,
}

impl<R> std::fmt::Debug for SessionController<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("gateway", &self.gateway)
            .field("settings", &self.settings)
            .field("verified", &self.verified.len())
            .finish_non_exhaustive()
    }
}

impl<R: RulesEngine> SessionController<R> {
    /// Creates an idle controller.
    #[instrument(skip(rules, transport, events))]
    pub fn new(
        rules: R,
        transport: Arc<dyn Transport>,
        events: Arc<dyn EventSink>,
        settings: SessionSettings,
    ) -> Self {
        let gateway = ProviderGateway::new(
            transport,
            settings.random_think_time,
            settings.request_timeout,
            settings.generation,
        );
        Self {
            rules: Arc::new(Mutex::new(rules)),
            state: SharedState::new(),
            gateway: Arc::new(gateway),
            events,
            settings,
            verified: HashSet::new(),
        }
    }

    /// Settings this controller was built with.
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Shared rules engine.
    pub fn rules(&self) -> Arc<Mutex<R>> {
        Arc::clone(&self.rules)
    }

    /// Provider gateway, for resolving providers outside a session.
    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    /// Current session snapshot.
    pub fn state(&self) -> SessionState {
        self.state.snapshot()
    }

    /// Handle for aborting and observing from another task.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            state: self.state.clone(),
            events: Arc::clone(&self.events),
        }
    }

    /// Forces the running session to halt.
    pub fn abort(&self) -> bool {
        self.handle().abort()
    }

    /// True if `config` may start without another probe.
    pub fn is_verified(&self, config: &ProviderConfig) -> bool {
        VerifiedKey::of(config).is_none_or(|key| self.verified.contains(&key))
    }

    /// Probes `config`'s credential and remembers it on success.
    ///
    /// # Errors
    ///
    /// Returns the configuration or probe failure.
    #[instrument(skip(self, config), fields(model = %config.model()))]
    pub async fn verify_credential(&mut self, config: &ProviderConfig) -> Result<(), Failure> {
        config.validate()?;
        self.gateway.probe(config).await?;
        if let Some(key) = VerifiedKey::of(config) {
            info!("Credential verified");
            self.verified.insert(key);
        }
        Ok(())
    }

    /// Starts a session with the given provider configurations.
    ///
    /// `credential` is used by any remote side that has none of its own.
    ///
    /// # Errors
    ///
    /// Fails before any provider call if a remote side lacks a credential
    /// or endpoint, if its credential has not been verified while
    /// verification is required, or if a session is already running.
    #[instrument(skip(self, white, black, credential), fields(white = %white.model(), black = %black.model()))]
    pub fn start(
        &mut self,
        white: ProviderConfig,
        black: ProviderConfig,
        credential: &Credential,
    ) -> Result<TurnOrchestrator<R>, ConfigurationError> {
        let white = white.with_fallback_credential(credential);
        let black = black.with_fallback_credential(credential);

        for (side, config) in [(Side::White, &white), (Side::Black, &black)] {
            config.validate().map_err(|failure| {
                warn!(%side, %failure, "Provider configuration rejected");
                ConfigurationError::Rejected { side, failure }
            })?;
            if self.settings.require_verified_credentials && !self.is_verified(config) {
                warn!(%side, "Credential not verified");
                return Err(ConfigurationError::UnverifiedCredential {
                    side,
                    model: config.model().clone(),
                });
            }
        }

        let seats = self.gateway.seat(&white, &black);
        self.start_with_providers(seats)
    }

    /// Starts a session with already built providers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::AlreadyRunning`] if a session is
    /// running.
    #[instrument(skip(self))]
    pub fn start_with_providers(
        &mut self,
        seats: SeatProviders,
    ) -> Result<TurnOrchestrator<R>, ConfigurationError> {
        if self.state.snapshot().status == SessionStatus::Running {
            return Err(ConfigurationError::AlreadyRunning);
        }

        let generation = {
            let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
            rules.reset();
            self.state.begin_session()
        };

        self.events.record(EventKind::SessionStarted {
            white: seats.for_side(Side::White).name().to_string(),
            black: seats.for_side(Side::Black).name().to_string(),
        });
        info!(generation, "Session started");

        Ok(TurnOrchestrator::new(
            self.state.clone(),
            generation,
            MoveApplier::new(Arc::clone(&self.rules)),
            Arc::clone(&self.gateway),
            seats,
            Arc::clone(&self.events),
            self.settings.startup_delay,
            self.settings.turn_delay,
        ))
    }
}
