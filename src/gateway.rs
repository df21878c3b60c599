//! Provider gateway: "ask side S's provider for a move in position P".

use crate::applier::MoveApplier;
use crate::events::{EventKind, EventSink};
use crate::failure::Failure;
use crate::providers::{
    GenerationParams, MoveProvider, ProviderConfig, ProviderKind, RandomProvider, RemoteProvider,
    TurnContext,
};
use crate::rules::RulesEngine;
use crate::state::SessionTicket;
use crate::transport::Transport;
use crate::types::{Side, TurnOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// The provider assigned to each side for one session.
#[derive(Clone)]
pub struct SeatProviders {
    white: Arc<dyn MoveProvider>,
    black: Arc<dyn MoveProvider>,
}

impl SeatProviders {
    /// Pairs the two providers.
    pub fn new(white: Arc<dyn MoveProvider>, black: Arc<dyn MoveProvider>) -> Self {
        Self { white, black }
    }

    /// Provider playing `side`.
    pub fn for_side(&self, side: Side) -> &Arc<dyn MoveProvider> {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

impl std::fmt::Debug for SeatProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatProviders")
            .field("white", &self.white.name())
            .field("black", &self.black.name())
            .finish()
    }
}

/// Builds providers from configuration and runs one provider call per
/// request. Holds no state between calls.
#[derive(Clone)]
pub struct ProviderGateway {
    transport: Arc<dyn Transport>,
    random_think_time: Duration,
    request_timeout: Duration,
    generation: GenerationParams,
}

impl ProviderGateway {
    /// Creates a gateway sending remote requests through `transport`.
    #[instrument(skip(transport))]
    pub fn new(
        transport: Arc<dyn Transport>,
        random_think_time: Duration,
        request_timeout: Duration,
        generation: GenerationParams,
    ) -> Self {
        Self {
            transport,
            random_think_time,
            request_timeout,
            generation,
        }
    }

    /// Turns a configuration into a provider.
    #[instrument(skip(self, config), fields(model = %config.model()))]
    pub fn resolve(&self, config: &ProviderConfig) -> Arc<dyn MoveProvider> {
        match config.kind() {
            ProviderKind::Random => Arc::new(RandomProvider::new(self.random_think_time)),
            ProviderKind::RemoteTextModel(descriptor) => Arc::new(self.remote(descriptor, config)),
        }
    }

    fn remote(
        &self,
        descriptor: &crate::providers::RemoteDescriptor,
        config: &ProviderConfig,
    ) -> RemoteProvider {
        RemoteProvider::new(
            descriptor.clone(),
            config.model().clone(),
            config.credential().clone(),
            self.generation,
            self.request_timeout,
            Arc::clone(&self.transport),
        )
    }

    /// Resolves both sides at once.
    pub fn seat(&self, white: &ProviderConfig, black: &ProviderConfig) -> SeatProviders {
        SeatProviders::new(self.resolve(white), self.resolve(black))
    }

    /// Asks `provider` for a move and commits it through `applier`.
    ///
    /// Every failure comes back as [`TurnOutcome::Failure`]; nothing is
    /// retried. If the session behind `ticket` halted while the provider
    /// was thinking, the proposal is dropped and the outcome is
    /// [`TurnOutcome::Discarded`].
    #[instrument(skip_all, fields(provider = %provider.name(), side = %turn.side()))]
    pub async fn request_move<R: RulesEngine>(
        &self,
        provider: &dyn MoveProvider,
        turn: &TurnContext,
        applier: &MoveApplier<R>,
        ticket: &SessionTicket,
        events: &dyn EventSink,
    ) -> TurnOutcome {
        let proposal = match provider.propose_move(turn, events).await {
            Ok(proposal) => proposal,
            Err(failure) => return TurnOutcome::Failure(failure),
        };

        if !ticket.is_live() {
            info!(generation = ticket.generation(), "Session halted while provider was thinking");
            return TurnOutcome::Discarded;
        }

        events.record(EventKind::MoveProposed {
            side: *turn.side(),
            uci: proposal.uci().clone(),
        });
        debug!(uci = %proposal.uci(), "Applying proposal");
        match applier.apply(&proposal, *turn.side(), ticket) {
            Ok(Some(applied)) => TurnOutcome::Applied(applied),
            Ok(None) => TurnOutcome::Discarded,
            Err(failure) => TurnOutcome::Failure(failure),
        }
    }

    /// Checks that a configured provider answers.
    ///
    /// Random providers always pass.
    ///
    /// # Errors
    ///
    /// Returns the classified failure of the probe request.
    #[instrument(skip(self, config), fields(model = %config.model()))]
    pub async fn probe(&self, config: &ProviderConfig) -> Result<(), Failure> {
        match config.kind() {
            ProviderKind::Random => Ok(()),
            ProviderKind::RemoteTextModel(descriptor) => {
                self.remote(descriptor, config).probe().await
            }
        }
    }
}

impl std::fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("random_think_time", &self.random_think_time)
            .field("request_timeout", &self.request_timeout)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
