//! Turn orchestration between two move providers.
//!
//! Each turn walks `Idle -> AwaitingProvider -> Resolving` and then either
//! returns to `Idle` or ends in `Terminal`. Any failure is terminal for
//! the session; nothing is retried.

use crate::applier::MoveApplier;
use crate::events::{EventKind, EventSink};
use crate::gateway::{ProviderGateway, SeatProviders};
use crate::providers::TurnContext;
use crate::rules::RulesEngine;
use crate::state::{Busy, HaltReason, SessionState, SessionTicket, SharedState};
use crate::types::{Side, TerminalReason, TurnOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// What a single [`TurnOrchestrator::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A provider was asked and its result handled.
    Resolved(TurnOutcome),
    /// No provider was asked.
    Rejected(RejectReason),
}

/// Why a step was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RejectReason {
    /// The session is halted or was replaced.
    #[display("session not running")]
    NotRunning,
    /// Another provider call is outstanding.
    #[display("provider call already in flight")]
    InFlight,
    /// The position was already terminal; the session is now halted.
    #[display("game already over: {_0}")]
    AlreadyTerminal(TerminalReason),
}

impl From<Busy> for RejectReason {
    fn from(busy: Busy) -> Self {
        match busy {
            Busy::NotRunning => RejectReason::NotRunning,
            Busy::InFlight => RejectReason::InFlight,
        }
    }
}

/// Drives one session's turns until it halts.
///
/// Cloning yields another handle onto the same session, so two clones
/// stepping concurrently still share one in-flight slot.
pub struct TurnOrchestrator<R> {
    ticket: SessionTicket,
    state: SharedState,
    applier: MoveApplier<R>,
    gateway: Arc<ProviderGateway>,
    seats: SeatProviders,
    events: Arc<dyn EventSink>,
    startup_delay: Duration,
    turn_delay: Duration,
}

impl<R> Clone for TurnOrchestrator<R> {
    fn clone(&self) -> Self {
        Self {
            ticket: self.ticket.clone(),
            state: self.state.clone(),
            applier: self.applier.clone(),
            gateway: Arc::clone(&self.gateway),
            seats: self.seats.clone(),
            events: Arc::clone(&self.events),
            startup_delay: self.startup_delay,
            turn_delay: self.turn_delay,
        }
    }
}

impl<R> std::fmt::Debug for TurnOrchestrator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("generation", &self.ticket.generation())
            .field("seats", &self.seats)
            .field("startup_delay", &self.startup_delay)
            .field("turn_delay", &self.turn_delay)
            .finish_non_exhaustive()
    }
}

impl<R: RulesEngine> TurnOrchestrator<R> {
    /// Creates an orchestrator for session `generation`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: SharedState,
        generation: u64,
        applier: MoveApplier<R>,
        gateway: Arc<ProviderGateway>,
        seats: SeatProviders,
        events: Arc<dyn EventSink>,
        startup_delay: Duration,
        turn_delay: Duration,
    ) -> Self {
        Self {
            ticket: SessionTicket::new(state.clone(), generation),
            state,
            applier,
            gateway,
            seats,
            events,
            startup_delay,
            turn_delay,
        }
    }

    /// Session generation this orchestrator drives.
    pub fn generation(&self) -> u64 {
        self.ticket.generation()
    }

    /// Current session snapshot.
    pub fn state(&self) -> SessionState {
        self.state.snapshot()
    }

    /// Plays one turn.
    ///
    /// Re-entry is a no-op: if the session is not running, a call is
    /// already outstanding, or the game is already over, no provider is
    /// asked. The in-flight slot is released on every exit path.
    #[instrument(skip(self), fields(generation = self.ticket.generation()))]
    pub async fn step(&self) -> StepOutcome {
        let generation = self.ticket.generation();
        if !self.ticket.is_live() {
            return StepOutcome::Rejected(RejectReason::NotRunning);
        }

        let turn = {
            let rules = self.applier.rules();
            if let Some(reason) = rules.terminal() {
                drop(rules);
                self.finish(reason);
                return StepOutcome::Rejected(RejectReason::AlreadyTerminal(reason));
            }
            TurnContext::new(rules.position(), rules.side_to_move(), rules.legal_moves())
        };
        let side = *turn.side();

        let guard = match self.state.try_begin_request(generation, side) {
            Ok(guard) => guard,
            Err(busy) => {
                debug!(%busy, "Turn request rejected");
                return StepOutcome::Rejected(busy.into());
            }
        };

        let provider = self.seats.for_side(side);
        self.events.record(EventKind::TurnStarted {
            side,
            provider: provider.name().to_string(),
        });

        let outcome = self
            .gateway
            .request_move(
                provider.as_ref(),
                &turn,
                &self.applier,
                &self.ticket,
                self.events.as_ref(),
            )
            .await;
        let resolved = self.resolve(side, outcome);
        drop(guard);

        StepOutcome::Resolved(resolved)
    }

    /// Handles a settled provider call.
    ///
    /// A committed move is always reported, even when the session halted
    /// between the commit and this call.
    fn resolve(&self, side: Side, outcome: TurnOutcome) -> TurnOutcome {
        let generation = self.ticket.generation();
        let live = self.state.enter_resolving(generation);

        match outcome {
            TurnOutcome::Applied(applied) => {
                if !self.state.record_move(generation, side.opponent()) {
                    info!(%side, "Session replaced after commit; discarding");
                    return TurnOutcome::Discarded;
                }
                self.events.record(EventKind::MoveApplied {
                    side,
                    notation: applied.notation().clone(),
                    uci: applied.uci().clone(),
                    rationale: applied.rationale().clone(),
                });
                if !live {
                    info!(%side, "Session halted after commit");
                    return TurnOutcome::Applied(applied);
                }

                let terminal = self.applier.rules().terminal();
                match terminal {
                    Some(reason) => {
                        self.finish(reason);
                        TurnOutcome::TerminalReached { applied, reason }
                    }
                    None => TurnOutcome::Applied(applied),
                }
            }
            _ if !live => {
                info!(%side, "Result arrived after session halted; discarding");
                TurnOutcome::Discarded
            }
            TurnOutcome::Failure(failure) => {
                warn!(%side, %failure, "Turn failed; halting session");
                self.events.record(EventKind::Failure {
                    side,
                    failure: failure.clone(),
                });
                self.state.halt(
                    generation,
                    HaltReason::Failure {
                        side,
                        failure: failure.clone(),
                    },
                );
                TurnOutcome::Failure(failure)
            }
            other => other,
        }
    }

    fn finish(&self, reason: TerminalReason) {
        if self
            .state
            .halt(self.ticket.generation(), HaltReason::Terminal(reason))
        {
            self.events.record(EventKind::Terminal { reason });
        }
    }

    /// Plays turns until the session halts and returns why it halted.
    ///
    /// If another handle's call is outstanding the loop parks until that
    /// call releases the in-flight slot, then tries again.
    #[instrument(skip(self), fields(generation = self.ticket.generation()))]
    pub async fn run(&self) -> HaltReason {
        info!("Starting turn loop");
        pause(self.startup_delay).await;

        loop {
            let released = self.state.slot_released();
            tokio::pin!(released);
            released.as_mut().enable();

            match self.step().await {
                StepOutcome::Resolved(TurnOutcome::Applied(applied)) => {
                    debug!(notation = %applied.notation(), "Turn complete");
                    pause(self.turn_delay).await;
                }
                StepOutcome::Rejected(RejectReason::InFlight) => {
                    debug!("Another call is outstanding; waiting for its slot");
                    released.await;
                }
                StepOutcome::Resolved(_) | StepOutcome::Rejected(_) => break,
            }
        }

        let snapshot = self.state.snapshot();
        let reason = match snapshot.halt_reason {
            Some(reason) if snapshot.generation == self.ticket.generation() => reason,
            _ => HaltReason::Aborted,
        };
        info!(%reason, moves = snapshot.moves_played, "Turn loop finished");
        reason
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
