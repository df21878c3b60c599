//! Session state and the single-flight guard.
//!
//! State is shared between the orchestrator loop and whoever may abort
//! it, and only changes through the methods here.

use crate::failure::Failure;
use crate::types::{Side, TerminalReason};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tracing::{debug, info, instrument};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display)]
pub enum SessionStatus {
    /// No session has been started.
    #[default]
    Idle,
    /// Turns are being played.
    Running,
    /// The session ended; only a new start leaves this state.
    Halted,
}

/// Where the orchestrator is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display)]
pub enum TurnPhase {
    /// Waiting to schedule the next turn.
    #[default]
    Idle,
    /// A provider call is outstanding.
    AwaitingProvider,
    /// A provider call settled and its result is being handled.
    Resolving,
    /// The session is over.
    Terminal,
}

/// Why a session halted.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(tag = "halt", rename_all = "snake_case")]
pub enum HaltReason {
    /// The game ended normally.
    #[display("{_0}")]
    Terminal(TerminalReason),
    /// A turn failed.
    #[display("{side} failed: {failure}")]
    Failure {
        /// Side whose turn failed.
        side: Side,
        /// What went wrong.
        failure: Failure,
    },
    /// Stopped from outside.
    #[display("aborted")]
    Aborted,
}

/// Snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Side whose turn it is (or was, when halted).
    pub active_side: Option<Side>,
    /// True while exactly one provider call is outstanding.
    pub in_flight: bool,
    /// Orchestrator phase.
    pub phase: TurnPhase,
    /// Set once the session halts.
    pub halt_reason: Option<HaltReason>,
    /// Moves applied this session.
    pub moves_played: u32,
    /// Incremented on every start; calls from older sessions are ignored.
    pub generation: u64,
}

/// Shared, lock-protected [`SessionState`].
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<SessionState>>,
    released: Arc<Notify>,
}

impl SharedState {
    /// Creates idle state.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    /// Begins a fresh session and returns its generation.
    #[instrument(skip(self))]
    pub fn begin_session(&self) -> u64 {
        let mut state = self.lock();
        let generation = state.generation + 1;
        *state = SessionState {
            status: SessionStatus::Running,
            active_side: Some(Side::White),
            in_flight: false,
            phase: TurnPhase::Idle,
            halt_reason: None,
            moves_played: 0,
            generation,
        };
        info!(generation, "Session state reset");
        generation
    }

    /// True while session `generation` is running.
    pub fn is_live(&self, generation: u64) -> bool {
        let state = self.lock();
        state.generation == generation && state.status == SessionStatus::Running
    }

    /// Claims the single in-flight slot for `side`.
    ///
    /// Fails without side effects if the session is not running, belongs
    /// to another generation, or a call is already outstanding.
    pub fn try_begin_request(&self, generation: u64, side: Side) -> Result<InFlightGuard, Busy> {
        let mut state = self.lock();
        if state.generation != generation || state.status != SessionStatus::Running {
            return Err(Busy::NotRunning);
        }
        if state.in_flight {
            return Err(Busy::InFlight);
        }
        state.in_flight = true;
        state.active_side = Some(side);
        state.phase = TurnPhase::AwaitingProvider;
        debug!(generation, %side, "In-flight slot claimed");
        Ok(InFlightGuard {
            state: self.clone(),
            generation,
        })
    }

    /// Counts a committed move for session `generation`.
    ///
    /// The move is counted even if the session halted after the commit;
    /// only a running session returns to `Idle`. Returns false if a newer
    /// session has replaced `generation`.
    pub fn record_move(&self, generation: u64, next_side: Side) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.moves_played += 1;
        state.active_side = Some(next_side);
        if state.status == SessionStatus::Running {
            state.phase = TurnPhase::Idle;
        }
        true
    }

    /// Marks the phase `Resolving` if `generation` is still running.
    pub fn enter_resolving(&self, generation: u64) -> bool {
        let mut state = self.lock();
        let live = state.generation == generation && state.status == SessionStatus::Running;
        if live {
            state.phase = TurnPhase::Resolving;
        }
        live
    }

    /// Halts session `generation` with `reason`.
    ///
    /// Returns false if that session was no longer running.
    #[instrument(skip(self))]
    pub fn halt(&self, generation: u64, reason: HaltReason) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        halt_locked(&mut state, reason)
    }

    /// Halts whatever session is running. Returns false if none was.
    #[instrument(skip(self))]
    pub fn abort(&self) -> bool {
        halt_locked(&mut self.lock(), HaltReason::Aborted)
    }

    /// Resolves the next time an in-flight slot is released.
    ///
    /// Only releases after the future is enabled or first polled count.
    pub fn slot_released(&self) -> Notified<'_> {
        self.released.notified()
    }

    fn release(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation {
            state.in_flight = false;
            debug!(generation, "In-flight slot released");
        }
        drop(state);
        self.released.notify_waiters();
    }
}

fn halt_locked(state: &mut SessionState, reason: HaltReason) -> bool {
    if state.status != SessionStatus::Running {
        return false;
    }
    info!(%reason, "Session halted");
    state.status = SessionStatus::Halted;
    state.phase = TurnPhase::Terminal;
    state.halt_reason = Some(reason);
    true
}

/// Why the in-flight slot could not be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Busy {
    /// The session is not running.
    #[display("session not running")]
    NotRunning,
    /// Another provider call is outstanding.
    #[display("provider call already in flight")]
    InFlight,
}

/// Holds the in-flight slot; releases it when dropped, on every exit path.
#[derive(Debug)]
#[must_use = "the in-flight slot is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    state: SharedState,
    generation: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.release(self.generation);
    }
}

/// Identifies one session generation so late results can be recognised.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    state: SharedState,
    generation: u64,
}

impl SessionTicket {
    /// Ticket for session `generation`.
    pub fn new(state: SharedState, generation: u64) -> Self {
        Self { state, generation }
    }

    /// Generation this ticket belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while the ticket's session is still running.
    pub fn is_live(&self) -> bool {
        self.state.is_live(self.generation)
    }
}
