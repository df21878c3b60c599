//! Append-only game event log.
//!
//! The orchestrator reports every turn start, raw provider answer,
//! applied move, failure and game end here. How events are shown is up
//! to the sink.

use crate::failure::Failure;
use crate::types::{Side, TerminalReason};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    /// A new session began.
    SessionStarted {
        /// White's provider name.
        white: String,
        /// Black's provider name.
        black: String,
    },
    /// A provider was asked for a move.
    TurnStarted {
        /// Side to move.
        side: Side,
        /// Provider name.
        provider: String,
    },
    /// Raw text returned by a remote provider.
    RawResponse {
        /// Side the answer is for.
        side: Side,
        /// Unparsed text.
        text: String,
    },
    /// A provider proposed a move, not yet validated.
    MoveProposed {
        /// Side the proposal is for.
        side: Side,
        /// Coordinate form.
        uci: String,
    },
    /// A move was committed.
    MoveApplied {
        /// Side that moved.
        side: Side,
        /// SAN of the move.
        notation: String,
        /// Coordinate form.
        uci: String,
        /// Provider's explanation.
        rationale: String,
    },
    /// The turn failed and the session halted.
    Failure {
        /// Side whose turn failed.
        side: Side,
        /// Classified failure.
        failure: Failure,
    },
    /// The game reached a terminal position.
    Terminal {
        /// Why the game ended.
        reason: TerminalReason,
    },
    /// The session was aborted from outside.
    Aborted,
}

/// Timestamped event.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct GameEvent {
    /// When it was recorded.
    at: DateTime<Utc>,
    /// What happened.
    #[serde(flatten)]
    kind: EventKind,
}

impl GameEvent {
    /// Stamps `kind` with the current time.
    pub fn now(kind: EventKind) -> Self {
        Self {
            at: Utc::now(),
            kind,
        }
    }

    /// One-line rendering for logs.
    pub fn summary(&self) -> String {
        match &self.kind {
            EventKind::SessionStarted { white, black } => {
                format!("Game started: {white} (White) vs {black} (Black)")
            }
            EventKind::TurnStarted { side, provider } => {
                format!("{side} AI ({provider}) is thinking...")
            }
            EventKind::RawResponse { side, text } => format!("{side} raw response: {text}"),
            EventKind::MoveProposed { side, uci } => format!("{side} proposed {uci}"),
            EventKind::MoveApplied {
                side,
                notation,
                rationale,
                ..
            } => format!("{side} moved: {notation} (reason: {rationale})"),
            EventKind::Failure { side, failure } => {
                format!("{side} move failed, game halted: {failure}")
            }
            EventKind::Terminal { reason } => format!("Game over: {reason}"),
            EventKind::Aborted => "Game aborted".to_string(),
        }
    }
}

/// Receives game events.
pub trait EventSink: Send + Sync {
    /// Appends `event`.
    fn emit(&self, event: GameEvent);

    /// Stamps and appends `kind`.
    fn record(&self, kind: EventKind) {
        self.emit(GameEvent::now(kind));
    }
}

/// Writes events to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: GameEvent) {
        match event.kind() {
            EventKind::Failure { .. } => warn!(at = %event.at(), "{}", event.summary()),
            _ => info!(at = %event.at(), "{}", event.summary()),
        }
    }
}

/// Forwards events over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<GameEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GameEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: GameEvent) {
        if self.tx.send(event).is_err() {
            warn!("Event receiver dropped; event discarded");
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<GameEvent>>,
}

impl MemorySink {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of all events so far, oldest first.
    pub fn events(&self) -> Vec<GameEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Just the kinds, oldest first.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().into_iter().map(|e| e.kind).collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: GameEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
