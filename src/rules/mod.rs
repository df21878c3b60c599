//! Rules engine seam.
//!
//! The orchestrator never interprets chess itself: legality, move
//! application, notation and game-end detection all go through
//! [`RulesEngine`].

mod chess;

pub use chess::ChessRules;

use crate::types::{Position, Side, TerminalReason};
use derive_getters::Getters;
use derive_more::{Display, Error};

/// A move the engine accepted.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct EngineMove {
    /// Canonical notation for the move (SAN).
    notation: String,
    /// Position after the move.
    position: Position,
}

impl EngineMove {
    /// Creates an accepted-move record.
    pub fn new(notation: String, position: Position) -> Self {
        Self { notation, position }
    }
}

/// The engine refused a candidate move; the position is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("move {candidate} rejected: {reason}")]
pub struct MoveRejected {
    /// The candidate as given.
    pub candidate: String,
    /// Why it was refused.
    pub reason: String,
}

/// Authority on positions, legality and game end.
pub trait RulesEngine: Send {
    /// Current position.
    fn position(&self) -> Position;

    /// Side whose turn it is.
    fn side_to_move(&self) -> Side;

    /// All legal moves in coordinate notation.
    fn legal_moves(&self) -> Vec<String>;

    /// Validates and commits `candidate`, a coordinate move.
    ///
    /// # Errors
    ///
    /// Returns [`MoveRejected`] if the candidate is malformed or illegal.
    fn apply_move(&mut self, candidate: &str) -> Result<EngineMove, MoveRejected>;

    /// Game-ending condition of the current position, if any.
    fn terminal(&self) -> Option<TerminalReason>;

    /// Returns to the initial position.
    fn reset(&mut self);
}
