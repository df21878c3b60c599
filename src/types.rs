//! Core domain types shared by every stage of a turn.

use derive_getters::Getters;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Rationale recorded when a provider gives a move but no `REASON:` segment.
pub const NO_REASON_PROVIDED: &str = "No reason provided.";

/// One of the two alternating turn-takers.
///
/// White always moves first, so `White` is the first side of every session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// First side to move.
    White,
    /// Second side to move.
    Black,
}

impl Side {
    /// Returns the other side.
    #[instrument]
    pub fn opponent(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

/// Serialized game state in Forsyth-Edwards Notation.
///
/// Positions are immutable values; every applied move yields a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(String);

impl Position {
    /// Wraps a FEN string.
    pub fn new(fen: impl Into<String>) -> Self {
        Self(fen.into())
    }

    /// Returns the FEN text.
    pub fn as_fen(&self) -> &str {
        &self.0
    }
}

/// An unvalidated candidate move plus the provider's rationale.
///
/// Always fully populated: a provider that cannot produce a move
/// produces a [`Failure`](crate::Failure) instead.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, derive_new::new)]
pub struct MoveProposal {
    /// Coordinate move such as `e2e4` or `a7a8q`, lowercase.
    uci: String,
    /// Free-form explanation from the provider.
    rationale: String,
}

/// A move the rules engine accepted and committed.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct AppliedMove {
    /// Side that made the move.
    side: Side,
    /// Coordinate form of the move as proposed.
    uci: String,
    /// Canonical human-readable notation (SAN).
    notation: String,
    /// Position after the move.
    resulting_position: Position,
    /// Rationale carried over from the proposal.
    rationale: String,
}

impl AppliedMove {
    /// Creates an applied move record.
    #[instrument(skip(resulting_position, rationale))]
    pub fn new(
        side: Side,
        uci: String,
        notation: String,
        resulting_position: Position,
        rationale: String,
    ) -> Self {
        Self {
            side,
            uci,
            notation,
            resulting_position,
            rationale,
        }
    }
}

/// Game-ending condition reported by the rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminalReason {
    /// The side to move is mated.
    #[display("checkmate, {winner} wins")]
    Checkmate {
        /// Side that delivered mate.
        winner: Side,
    },
    /// The side to move has no legal move and is not in check.
    #[display("stalemate")]
    Stalemate,
    /// The same position occurred three times.
    #[display("draw by threefold repetition")]
    ThreefoldRepetition,
    /// Neither side can possibly mate.
    #[display("draw by insufficient material")]
    InsufficientMaterial,
    /// One hundred half-moves without a capture or pawn move.
    #[display("draw by fifty-move rule")]
    FiftyMoveRule,
}

/// Result of one provider turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A legal move was committed and the game goes on.
    Applied(AppliedMove),
    /// The turn failed; the session halts.
    Failure(crate::failure::Failure),
    /// A committed move ended the game.
    TerminalReached {
        /// The final move.
        applied: AppliedMove,
        /// How the game ended.
        reason: TerminalReason,
    },
    /// The provider settled after its session halted; nothing was applied.
    Discarded,
}
