//! Standard chess rules backed by `shakmaty`.

use super::{EngineMove, MoveRejected, RulesEngine};
use crate::types::{Position, Side, TerminalReason};
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position as _};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Occurrences of a position (placement, turn, castling, en passant)
/// that end the game as a draw.
const REPETITION_LIMIT: u8 = 3;

/// Half-moves without capture or pawn move that end the game as a draw.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// Chess rules engine with repetition tracking.
#[derive(Debug, Clone)]
pub struct ChessRules {
    initial: Chess,
    position: Chess,
    repetitions: HashMap<String, u8>,
}

impl ChessRules {
    /// Creates an engine at the standard starting position.
    #[instrument]
    pub fn new() -> Self {
        Self::from_position(Chess::default())
    }

    /// Creates an engine from a FEN string; [`RulesEngine::reset`]
    /// returns to this position.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the FEN is malformed or
    /// describes an impossible position.
    #[instrument]
    pub fn from_fen(fen: &str) -> Result<Self, String> {
        let parsed: Fen = fen
            .parse()
            .map_err(|e| format!("invalid FEN '{fen}': {e}"))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| format!("illegal position '{fen}': {e}"))?;
        Ok(Self::from_position(position))
    }

    fn from_position(position: Chess) -> Self {
        let mut rules = Self {
            initial: position.clone(),
            position,
            repetitions: HashMap::new(),
        };
        rules.record_repetition();
        rules
    }

    fn fen_of(position: &Chess) -> String {
        Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
    }

    /// Placement, turn, castling rights and en-passant square.
    fn repetition_key(&self) -> String {
        Self::fen_of(&self.position)
            .split_whitespace()
            .take(4)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn record_repetition(&mut self) {
        let count = self.repetitions.entry(self.repetition_key()).or_insert(0);
        *count += 1;
    }

    fn side_of(color: Color) -> Side {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl Default for ChessRules {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesEngine for ChessRules {
    fn position(&self) -> Position {
        Position::new(Self::fen_of(&self.position))
    }

    fn side_to_move(&self) -> Side {
        Self::side_of(self.position.turn())
    }

    fn legal_moves(&self) -> Vec<String> {
        self.position
            .legal_moves()
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect()
    }

    #[instrument(skip(self))]
    fn apply_move(&mut self, candidate: &str) -> Result<EngineMove, MoveRejected> {
        let rejected = |reason: String| {
            warn!(candidate, reason = %reason, "Move rejected");
            MoveRejected {
                candidate: candidate.to_string(),
                reason,
            }
        };

        let uci: UciMove = candidate
            .parse()
            .map_err(|e| rejected(format!("not a coordinate move: {e}")))?;
        let chess_move = uci
            .to_move(&self.position)
            .map_err(|e| rejected(format!("illegal in this position: {e}")))?;

        let notation = SanPlus::from_move(self.position.clone(), &chess_move).to_string();
        self.position.play_unchecked(&chess_move);
        self.record_repetition();

        debug!(candidate, notation = %notation, "Move applied");
        Ok(EngineMove::new(notation, self.position()))
    }

    fn terminal(&self) -> Option<TerminalReason> {
        if self.position.is_checkmate() {
            return Some(TerminalReason::Checkmate {
                winner: Self::side_of(self.position.turn()).opponent(),
            });
        }
        if self.position.is_stalemate() {
            return Some(TerminalReason::Stalemate);
        }
        if self.position.is_insufficient_material() {
            return Some(TerminalReason::InsufficientMaterial);
        }
        let seen = self
            .repetitions
            .get(&self.repetition_key())
            .copied()
            .unwrap_or(0);
        if seen >= REPETITION_LIMIT {
            return Some(TerminalReason::ThreefoldRepetition);
        }
        if self.position.halfmoves() >= FIFTY_MOVE_HALFMOVES {
            return Some(TerminalReason::FiftyMoveRule);
        }
        None
    }

    #[instrument(skip(self))]
    fn reset(&mut self) {
        debug!("Resetting to initial position");
        self.position = self.initial.clone();
        self.repetitions.clear();
        self.record_repetition();
    }
}
