//! Commits proposals through the rules engine.

use crate::failure::Failure;
use crate::rules::RulesEngine;
use crate::state::SessionTicket;
use crate::types::{AppliedMove, MoveProposal, Side};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, instrument};

/// Turns a [`MoveProposal`] into an [`AppliedMove`] or an `IllegalMove`
/// failure. Legality is decided entirely by the wrapped engine; a
/// rejected proposal is never retried or repaired.
#[derive(Debug)]
pub struct MoveApplier<R> {
    rules: Arc<Mutex<R>>,
}

impl<R> Clone for MoveApplier<R> {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
        }
    }
}

impl<R: RulesEngine> MoveApplier<R> {
    /// Wraps a shared rules engine.
    pub fn new(rules: Arc<Mutex<R>>) -> Self {
        Self { rules }
    }

    /// Locks the engine for reading or resetting.
    pub fn rules(&self) -> MutexGuard<'_, R> {
        self.rules.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `proposal` for `side` while the session behind `ticket`
    /// is running.
    ///
    /// The liveness check and the commit happen under the engine lock, the
    /// same lock a restart resets under. Returns `Ok(None)` without touching
    /// the engine once the session has halted.
    ///
    /// # Errors
    ///
    /// Returns an `IllegalMove` failure carrying the proposed move when the
    /// engine rejects it; the position is left unchanged.
    #[instrument(skip(self, proposal, ticket), fields(uci = %proposal.uci(), generation = ticket.generation()))]
    pub fn apply(
        &self,
        proposal: &MoveProposal,
        side: Side,
        ticket: &SessionTicket,
    ) -> Result<Option<AppliedMove>, Failure> {
        let mut rules = self.rules();
        if !ticket.is_live() {
            info!(%side, "Session halted before commit; proposal dropped");
            return Ok(None);
        }
        let accepted = rules
            .apply_move(proposal.uci())
            .map_err(|_| Failure::illegal_move(proposal.uci()))?;
        drop(rules);

        info!(%side, notation = %accepted.notation(), "Move committed");
        Ok(Some(AppliedMove::new(
            side,
            proposal.uci().clone(),
            accepted.notation().clone(),
            accepted.position().clone(),
            proposal.rationale().clone(),
        )))
    }
}
