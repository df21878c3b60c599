//! Provider that plays a uniformly random legal move.

use super::{MoveProvider, TurnContext};
use crate::events::EventSink;
use crate::failure::Failure;
use crate::types::MoveProposal;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, instrument};

/// Rationale attached to every random move.
pub const RANDOM_RATIONALE: &str = "Chose a random legal move.";

/// Picks uniformly among the legal moves after a short thinking pause.
///
/// The pause only makes play perceptible; it has no bearing on the move.
pub struct RandomProvider {
    name: String,
    think_time: Duration,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl RandomProvider {
    /// Creates a random provider seeded from the OS.
    #[instrument]
    pub fn new(think_time: Duration) -> Self {
        Self::with_rng(think_time, StdRng::from_entropy())
    }

    /// Creates a random provider drawing from `rng`.
    pub fn with_rng(think_time: Duration, rng: impl RngCore + Send + 'static) -> Self {
        Self {
            name: "Random".to_string(),
            think_time,
            rng: Mutex::new(Box::new(rng)),
        }
    }
}

impl std::fmt::Debug for RandomProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomProvider")
            .field("name", &self.name)
            .field("think_time", &self.think_time)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl MoveProvider for RandomProvider {
    #[instrument(skip(self, turn, _events), fields(side = %turn.side()))]
    async fn propose_move(
        &self,
        turn: &TurnContext,
        _events: &dyn EventSink,
    ) -> Result<MoveProposal, Failure> {
        tokio::time::sleep(self.think_time).await;

        let choice = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            turn.legal_moves().choose(&mut *rng).cloned()
        };

        let uci = choice.ok_or_else(Failure::no_legal_moves)?;
        debug!(uci = %uci, candidates = turn.legal_moves().len(), "Random move chosen");
        Ok(MoveProposal::new(uci, RANDOM_RATIONALE.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
