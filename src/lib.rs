//! Chess Duel - turn orchestration between chess move providers
//!
//! Two independently configured providers (a uniform random mover or a
//! remote text-generation model) take turns proposing moves. Remote
//! answers are parsed from free text, every move is validated by the
//! rules engine, and the first failure of any kind halts the game.
//!
//! # Architecture
//!
//! - **Parser**: extracts `MOVE:` / `REASON:` from free-form model output
//! - **Applier**: commits proposals through the [`RulesEngine`]
//! - **Gateway**: asks a provider for a move and classifies failures
//! - **Orchestrator**: the single-flight turn loop
//! - **Session**: start, abort and credential verification
//!
//! # Example
//!
//! ```no_run
//! use chess_duel::{
//!     ChessRules, Credential, HttpTransport, ProviderConfig, SessionController,
//!     SessionSettings, TracingSink,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = SessionSettings::default();
//! let transport = Arc::new(HttpTransport::new(settings.request_timeout)?);
//! let mut controller =
//!     SessionController::new(ChessRules::new(), transport, Arc::new(TracingSink), settings);
//!
//! let orchestrator = controller.start(
//!     ProviderConfig::random(),
//!     ProviderConfig::random(),
//!     &Credential::default(),
//! )?;
//! let reason = orchestrator.run().await;
//! println!("Game ended: {reason}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod applier;
mod config;
mod events;
mod failure;
mod gateway;
mod orchestrator;
mod parser;
mod providers;
mod rules;
mod session;
mod state;
mod transport;
mod types;

// Crate-level exports - Domain types
pub use types::{
    AppliedMove, MoveProposal, NO_REASON_PROVIDED, Position, Side, TerminalReason, TurnOutcome,
};

// Crate-level exports - Failures
pub use failure::{Failure, FailureKind};

// Crate-level exports - Parsing and move application
pub use applier::MoveApplier;
pub use parser::parse_response;
pub use rules::{ChessRules, EngineMove, MoveRejected, RulesEngine};

// Crate-level exports - Providers
pub use gateway::{ProviderGateway, SeatProviders};
pub use providers::{
    ApiFlavor, Credential, GenerationParams, MoveProvider, ProviderConfig, ProviderKind,
    RANDOM_MODEL, RANDOM_RATIONALE, RandomProvider, RemoteDescriptor, RemoteProvider, TurnContext,
};
pub use transport::{HttpTransport, Transport, TransportError, TransportRequest, TransportResponse};

// Crate-level exports - Orchestration
pub use orchestrator::{RejectReason, StepOutcome, TurnOrchestrator};
pub use session::{ConfigurationError, SessionController, SessionHandle, SessionSettings};
pub use state::{
    Busy, HaltReason, InFlightGuard, SessionState, SessionStatus, SessionTicket, SharedState,
    TurnPhase,
};

// Crate-level exports - Events
pub use events::{ChannelSink, EventKind, EventSink, GameEvent, MemorySink, TracingSink};

// Crate-level exports - Configuration
pub use config::{API_KEY_ENV, ArenaConfig, ConfigError, SeatConfig, TimingConfig, shared_credential};
