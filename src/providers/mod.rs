//! Move providers: who gets asked for a move, and how.

mod descriptor;
mod random;
mod remote;

pub use descriptor::{ApiFlavor, GenerationParams, RemoteDescriptor};
pub use random::{RANDOM_RATIONALE, RandomProvider};
pub use remote::RemoteProvider;

use crate::events::EventSink;
use crate::failure::Failure;
use crate::types::{MoveProposal, Position, Side};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Model identifier that selects the local random mover.
pub const RANDOM_MODEL: &str = "random";

/// Opaque provider secret. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wraps a secret, trimming surrounding whitespace.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into().trim().to_string())
    }

    /// True when no secret was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exposes the secret for header construction.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

/// Which strategy a side uses, resolved once at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    /// Uniform choice among legal moves.
    Random,
    /// A remote text-generation service.
    RemoteTextModel(RemoteDescriptor),
}

/// Provider configuration for one side. Frozen for a session.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ProviderConfig {
    /// Strategy.
    kind: ProviderKind,
    /// Model identifier (`random` for the random mover).
    model: String,
    /// Secret for remote providers.
    credential: Credential,
}

impl ProviderConfig {
    /// The random mover.
    #[instrument]
    pub fn random() -> Self {
        Self {
            kind: ProviderKind::Random,
            model: RANDOM_MODEL.to_string(),
            credential: Credential::default(),
        }
    }

    /// A remote text model described by `descriptor`.
    #[instrument(skip(credential))]
    pub fn remote(descriptor: RemoteDescriptor, model: String, credential: Credential) -> Self {
        Self {
            kind: ProviderKind::RemoteTextModel(descriptor),
            model,
            credential,
        }
    }

    /// Resolves a model identifier: `random`, or a remote model whose API
    /// flavor is inferred from its name and whose endpoint is the flavor
    /// default unless `endpoint` overrides it (`{model}` in an override is
    /// replaced by the identifier).
    ///
    /// # Errors
    ///
    /// Returns a `ProviderUnconfigured` failure for identifiers that match
    /// no known API flavor.
    #[instrument(skip(credential))]
    pub fn for_model(
        model: &str,
        endpoint: Option<&str>,
        credential: Credential,
    ) -> Result<Self, Failure> {
        let model = model.trim();
        if model.eq_ignore_ascii_case(RANDOM_MODEL) {
            return Ok(Self::random());
        }

        let flavor = ApiFlavor::infer(model).ok_or_else(|| {
            Failure::provider_unconfigured(format!("no API flavor known for model {model}"))
        })?;
        let descriptor = match endpoint {
            Some(url) => RemoteDescriptor::new(flavor, url.replace("{model}", model)),
            None => RemoteDescriptor::for_model(flavor, model),
        };
        debug!(?flavor, endpoint = %descriptor.endpoint(), "Resolved remote provider");
        Ok(Self::remote(descriptor, model.to_string(), credential))
    }

    /// True for remote providers.
    pub fn is_remote(&self) -> bool {
        matches!(self.kind, ProviderKind::RemoteTextModel(_))
    }

    /// Returns this config with `credential` if it has none of its own.
    pub fn with_fallback_credential(mut self, credential: &Credential) -> Self {
        if self.is_remote() && self.credential.is_empty() {
            self.credential = credential.clone();
        }
        self
    }

    /// Checks the configuration can be used to start a session.
    ///
    /// # Errors
    ///
    /// Returns `NoCredential` for a remote provider without a secret and
    /// `ProviderUnconfigured` for one without an endpoint.
    pub fn validate(&self) -> Result<(), Failure> {
        match &self.kind {
            ProviderKind::Random => Ok(()),
            ProviderKind::RemoteTextModel(descriptor) => {
                if self.credential.is_empty() {
                    return Err(Failure::no_credential(&self.model));
                }
                if descriptor.endpoint().trim().is_empty() {
                    return Err(Failure::provider_unconfigured(format!(
                        "API endpoint not configured for {}",
                        self.model
                    )));
                }
                Ok(())
            }
        }
    }
}

/// What a provider knows about the turn it is asked to play.
#[derive(Debug, Clone, Getters)]
pub struct TurnContext {
    /// Position to move from.
    position: Position,
    /// Side to move.
    side: Side,
    /// Legal moves in coordinate notation.
    legal_moves: Vec<String>,
}

impl TurnContext {
    /// Creates a turn context.
    pub fn new(position: Position, side: Side, legal_moves: Vec<String>) -> Self {
        Self {
            position,
            side,
            legal_moves,
        }
    }
}

/// Something that proposes moves.
///
/// Providers hold no per-turn state; each call is independent.
#[async_trait::async_trait]
pub trait MoveProvider: Send + Sync {
    /// Proposes a move for the turn described by `turn`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`Failure`] instead of a partial proposal.
    async fn propose_move(
        &self,
        turn: &TurnContext,
        events: &dyn EventSink,
    ) -> Result<MoveProposal, Failure>;

    /// Display name used in logs.
    fn name(&self) -> &str;
}
