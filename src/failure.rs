//! Classified turn failures.
//!
//! Every failure is terminal for the session that produced it; nothing
//! here is retried or replaced by a fallback move.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// What went wrong while obtaining or applying a move.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A remote provider has no credential.
    #[strum(serialize = "no credential")]
    NoCredential,
    /// The provider could not be resolved to a usable endpoint.
    #[strum(serialize = "provider unconfigured")]
    ProviderUnconfigured,
    /// The request never produced an HTTP response.
    #[strum(serialize = "transport error")]
    TransportError,
    /// The provider answered with a non-success status.
    #[strum(serialize = "HTTP error")]
    HttpError,
    /// No move could be extracted from the provider output.
    #[strum(serialize = "unparsable response")]
    UnparsableResponse,
    /// The rules engine rejected the proposed move.
    #[strum(serialize = "illegal move")]
    IllegalMove,
    /// The position had no legal move to choose from.
    #[strum(serialize = "no legal moves")]
    NoLegalMoves,
}

/// A classified failure with enough detail to render a log line.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, Getters, Serialize, Deserialize)]
#[display("{kind}: {detail}")]
pub struct Failure {
    /// Failure classification.
    kind: FailureKind,
    /// Human-readable detail (status code, raw text, offending move...).
    detail: String,
}

impl Failure {
    /// Creates a new failure.
    #[instrument(skip(detail))]
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        warn!(%kind, detail = %detail, "Turn failure classified");
        Self { kind, detail }
    }

    /// Missing credential for `model`.
    pub fn no_credential(model: &str) -> Self {
        Self::new(
            FailureKind::NoCredential,
            format!("API key is required for {model}"),
        )
    }

    /// The provider could not be configured.
    pub fn provider_unconfigured(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::ProviderUnconfigured, detail)
    }

    /// Network-level failure.
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::TransportError, detail)
    }

    /// Non-success HTTP status with the provider's error body.
    pub fn http(status: u16, body: &str) -> Self {
        Self::new(FailureKind::HttpError, format!("HTTP {status}: {body}"))
    }

    /// Provider output that did not yield a move.
    pub fn unparsable(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::UnparsableResponse, detail)
    }

    /// The rules engine refused `uci`.
    pub fn illegal_move(uci: &str) -> Self {
        Self::new(FailureKind::IllegalMove, uci)
    }

    /// Nothing to choose from.
    pub fn no_legal_moves() -> Self {
        Self::new(
            FailureKind::NoLegalMoves,
            "random provider found no legal moves",
        )
    }
}
