//! Provider backed by a remote text-generation API.

use super::{Credential, MoveProvider, TurnContext};
use crate::events::{EventKind, EventSink};
use crate::failure::Failure;
use crate::parser::parse_response;
use crate::providers::{GenerationParams, RemoteDescriptor};
use crate::transport::{Transport, TransportRequest};
use crate::types::{MoveProposal, Side};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const PROBE_PROMPT: &str = "Respond with 'OK' if you are working.";

/// Asks a remote model for a move and parses its answer.
#[derive(Clone)]
pub struct RemoteProvider {
    descriptor: RemoteDescriptor,
    model: String,
    credential: Credential,
    params: GenerationParams,
    timeout: Duration,
    transport: Arc<dyn Transport>,
}

impl RemoteProvider {
    /// Creates a remote provider.
    #[instrument(skip(credential, transport))]
    pub fn new(
        descriptor: RemoteDescriptor,
        model: String,
        credential: Credential,
        params: GenerationParams,
        timeout: Duration,
        transport: Arc<dyn Transport>,
    ) -> Self {
        info!("Creating remote provider");
        Self {
            descriptor,
            model,
            credential,
            params,
            timeout,
            transport,
        }
    }

    /// Builds the move prompt for `side` at the position `fen`.
    pub fn move_prompt(fen: &str, side: Side) -> String {
        format!(
            "You are playing chess. The current position in FEN is: {fen}\n\
             It is {side}'s turn to move.\n\
             Reply with your best move in UCI coordinate notation (for example \
             'e2e4', or 'a7a8q' for a promotion) and a short explanation, using \
             exactly this format:\n\
             MOVE: <uci move>\n\
             REASON: <explanation>\n"
        )
    }

    /// Sends `prompt` and returns the generated text.
    ///
    /// Requests are issued only with a credential present; an absent one
    /// fails with `NoCredential` before anything is sent.
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, Failure> {
        if self.credential.is_empty() {
            return Err(Failure::no_credential(&self.model));
        }
        if self.descriptor.endpoint().trim().is_empty() {
            return Err(Failure::provider_unconfigured(format!(
                "API endpoint not configured for {}",
                self.model
            )));
        }

        let flavor = *self.descriptor.flavor();
        let request = TransportRequest::new(
            self.descriptor.endpoint().clone(),
            flavor.headers(&self.credential),
            flavor.request_body(&self.model, prompt, params),
        );

        debug!(%flavor, "Sending request to provider");
        let response = tokio::time::timeout(self.timeout, self.transport.send(request))
            .await
            .map_err(|_| {
                warn!(timeout = ?self.timeout, "Provider request timed out");
                Failure::transport(format!(
                    "request to {} timed out after {:?}",
                    self.model, self.timeout
                ))
            })?
            .map_err(|e| Failure::transport(e.message))?;

        if !response.is_success() {
            error!(status = response.status(), "Provider returned error status");
            return Err(Failure::http(*response.status(), response.body()));
        }

        let envelope: serde_json::Value = serde_json::from_str(response.body()).map_err(|e| {
            error!(error = %e, "Provider response is not JSON");
            Failure::unparsable("unexpected response structure")
        })?;

        flavor.extract_text(&envelope).ok_or_else(|| {
            error!(response = %envelope, "No text in provider response");
            Failure::unparsable("unexpected response structure")
        })
    }

    /// Checks the credential with a minimal prompt that should be
    /// answered with `OK`.
    ///
    /// # Errors
    ///
    /// Returns the transport, HTTP or envelope failure, or an
    /// `UnparsableResponse` failure when the answer does not contain `OK`.
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn probe(&self) -> Result<(), Failure> {
        let text = self.complete(PROBE_PROMPT, &GenerationParams::probe()).await?;
        if text.to_uppercase().contains("OK") {
            info!("Credential probe succeeded");
            Ok(())
        } else {
            warn!(reply = %text, "Credential probe got an unexpected reply");
            Err(Failure::unparsable(format!(
                "credential probe did not answer OK: {text}"
            )))
        }
    }
}

impl std::fmt::Debug for RemoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProvider")
            .field("descriptor", &self.descriptor)
            .field("model", &self.model)
            .field("credential", &self.credential)
            .field("params", &self.params)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl MoveProvider for RemoteProvider {
    #[instrument(skip(self, turn, events), fields(model = %self.model, side = %turn.side()))]
    async fn propose_move(
        &self,
        turn: &TurnContext,
        events: &dyn EventSink,
    ) -> Result<MoveProposal, Failure> {
        let prompt = Self::move_prompt(turn.position().as_fen(), *turn.side());
        let text = self.complete(&prompt, &self.params).await?;

        events.record(EventKind::RawResponse {
            side: *turn.side(),
            text: text.clone(),
        });

        let proposal = parse_response(&text)?;
        info!(uci = %proposal.uci(), "Remote provider proposed move");
        Ok(proposal)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
