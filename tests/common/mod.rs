//! In-memory transports and helpers shared by integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chess_duel::{
    ChessRules, Credential, EngineMove, EventSink, MemorySink, MoveRejected, Position,
    ProviderConfig, RulesEngine, SessionController, SessionHandle, SessionSettings, Side,
    TerminalReason, Transport, TransportError, TransportRequest, TransportResponse,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Returns queued responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Transport that answers every call from `replies`, in order.
    pub fn with_replies(replies: impl IntoIterator<Item = TransportResponse>) -> Arc<Self> {
        let transport = Self::default();
        transport
            .responses
            .lock()
            .unwrap()
            .extend(replies.into_iter().map(Ok));
        Arc::new(transport)
    }

    pub fn push(&self, response: Result<TransportResponse, TransportError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("no scripted response left")))
    }
}

/// Holds every call until the test releases it.
pub struct GatedTransport {
    entered: Notify,
    release: Notify,
    reply: TransportResponse,
    calls: AtomicUsize,
}

impl GatedTransport {
    pub fn new(reply: TransportResponse) -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Notify::new(),
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    /// Waits until a call is parked inside the transport.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Lets one parked call complete.
    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.reply.clone())
    }
}

/// Never answers.
pub struct SilentTransport;

#[async_trait]
impl Transport for SilentTransport {
    async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, TransportError> {
        std::future::pending().await
    }
}

/// Standard chess that counts `terminal` checks and can abort the session
/// right after the next committed move.
#[derive(Default)]
pub struct TrackedRules {
    inner: ChessRules,
    terminal_checks: Arc<AtomicUsize>,
    abort_after_commit: Arc<Mutex<Option<SessionHandle>>>,
}

impl TrackedRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminal_checks(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.terminal_checks)
    }

    /// Slot for a handle that is aborted once the next move commits.
    pub fn abort_after_commit(&self) -> Arc<Mutex<Option<SessionHandle>>> {
        Arc::clone(&self.abort_after_commit)
    }
}

impl RulesEngine for TrackedRules {
    fn position(&self) -> Position {
        self.inner.position()
    }

    fn side_to_move(&self) -> Side {
        self.inner.side_to_move()
    }

    fn legal_moves(&self) -> Vec<String> {
        self.inner.legal_moves()
    }

    fn apply_move(&mut self, candidate: &str) -> Result<EngineMove, MoveRejected> {
        let accepted = self.inner.apply_move(candidate)?;
        if let Some(handle) = self.abort_after_commit.lock().unwrap().take() {
            handle.abort();
        }
        Ok(accepted)
    }

    fn terminal(&self) -> Option<TerminalReason> {
        self.terminal_checks.fetch_add(1, Ordering::SeqCst);
        self.inner.terminal()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

pub const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// 200 response in the Gemini envelope carrying `text`.
pub fn gemini_reply(text: &str) -> TransportResponse {
    let body = json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    });
    TransportResponse::new(200, body.to_string())
}

/// 200 response in the chat-completions envelope carrying `text`.
pub fn openai_reply(text: &str) -> TransportResponse {
    let body = json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    });
    TransportResponse::new(200, body.to_string())
}

/// 200 response in the messages envelope carrying `text`.
pub fn anthropic_reply(text: &str) -> TransportResponse {
    let body = json!({
        "content": [{ "type": "text", "text": text }]
    });
    TransportResponse::new(200, body.to_string())
}

/// Move reply in the two-line format.
pub fn move_reply(uci: &str) -> TransportResponse {
    gemini_reply(&format!("MOVE: {uci}\nREASON: scripted"))
}

pub fn gemini_config(secret: &str) -> ProviderConfig {
    ProviderConfig::for_model(GEMINI_MODEL, None, Credential::new(secret))
        .expect("gemini models resolve")
}

/// Controller over standard chess and `transport`, logging into a memory sink.
pub fn controller(
    transport: Arc<dyn Transport>,
    settings: SessionSettings,
) -> (SessionController<ChessRules>, Arc<MemorySink>) {
    controller_over(ChessRules::new(), transport, settings)
}

/// Same as [`controller`] with a caller-supplied rules engine.
pub fn controller_over<R: RulesEngine>(
    rules: R,
    transport: Arc<dyn Transport>,
    settings: SessionSettings,
) -> (SessionController<R>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let events: Arc<dyn EventSink> = sink.clone();
    let controller = SessionController::new(rules, transport, events, settings);
    (controller, sink)
}

pub fn immediate() -> SessionSettings {
    SessionSettings::immediate().with_request_timeout(Duration::from_secs(5))
}
