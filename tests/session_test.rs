//! Tests for session start, credential verification and restart.

mod common;

use chess_duel::{
    ChessRules, ConfigurationError, Credential, EventKind, FailureKind, HaltReason, MoveApplier,
    MoveProposal, ProviderConfig, RejectReason, RulesEngine, SessionStatus, SessionTicket,
    SharedState, Side, StepOutcome, TransportResponse, TurnOutcome,
};
use common::{ScriptedTransport, controller, gemini_config, gemini_reply, immediate};
use std::sync::{Arc, Mutex};

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[test]
fn test_remote_without_credential_is_rejected() {
    let transport = ScriptedTransport::new();
    let (mut controller, events) = controller(transport.clone(), immediate());

    let err = controller
        .start(gemini_config(""), ProviderConfig::random(), &Credential::default())
        .unwrap_err();

    assert_eq!(err.failure_kind(), Some(FailureKind::NoCredential));
    assert!(matches!(err, ConfigurationError::Rejected { side: Side::White, .. }));
    assert_eq!(transport.calls(), 0);
    assert_eq!(controller.state().status, SessionStatus::Idle);
    assert!(events.kinds().is_empty());
}

#[test]
fn test_black_without_credential_is_rejected() {
    let (mut controller, _events) = controller(ScriptedTransport::new(), immediate());

    let err = controller
        .start(ProviderConfig::random(), gemini_config(""), &Credential::default())
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::Rejected { side: Side::Black, .. }));
}

#[test]
fn test_shared_credential_fills_missing_seat_credential() {
    let (mut controller, events) = controller(ScriptedTransport::new(), immediate());

    controller
        .start(gemini_config(""), ProviderConfig::random(), &Credential::new("shared"))
        .expect("shared credential is enough");

    assert_eq!(controller.state().status, SessionStatus::Running);
    assert_eq!(
        events.kinds(),
        vec![EventKind::SessionStarted {
            white: common::GEMINI_MODEL.to_string(),
            black: "Random".to_string(),
        }]
    );
}

#[test]
fn test_empty_endpoint_is_unconfigured() {
    let (mut controller, _events) = controller(ScriptedTransport::new(), immediate());
    let config =
        ProviderConfig::for_model(common::GEMINI_MODEL, Some("  "), Credential::new("k")).unwrap();

    let err = controller
        .start(config, ProviderConfig::random(), &Credential::default())
        .unwrap_err();
    assert_eq!(err.failure_kind(), Some(FailureKind::ProviderUnconfigured));
}

#[test]
fn test_unknown_model_is_unconfigured() {
    let failure = ProviderConfig::for_model("llama-3-70b", None, Credential::new("k")).unwrap_err();
    assert_eq!(*failure.kind(), FailureKind::ProviderUnconfigured);

    let random = ProviderConfig::for_model("RANDOM", None, Credential::default()).unwrap();
    assert!(!random.is_remote());
}

#[tokio::test]
async fn test_unverified_credential_blocks_start_until_probed() {
    let transport = ScriptedTransport::with_replies([gemini_reply("OK")]);
    let settings = immediate().with_require_verified_credentials(true);
    let (mut controller, _events) = controller(transport.clone(), settings);
    let config = gemini_config("k");

    let err = controller
        .start(config.clone(), ProviderConfig::random(), &Credential::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::UnverifiedCredential { side: Side::White, .. }
    ));
    assert_eq!(transport.calls(), 0);

    controller.verify_credential(&config).await.expect("probe passes");
    assert!(controller.is_verified(&config));
    controller
        .start(config, ProviderConfig::random(), &Credential::default())
        .expect("verified credential starts");
}

#[tokio::test]
async fn test_changing_credential_requires_new_probe() {
    let transport = ScriptedTransport::with_replies([gemini_reply("OK")]);
    let (mut controller, _events) =
        controller(transport, immediate().with_require_verified_credentials(true));

    controller.verify_credential(&gemini_config("first")).await.unwrap();

    assert!(controller.is_verified(&gemini_config("first")));
    assert!(!controller.is_verified(&gemini_config("second")));
    assert!(controller.is_verified(&ProviderConfig::random()));
}

#[tokio::test]
async fn test_failed_probe_is_not_remembered() {
    let transport = ScriptedTransport::with_replies([TransportResponse::new(403, "forbidden")]);
    let (mut controller, _events) = controller(transport, immediate());
    let config = gemini_config("k");

    let failure = controller.verify_credential(&config).await.unwrap_err();
    assert_eq!(*failure.kind(), FailureKind::HttpError);
    assert!(!controller.is_verified(&config));
}

#[tokio::test]
async fn test_probe_without_credential_sends_nothing() {
    let transport = ScriptedTransport::new();
    let (mut controller, _events) = controller(transport.clone(), immediate());

    let failure = controller.verify_credential(&gemini_config("")).await.unwrap_err();
    assert_eq!(*failure.kind(), FailureKind::NoCredential);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_start_while_running_is_refused() {
    let (mut controller, _events) = controller(ScriptedTransport::new(), immediate());
    controller
        .start(ProviderConfig::random(), ProviderConfig::random(), &Credential::default())
        .unwrap();

    let err = controller
        .start(ProviderConfig::random(), ProviderConfig::random(), &Credential::default())
        .unwrap_err();
    assert_eq!(err, ConfigurationError::AlreadyRunning);
}

#[tokio::test]
async fn test_restart_resets_position_and_state() {
    let (mut controller, _events) = controller(ScriptedTransport::new(), immediate());
    let first = controller
        .start(ProviderConfig::random(), ProviderConfig::random(), &Credential::default())
        .unwrap();

    assert!(matches!(
        first.step().await,
        StepOutcome::Resolved(TurnOutcome::Applied(_))
    ));
    assert_ne!(controller.rules().lock().unwrap().position().as_fen(), START_FEN);
    assert!(controller.abort());

    let second = controller
        .start(ProviderConfig::random(), ProviderConfig::random(), &Credential::default())
        .unwrap();

    assert_eq!(second.generation(), first.generation() + 1);
    assert_eq!(controller.rules().lock().unwrap().position().as_fen(), START_FEN);
    let state = controller.state();
    assert_eq!(state.status, SessionStatus::Running);
    assert_eq!(state.active_side, Some(Side::White));
    assert_eq!(state.moves_played, 0);
    assert!(!state.in_flight);

    assert_eq!(
        first.step().await,
        StepOutcome::Rejected(RejectReason::NotRunning)
    );
}

#[test]
fn test_halted_session_cannot_commit() {
    let rules = Arc::new(Mutex::new(ChessRules::new()));
    let applier = MoveApplier::new(Arc::clone(&rules));
    let state = SharedState::new();
    let ticket = SessionTicket::new(state.clone(), state.begin_session());
    let proposal = MoveProposal::new("e2e4".to_string(), "center".to_string());

    assert!(state.abort());
    assert_eq!(applier.apply(&proposal, Side::White, &ticket), Ok(None));
    assert_eq!(rules.lock().unwrap().position().as_fen(), START_FEN);

    let fresh = SessionTicket::new(state.clone(), state.begin_session());
    assert_eq!(applier.apply(&proposal, Side::White, &ticket), Ok(None));
    let applied = applier
        .apply(&proposal, Side::White, &fresh)
        .unwrap()
        .expect("live session commits");
    assert_eq!(applied.notation(), "e4");
}

#[test]
fn test_abort_targets_current_session_only() {
    let state = SharedState::new();
    assert!(!state.abort(), "nothing running yet");

    let first = state.begin_session();
    let second = state.begin_session();
    assert!(!state.halt(first, HaltReason::Aborted));
    assert!(!state.record_move(first, Side::Black));
    assert_eq!(state.snapshot().status, SessionStatus::Running);

    assert!(state.abort());
    let snapshot = state.snapshot();
    assert_eq!(snapshot.generation, second);
    assert_eq!(snapshot.halt_reason, Some(HaltReason::Aborted));
    assert!(!state.abort());
}
