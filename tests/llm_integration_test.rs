//! Live tests against real model APIs. Run with `--features api`.

use chess_duel::{
    ChessRules, Credential, EventSink, HttpTransport, MemorySink, ProviderConfig,
    SessionController, SessionSettings, StepOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

fn live_controller() -> (SessionController<ChessRules>, Arc<MemorySink>) {
    let settings = SessionSettings::immediate().with_request_timeout(Duration::from_secs(60));
    let transport = Arc::new(HttpTransport::new(settings.request_timeout).expect("HTTP client"));
    let sink = Arc::new(MemorySink::new());
    let events: Arc<dyn EventSink> = sink.clone();
    (
        SessionController::new(ChessRules::new(), transport, events, settings),
        sink,
    )
}

fn live_config(model: &str, env: &str) -> ProviderConfig {
    dotenvy::dotenv().ok();
    let key = std::env::var(env).unwrap_or_else(|_| panic!("{env} not set"));
    ProviderConfig::for_model(model, None, Credential::new(key)).expect("known model")
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_gemini_credential_probe() {
    let (mut controller, _events) = live_controller();
    let config = live_config("gemini-1.5-flash", "GEMINI_API_KEY");

    controller
        .verify_credential(&config)
        .await
        .expect("Gemini probe failed");
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_anthropic_plays_one_move() {
    let (mut controller, events) = live_controller();
    let config = live_config("claude-3-5-haiku-20241022", "ANTHROPIC_API_KEY");

    let orchestrator = controller
        .start(config, ProviderConfig::random(), &Credential::default())
        .expect("start failed");
    let outcome = orchestrator.step().await;

    for event in events.events() {
        eprintln!("{}", event.summary());
    }
    assert!(matches!(outcome, StepOutcome::Resolved(_)), "got {outcome:?}");
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_openai_plays_one_move() {
    let (mut controller, events) = live_controller();
    let config = live_config("gpt-4o-mini", "OPENAI_API_KEY");

    let orchestrator = controller
        .start(config, ProviderConfig::random(), &Credential::default())
        .expect("start failed");
    let outcome = orchestrator.step().await;

    for event in events.events() {
        eprintln!("{}", event.summary());
    }
    assert!(matches!(outcome, StepOutcome::Resolved(_)), "got {outcome:?}");
}
