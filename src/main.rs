//! Chess Duel - Unified CLI
//!
//! Plays one AI-vs-AI game, or probes a model's credential.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use chess_duel::{
    ArenaConfig, ChannelSink, ChessRules, GameEvent, HttpTransport, ProviderConfig,
    RulesEngine, SessionController, SessionSettings, Side, TracingSink, shared_credential,
};
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            white,
            black,
            api_key,
            json,
        } => run_play(config, white, black, api_key, json).await,
        Command::Verify {
            model,
            endpoint,
            api_key,
            timeout_secs,
        } => run_verify(model, endpoint, api_key, timeout_secs).await,
    }
}

/// Plays one game and prints its events.
#[instrument(skip(api_key))]
async fn run_play(
    config_path: Option<PathBuf>,
    white: Option<String>,
    black: Option<String>,
    api_key: Option<String>,
    json: bool,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => ArenaConfig::from_file(path)?,
        None => ArenaConfig::default(),
    };
    if let Some(model) = white {
        config.override_model(Side::White, model);
    }
    if let Some(model) = black {
        config.override_model(Side::Black, model);
    }

    let fallback = shared_credential(api_key.as_deref());
    let white = config.seat(Side::White).to_provider_config(&fallback)?;
    let black = config.seat(Side::Black).to_provider_config(&fallback)?;

    let settings = config.session_settings();
    let transport = Arc::new(HttpTransport::new(settings.request_timeout)?);
    let (sink, events) = ChannelSink::new();
    let printer = tokio::spawn(print_events(events, json));

    let mut controller =
        SessionController::new(ChessRules::new(), transport, Arc::new(sink), settings);

    if settings.require_verified_credentials {
        verify_seats(&mut controller, [(Side::White, &white), (Side::Black, &black)]).await?;
    }

    let orchestrator = controller.start(white, black, &fallback)?;

    let handle = controller.handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; aborting game");
            handle.abort();
        }
    });

    let reason = orchestrator.run().await;
    let state = orchestrator.state();
    let fen = controller
        .rules()
        .lock()
        .map(|rules| rules.position())
        .ok();

    interrupt.abort();
    drop(orchestrator);
    drop(controller);
    printer.await.context("event printer panicked")?;

    if !json {
        println!("Result: {reason} after {} moves", state.moves_played);
        if let Some(fen) = fen {
            println!("Final position: {fen}");
        }
    }
    Ok(())
}

async fn verify_seats(
    controller: &mut SessionController<ChessRules>,
    seats: [(Side, &ProviderConfig); 2],
) -> Result<()> {
    for (side, config) in seats {
        if !config.is_remote() || controller.is_verified(config) {
            continue;
        }
        info!(%side, model = %config.model(), "Verifying credential");
        controller
            .verify_credential(config)
            .await
            .with_context(|| format!("{side} credential check failed for {}", config.model()))?;
    }
    Ok(())
}

async fn print_events(mut events: mpsc::UnboundedReceiver<GameEvent>, json: bool) {
    while let Some(event) = events.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to serialize event"),
            }
        } else {
            println!("[{}] {}", event.at().format("%H:%M:%S"), event.summary());
        }
    }
}

/// Probes a model's credential.
#[instrument(skip(api_key))]
async fn run_verify(
    model: String,
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout_secs: u64,
) -> Result<()> {
    let credential = shared_credential(api_key.as_deref());
    let config = ProviderConfig::for_model(&model, endpoint.as_deref(), credential)?;

    let timeout = Duration::from_secs(timeout_secs);
    let settings = SessionSettings::default().with_request_timeout(timeout);
    let transport = Arc::new(HttpTransport::new(timeout)?);
    let mut controller = SessionController::new(
        ChessRules::new(),
        transport,
        Arc::new(TracingSink),
        settings,
    );

    controller.verify_credential(&config).await?;
    println!("{model}: credential OK");
    Ok(())
}
