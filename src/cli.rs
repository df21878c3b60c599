//! Command-line interface for chess_duel.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chess Duel - pit random and LLM move providers against each other
#[derive(Parser, Debug)]
#[command(name = "chess_duel")]
#[command(about = "Turn orchestrator for AI-vs-AI chess matches", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play one game to the end
    Play {
        /// Path to an arena config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Model for White (`random` or a model identifier)
        #[arg(long)]
        white: Option<String>,

        /// Model for Black (`random` or a model identifier)
        #[arg(long)]
        black: Option<String>,

        /// Shared API key for remote models
        #[arg(long, env = "CHESS_DUEL_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Check that a model answers with the given credential
    Verify {
        /// Model identifier
        model: String,

        /// Endpoint override (`{model}` is substituted)
        #[arg(long)]
        endpoint: Option<String>,

        /// API key to test
        #[arg(long, env = "CHESS_DUEL_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout_secs: u64,
    },
}
