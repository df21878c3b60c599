//! Arena configuration loaded from TOML.

use crate::failure::Failure;
use crate::providers::{Credential, GenerationParams, ProviderConfig, RANDOM_MODEL};
use crate::session::SessionSettings;
use crate::types::Side;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Environment variable holding the shared credential.
pub const API_KEY_ENV: &str = "CHESS_DUEL_API_KEY";

/// One side's provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct SeatConfig {
    /// Model identifier, or `random`.
    #[serde(default = "default_model")]
    model: String,

    /// Endpoint override; `{model}` is replaced by the model identifier.
    #[serde(default)]
    endpoint: Option<String>,

    /// Environment variable holding this side's own credential.
    #[serde(default)]
    credential_env: Option<String>,
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self::new(default_model())
    }
}

impl SeatConfig {
    /// Seat playing `model` with the default endpoint.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            endpoint: None,
            credential_env: None,
        }
    }

    /// Returns this seat with `model` instead of its own.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// This seat's own credential, read from `credential_env`.
    fn own_credential(&self) -> Option<Credential> {
        let var = self.credential_env.as_deref()?;
        std::env::var(var)
            .ok()
            .map(Credential::new)
            .filter(|c| !c.is_empty())
    }

    /// Builds the provider configuration.
    ///
    /// The credential is this seat's own variable if set, otherwise
    /// `fallback`.
    ///
    /// # Errors
    ///
    /// Returns a `ProviderUnconfigured` failure for unknown models.
    #[instrument(skip(self, fallback), fields(model = %self.model))]
    pub fn to_provider_config(&self, fallback: &Credential) -> Result<ProviderConfig, Failure> {
        let credential = self.own_credential().unwrap_or_else(|| fallback.clone());
        ProviderConfig::for_model(&self.model, self.endpoint.as_deref(), credential)
    }
}

#[instrument]
fn default_model() -> String {
    RANDOM_MODEL.to_string()
}

/// Delays and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay before the first turn, in milliseconds.
    startup_delay_ms: u64,
    /// Delay between turns, in milliseconds.
    turn_delay_ms: u64,
    /// Random mover think time, in milliseconds.
    random_think_ms: u64,
    /// Remote request timeout, in seconds.
    request_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: 500,
            turn_delay_ms: 500,
            random_think_ms: 500,
            request_timeout_secs: 30,
        }
    }
}

/// Everything needed to set up a match.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// White's seat.
    #[serde(default)]
    white: SeatConfig,

    /// Black's seat.
    #[serde(default)]
    black: SeatConfig,

    /// Delays and timeouts.
    #[serde(default)]
    timing: TimingConfig,

    /// Remote generation parameters.
    #[serde(default)]
    generation: GenerationParams,

    /// Require a successful probe before remote providers may play.
    #[serde(default = "default_require_verified")]
    require_verified_credentials: bool,
}

#[instrument]
fn default_require_verified() -> bool {
    true
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            white: SeatConfig::default(),
            black: SeatConfig::default(),
            timing: TimingConfig::default(),
            generation: GenerationParams::default(),
            require_verified_credentials: default_require_verified(),
        }
    }
}

impl ArenaConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {e}")))?;
        let config = Self::from_toml(&content)?;
        info!(white = %config.white.model, black = %config.black.model, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::new(format!("Failed to parse config: {e}")))
    }

    /// Seat for `side`.
    pub fn seat(&self, side: Side) -> &SeatConfig {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// Replaces the model of `side`.
    pub fn override_model(&mut self, side: Side, model: impl Into<String>) {
        let seat = match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        };
        *seat = std::mem::take(seat).with_model(model);
    }

    /// Session settings described by this configuration.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            startup_delay: Duration::from_millis(self.timing.startup_delay_ms),
            turn_delay: Duration::from_millis(self.timing.turn_delay_ms),
            random_think_time: Duration::from_millis(self.timing.random_think_ms),
            request_timeout: Duration::from_secs(self.timing.request_timeout_secs),
            generation: self.generation,
            require_verified_credentials: self.require_verified_credentials,
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a configuration error at the caller's location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Resolves the shared credential: the explicit value if non-empty,
/// otherwise [`API_KEY_ENV`].
#[instrument(skip(explicit))]
pub fn shared_credential(explicit: Option<&str>) -> Credential {
    explicit
        .map(Credential::new)
        .filter(|c| !c.is_empty())
        .or_else(|| std::env::var(API_KEY_ENV).ok().map(Credential::new))
        .unwrap_or_default()
}
