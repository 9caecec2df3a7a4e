//! CLI error types with miette diagnostics.
//!
//! Maps core and config failures into user-facing errors with actionable
//! help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use doorwatch_config::ConfigError;
use doorwatch_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to event source at {url}")]
    #[diagnostic(
        code(doorwatch::connection_failed),
        help(
            "Check that the event source is running and reachable.\n\
             URL: {url}\n\
             Try the simulator instead: doorwatch --simulate watch"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Connection to the event source was lost: {reason}")]
    #[diagnostic(code(doorwatch::connection_lost))]
    ConnectionLost { reason: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(doorwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Could not load configuration: {message}")]
    #[diagnostic(
        code(doorwatch::config),
        help(
            "Check the file for TOML errors and the DOORWATCH_* environment.\n\
             Recreate it with: doorwatch config init --force"
        )
    )]
    Config { message: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(doorwatch::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error("Could not persist preferences: {message}")]
    #[diagnostic(code(doorwatch::persistence))]
    Persistence { message: String },

    // ── Protocol ─────────────────────────────────────────────────────

    #[error("Protocol error: {message}")]
    #[diagnostic(code(doorwatch::protocol))]
    Protocol { message: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not encode output: {0}")]
    #[diagnostic(code(doorwatch::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not encode configuration: {0}")]
    #[diagnostic(code(doorwatch::toml))]
    Toml(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::ConnectionLost { .. } => exit_code::CONNECTION,
            Self::Validation { .. } | Self::ConfigExists { .. } => exit_code::USAGE,
            Self::Config { .. } => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed {
                url: "(event source)".into(),
                reason,
            },
            CoreError::ConnectionClosed { code, reason } => CliError::ConnectionLost {
                reason: format!("closed with code {code}: {reason}"),
            },
            CoreError::NotConnected => CliError::ConnectionLost {
                reason: "not connected".into(),
            },
            CoreError::Disconnected => CliError::ConnectionLost {
                reason: "disconnected before the connection completed".into(),
            },
            CoreError::Protocol { message } => CliError::Protocol { message },
            CoreError::Conversion(e) => CliError::Protocol {
                message: e.to_string(),
            },
            CoreError::Persistence { message } => CliError::Persistence { message },
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Serialization(e) => CliError::Toml(e.to_string()),
            ConfigError::Figment(e) => CliError::Config {
                message: e.to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
