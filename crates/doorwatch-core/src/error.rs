// ── Core error types ──
//
// User-facing errors from doorwatch-core. Consumers never see raw frame
// bodies or socket errors; the `From<doorwatch_api::Error>` impl maps
// wire-layer failures into these variants.

use thiserror::Error;

use crate::convert::ConversionError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to event source: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Event source closed the connection (code {code}): {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Transport was disconnected")]
    Disconnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed message: {message}")]
    Protocol { message: String },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    // ── Persistence errors ───────────────────────────────────────────
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<doorwatch_api::Error> for CoreError {
    fn from(err: doorwatch_api::Error) -> Self {
        match err {
            doorwatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid event source URL: {e}"),
            },
            doorwatch_api::Error::WebSocketConnect(reason) | doorwatch_api::Error::Send(reason) => {
                CoreError::ConnectionFailed { reason }
            }
            doorwatch_api::Error::WebSocketClosed { code, reason } => {
                CoreError::ConnectionClosed { code, reason }
            }
            doorwatch_api::Error::NotConnected => CoreError::NotConnected,
            doorwatch_api::Error::Disconnected => CoreError::Disconnected,
            doorwatch_api::Error::Deserialization { message, .. } => {
                CoreError::Protocol { message }
            }
        }
    }
}
