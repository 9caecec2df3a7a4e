use thiserror::Error;

/// Top-level error type for the `doorwatch-api` crate.
///
/// Covers every failure mode of the wire layer: connecting, framing,
/// parsing, and sending. `Clone` so one connect outcome can be handed to
/// every caller waiting on the same attempt. `doorwatch-core` maps these
/// into user-facing errors.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// WebSocket handshake or stream failure.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// The peer closed the connection.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// An outbound frame could not be written.
    #[error("Failed to send frame: {0}")]
    Send(String),

    /// Operation requires an open connection.
    #[error("Transport is not connected")]
    NotConnected,

    /// `disconnect()` was called while the attempt was in flight.
    #[error("Transport was disconnected")]
    Disconnected,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON (de)serialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } | Self::Send(_)
        )
    }

    pub(crate) fn deserialization(err: &serde_json::Error, body: &str) -> Self {
        Self::Deserialization {
            message: err.to_string(),
            body: body.to_owned(),
        }
    }
}
