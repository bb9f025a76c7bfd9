//! Error types for the Dexgate stream adapter

use thiserror::Error;

/// Errors surfaced by endpoint resolution and the stream transport.
///
/// Note that the reconnecting client absorbs transport and payload errors
/// internally (logging them and driving the reconnect path); these variants
/// reach callers only from constructors and the transport seam.
#[derive(Debug, Error)]
pub enum StreamError {
    /// No gateway is configured for the requested chain
    #[error("unsupported chain id: {0}")]
    UnsupportedChain(u64),

    /// Wallet address failed validation
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    /// Gateway URL could not be constructed
    #[error("invalid gateway url: {0}")]
    Url(#[from] url::ParseError),

    /// Underlying WebSocket transport failure
    #[error("websocket transport: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Inbound payload was not a JSON object
    #[error("malformed gateway payload: {0}")]
    Payload(String),
}
