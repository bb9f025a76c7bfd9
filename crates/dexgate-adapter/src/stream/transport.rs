//! Transport seam between the reconnecting client and the wire
//!
//! The client owns exactly one transport pair at a time and replaces it on
//! every reconnect. Production code dials with tokio-tungstenite; tests
//! substitute a channel-backed mock so the full connect/replay/close state
//! machine runs without a network.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;
use url::Url;

use crate::error::StreamError;

pub type WsSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;
pub type WsStreamRx = Pin<Box<dyn Stream<Item = Result<Message, WsError>> + Send>>;

/// One live connection: outbound sink + inbound stream
pub struct TransportPair {
    pub sink: WsSink,
    pub stream: WsStreamRx,
}

/// Dialer abstraction over the underlying socket
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<TransportPair, StreamError>;
}

/// Production transport over tokio-tungstenite
#[derive(Debug, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &Url) -> Result<TransportPair, StreamError> {
        let (ws_stream, response) = connect_async(url.as_str()).await?;
        debug!(status = %response.status(), "websocket connected");
        let (sink, stream) = ws_stream.split();
        Ok(TransportPair { sink: Box::pin(sink), stream: Box::pin(stream) })
    }
}
