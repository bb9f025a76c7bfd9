//! Market (public) stream wrapper
//!
//! One `MarketStream` per chain covers every public feed; individual symbols
//! and feed kinds are multiplexed over the single connection as stream
//! identifiers like `ethusdc@depth`.

use std::sync::Arc;

use crate::endpoints::{ChainId, GatewayEndpoints};
use crate::error::StreamError;
use crate::stream::client::{HandlerId, Phase, StreamClient, StreamClientConfig};
use crate::stream::transport::{Transport, WsTransport};
use crate::types::{GatewayEvent, StreamId, StreamType};

/// Public market data stream for one chain
pub struct MarketStream {
    chain: ChainId,
    client: StreamClient,
}

impl MarketStream {
    /// Stream against the default gateway for `chain`
    pub fn new(chain: ChainId) -> Result<Self, StreamError> {
        Self::with_endpoints(&GatewayEndpoints::new(), chain)
    }

    /// Stream against a custom resolver (staging, tests)
    pub fn with_endpoints(endpoints: &GatewayEndpoints, chain: ChainId) -> Result<Self, StreamError> {
        Self::with_transport(endpoints, chain, Arc::new(WsTransport))
    }

    pub fn with_transport(
        endpoints: &GatewayEndpoints,
        chain: ChainId,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, StreamError> {
        let url = endpoints.market_url(chain)?;
        let client = StreamClient::new(StreamClientConfig::new(url), transport);
        Ok(Self { chain, client })
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn connect(&self) {
        self.client.connect();
    }

    pub fn disconnect(&self) {
        self.client.disconnect();
    }

    pub fn phase(&self) -> Phase {
        self.client.phase()
    }

    /// Subscribe to the order book diff feed for a symbol
    pub fn subscribe_depth(&self, symbol: &str) -> StreamId {
        self.subscribe(symbol, &StreamType::Depth)
    }

    /// Subscribe to the executed-trades feed for a symbol
    pub fn subscribe_trades(&self, symbol: &str) -> StreamId {
        self.subscribe(symbol, &StreamType::Trade)
    }

    /// Subscribe to candlesticks for a symbol at an interval (`1m`, `5m`, ...)
    pub fn subscribe_kline(&self, symbol: &str, interval: &str) -> StreamId {
        self.subscribe(symbol, &StreamType::Kline(interval.to_string()))
    }

    /// Subscribe to the rolling 24h mini ticker for a symbol
    pub fn subscribe_mini_ticker(&self, symbol: &str) -> StreamId {
        self.subscribe(symbol, &StreamType::MiniTicker)
    }

    fn subscribe(&self, symbol: &str, stream_type: &StreamType) -> StreamId {
        let id = StreamId::new(symbol, stream_type);
        self.client.subscribe(id.clone());
        id
    }

    pub fn unsubscribe(&self, stream: &StreamId) {
        self.client.unsubscribe(stream);
    }

    pub fn add_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.client.add_handler(handler)
    }

    pub fn remove_handler(&self, id: HandlerId) {
        self.client.remove_handler(id);
    }

    /// Access the underlying client (subscription snapshots, raw subscribe)
    pub fn client(&self) -> &StreamClient {
        &self.client
    }
}
