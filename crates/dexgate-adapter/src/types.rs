//! Protocol types for the Dexgate stream gateway
//!
//! # Design Principles
//! 1. All price/quantity fields use String to preserve precision
//! 2. Unknown event types fall back to `GatewayEvent::Unknown { raw }` - never panic
//! 3. Known events with unrecognized fields use `#[serde(flatten)] extra` to preserve data
//! 4. Outbound requests carry a process-wide monotonically increasing id so the
//!    gateway can correlate replies (this client itself is fire-and-forget)

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StreamError;

/// Shared outbound request id counter, one sequence across all client instances
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Next outbound request id
pub fn next_request_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Stream identifiers
// ============================================================================

/// Kind of subscribable market feed; serializes to the wire suffix of a
/// stream identifier (`depth`, `trade`, `kline_<interval>`, `miniTicker`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamType {
    Depth,
    Trade,
    /// Candlestick feed with an interval such as `1m`, `5m`, `1h`
    Kline(String),
    MiniTicker,
}

impl StreamType {
    pub fn suffix(&self) -> String {
        match self {
            StreamType::Depth => "depth".to_string(),
            StreamType::Trade => "trade".to_string(),
            StreamType::Kline(interval) => format!("kline_{interval}"),
            StreamType::MiniTicker => "miniTicker".to_string(),
        }
    }
}

/// Composite key `<symbol>@<suffix>` identifying one subscribable feed.
///
/// The symbol is lower-cased at construction; the key is immutable afterwards
/// and is what the subscription set stores and the wire protocol carries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(symbol: &str, stream_type: &StreamType) -> Self {
        Self(format!("{}@{}", symbol.to_lowercase(), stream_type.suffix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<StreamId> for String {
    fn from(id: StreamId) -> Self {
        id.0
    }
}

// ============================================================================
// Outbound requests
// ============================================================================

/// Gateway request verbs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WsMethod {
    Subscribe,
    Unsubscribe,
    ListSubscriptions,
    Ping,
}

/// Outbound request frame, sent as JSON text over the open transport:
/// `{ "method": ..., "params": [...], "id": n }`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WsRequest {
    pub method: WsMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
    pub id: u64,
}

impl WsRequest {
    pub fn subscribe(streams: Vec<String>, id: u64) -> Self {
        Self { method: WsMethod::Subscribe, params: Some(streams), id }
    }

    pub fn unsubscribe(streams: Vec<String>, id: u64) -> Self {
        Self { method: WsMethod::Unsubscribe, params: Some(streams), id }
    }

    pub fn list_subscriptions(id: u64) -> Self {
        Self { method: WsMethod::ListSubscriptions, params: None, id }
    }

    pub fn ping(id: u64) -> Self {
        Self { method: WsMethod::Ping, params: None, id }
    }
}

// ============================================================================
// Inbound events (from the gateway)
// ============================================================================

/// Inbound gateway event - parsed with fallback to Unknown
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GatewayEvent {
    /// Market data event (public streams)
    Market(MarketEvent),
    /// Account-scoped event (user stream)
    User(UserEvent),
    /// Valid JSON object with an unrecognized or missing `e` discriminant
    Unknown(UnknownEvent),
}

/// Unknown event container - preserves raw JSON. Transparent, so the event
/// serializes back to exactly the wire payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnknownEvent {
    pub raw: Value,
}

/// Market data events, discriminated by the `e` field
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "e")]
pub enum MarketEvent {
    #[serde(rename = "depthUpdate")]
    DepthUpdate(DepthUpdate),
    #[serde(rename = "trade")]
    Trade(TradeEvent),
    #[serde(rename = "kline")]
    Kline(KlineEvent),
    /// The gateway emits both spellings depending on stream vintage
    #[serde(rename = "miniTicker", alias = "24hrMiniTicker")]
    MiniTicker(MiniTickerEvent),
}

/// User stream events, discriminated by the `e` field
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "e")]
pub enum UserEvent {
    #[serde(rename = "executionReport")]
    ExecutionReport(ExecutionReport),
    #[serde(rename = "balanceUpdate")]
    BalanceUpdate(BalanceUpdate),
}

/// One price level: `[price, quantity]` as strings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceLevel(pub String, pub String);

impl PriceLevel {
    pub fn price(&self) -> &str {
        &self.0
    }

    pub fn quantity(&self) -> &str {
        &self.1
    }
}

/// Incremental order book update
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepthUpdate {
    /// Event time (unix ms)
    #[serde(rename = "E")]
    pub event_time: i64,
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// First update id in this diff
    #[serde(rename = "U")]
    pub first_update_id: i64,
    /// Final update id in this diff
    #[serde(rename = "u")]
    pub final_update_id: i64,
    /// Bid levels changed
    #[serde(rename = "b", default)]
    pub bids: Vec<PriceLevel>,
    /// Ask levels changed
    #[serde(rename = "a", default)]
    pub asks: Vec<PriceLevel>,
    /// Extra fields for forward compatibility
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Single executed trade
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Event time (unix ms)
    #[serde(rename = "E")]
    pub event_time: i64,
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// Trade id
    #[serde(rename = "t")]
    pub trade_id: i64,
    /// Price
    #[serde(rename = "p")]
    pub price: String,
    /// Quantity
    #[serde(rename = "q")]
    pub quantity: String,
    /// Trade time (unix ms)
    #[serde(rename = "T")]
    pub trade_time: i64,
    /// Whether the buyer was the maker
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
    /// Extra fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Candlestick payload nested under `k`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KlineData {
    /// Open time (unix ms)
    #[serde(rename = "t")]
    pub open_time: i64,
    /// Close time (unix ms)
    #[serde(rename = "T")]
    pub close_time: i64,
    /// Interval (`1m`, `5m`, ...)
    #[serde(rename = "i")]
    pub interval: String,
    /// Open price
    #[serde(rename = "o")]
    pub open: String,
    /// High price
    #[serde(rename = "h")]
    pub high: String,
    /// Low price
    #[serde(rename = "l")]
    pub low: String,
    /// Close price
    #[serde(rename = "c")]
    pub close: String,
    /// Base asset volume
    #[serde(rename = "v")]
    pub volume: String,
    /// Whether this candle is closed
    #[serde(rename = "x")]
    pub closed: bool,
    /// Extra fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Candlestick event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KlineEvent {
    /// Event time (unix ms)
    #[serde(rename = "E")]
    pub event_time: i64,
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// Candle payload
    #[serde(rename = "k")]
    pub kline: KlineData,
    /// Extra fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rolling 24h mini ticker
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MiniTickerEvent {
    /// Event time (unix ms)
    #[serde(rename = "E")]
    pub event_time: i64,
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// Close price
    #[serde(rename = "c")]
    pub close: String,
    /// Open price
    #[serde(rename = "o")]
    pub open: String,
    /// High price
    #[serde(rename = "h")]
    pub high: String,
    /// Low price
    #[serde(rename = "l")]
    pub low: String,
    /// Base asset volume
    #[serde(rename = "v")]
    pub volume: String,
    /// Quote asset volume
    #[serde(rename = "q")]
    pub quote_volume: String,
    /// Extra fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Order lifecycle report on the user stream
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Event time (unix ms)
    #[serde(rename = "E")]
    pub event_time: i64,
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// Client order id
    #[serde(rename = "c")]
    pub client_order_id: String,
    /// Side (BUY/SELL)
    #[serde(rename = "S")]
    pub side: String,
    /// Order quantity
    #[serde(rename = "q")]
    pub quantity: String,
    /// Order price
    #[serde(rename = "p")]
    pub price: String,
    /// Current order status (NEW, PARTIALLY_FILLED, FILLED, CANCELED, ...)
    #[serde(rename = "X")]
    pub status: String,
    /// Exchange order id
    #[serde(rename = "i")]
    pub order_id: i64,
    /// Last executed quantity
    #[serde(rename = "l")]
    pub last_filled_quantity: String,
    /// Cumulative filled quantity
    #[serde(rename = "z")]
    pub cumulative_filled_quantity: String,
    /// Transaction time (unix ms)
    #[serde(rename = "T")]
    pub transact_time: i64,
    /// Extra fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Balance delta on the user stream
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceUpdate {
    /// Event time (unix ms)
    #[serde(rename = "E")]
    pub event_time: i64,
    /// Asset symbol
    #[serde(rename = "a")]
    pub asset: String,
    /// Signed balance delta
    #[serde(rename = "d")]
    pub delta: String,
    /// Clearance time (unix ms)
    #[serde(rename = "T")]
    pub clear_time: i64,
    /// Extra fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Parsing
// ============================================================================

impl GatewayEvent {
    /// Parse one inbound text frame.
    ///
    /// Errors only for frames that are not a JSON object (those are dropped
    /// by the client before fan-out). A well-formed object whose `e`
    /// discriminant is unrecognized parses as `Unknown` with the raw JSON
    /// preserved.
    pub fn parse(text: &str) -> Result<Self, StreamError> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|err| StreamError::Payload(err.to_string()))?;
        if !raw.is_object() {
            return Err(StreamError::Payload(format!("expected a JSON object, got: {raw}")));
        }

        if let Some(event_type) = raw.get("e").and_then(|v| v.as_str()) {
            match event_type {
                "depthUpdate" | "trade" | "kline" | "miniTicker" | "24hrMiniTicker" => {
                    if let Ok(event) = serde_json::from_value::<MarketEvent>(raw.clone()) {
                        return Ok(GatewayEvent::Market(event));
                    }
                }
                "executionReport" | "balanceUpdate" => {
                    if let Ok(event) = serde_json::from_value::<UserEvent>(raw.clone()) {
                        return Ok(GatewayEvent::User(event));
                    }
                }
                _ => {}
            }
        }

        Ok(GatewayEvent::Unknown(UnknownEvent { raw }))
    }

    /// Event type discriminant, if any
    pub fn event_type(&self) -> Option<&str> {
        match self {
            GatewayEvent::Market(m) => Some(match m {
                MarketEvent::DepthUpdate(_) => "depthUpdate",
                MarketEvent::Trade(_) => "trade",
                MarketEvent::Kline(_) => "kline",
                MarketEvent::MiniTicker(_) => "miniTicker",
            }),
            GatewayEvent::User(u) => Some(match u {
                UserEvent::ExecutionReport(_) => "executionReport",
                UserEvent::BalanceUpdate(_) => "balanceUpdate",
            }),
            GatewayEvent::Unknown(u) => u.raw.get("e").and_then(|v| v.as_str()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, GatewayEvent::Unknown(_))
    }
}

// ============================================================================
// Run statistics (smoke CLI)
// ============================================================================

/// Counters recorded while draining a stream
#[derive(Clone, Debug, Default)]
pub struct MessageStats {
    pub total_events: u64,
    pub parsed_ok: u64,
    pub unknown_type_count: u64,
    pub type_counts: HashMap<String, u64>,
    pub last_event_type: Option<String>,
}

impl MessageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &GatewayEvent) {
        self.total_events += 1;
        if event.is_unknown() {
            self.unknown_type_count += 1;
        } else {
            self.parsed_ok += 1;
        }
        let event_type = event.event_type().unwrap_or("<untyped>").to_string();
        *self.type_counts.entry(event_type.clone()).or_insert(0) += 1;
        self.last_event_type = Some(event_type);
    }
}
