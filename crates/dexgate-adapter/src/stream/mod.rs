//! Reconnecting stream clients
//!
//! `StreamClient` is the transport-agnostic core: one logical subscription
//! set, exponential-backoff reconnection with replay-on-open, keep-alive
//! pings, and handler fan-out. `MarketStream` and `UserStream` aim it at the
//! two gateway endpoint shapes.

pub mod backoff;
pub mod client;
pub mod market;
pub mod transport;
pub mod user;

pub use backoff::ReconnectPolicy;
pub use client::{Handler, HandlerId, Phase, StreamClient, StreamClientConfig, DEFAULT_KEEP_ALIVE};
pub use market::MarketStream;
pub use transport::{Transport, TransportPair, WsTransport};
pub use user::{UserStream, UserStreamRegistry};
