//! Dexgate Stream Adapter
//!
//! Client-side plumbing for the Dexgate DEX stream gateway:
//! - `stream`: reconnecting WebSocket clients for the market (public) and
//!   user (per-wallet) streams, with subscription replay, exponential
//!   backoff, keep-alive pings, and handler fan-out
//! - `types`: the wire protocol - `SUBSCRIBE`/`UNSUBSCRIBE`/
//!   `LIST_SUBSCRIPTIONS`/`PING` requests and the `e`-tagged inbound event
//!   union (`executionReport`, `balanceUpdate`, `depthUpdate`, `trade`,
//!   `kline`, `miniTicker`)
//! - `endpoints`: chain id to gateway URL resolution
//!
//! Order matching, custody, oracles, and settlement live on-chain; the
//! gateway only relays already-computed market events. This crate is the
//! consuming side of that relay.

pub mod endpoints;
pub mod error;
pub mod stream;
pub mod types;

pub use endpoints::{ChainId, GatewayEndpoints, WalletAddress};
pub use error::StreamError;
pub use stream::{
    MarketStream, Phase, ReconnectPolicy, StreamClient, StreamClientConfig, UserStream,
    UserStreamRegistry,
};
pub use types::*;
