//! Gateway endpoint resolution
//!
//! The stream gateway is deployed per chain: each supported chain id maps to
//! a base `wss://` URL. The market stream connects to
//! `<base>/stream/v1/<chain>`; the user stream appends the wallet address as
//! one extra path segment. These are the only two endpoint shapes.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StreamError;

/// EVM chain identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default gateway hosts per supported chain
const DEFAULT_GATEWAYS: &[(u64, &str)] = &[
    (1, "wss://gateway.dexgate.exchange"),
    (42161, "wss://gateway-arb.dexgate.exchange"),
    (8453, "wss://gateway-base.dexgate.exchange"),
];

/// Lower-cased, `0x`-prefixed EVM wallet address (20 bytes, hex)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Validate and normalize an address. Accepts an optional `0x` prefix;
    /// the stored form is always `0x` + 40 lower-case hex digits.
    pub fn parse(input: &str) -> Result<Self, StreamError> {
        let hex = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")).unwrap_or(input);
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StreamError::InvalidAddress(input.to_string()));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for WalletAddress {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Resolver from chain id to concrete stream URLs.
///
/// The default resolver uses the built-in per-chain gateway table; a fixed
/// base can be supplied instead (staging deployments, tests against a local
/// gateway).
#[derive(Clone, Debug, Default)]
pub struct GatewayEndpoints {
    base_override: Option<Url>,
}

impl GatewayEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every chain against a fixed base URL
    pub fn with_base(base: Url) -> Self {
        Self { base_override: Some(base) }
    }

    fn base_for(&self, chain: ChainId) -> Result<Url, StreamError> {
        if let Some(base) = &self.base_override {
            return Ok(base.clone());
        }
        let host = DEFAULT_GATEWAYS
            .iter()
            .find(|(id, _)| *id == chain.0)
            .map(|(_, host)| *host)
            .ok_or(StreamError::UnsupportedChain(chain.0))?;
        Ok(Url::parse(host)?)
    }

    /// Market (public) stream URL for a chain
    pub fn market_url(&self, chain: ChainId) -> Result<Url, StreamError> {
        let base = self.base_for(chain)?;
        Ok(base.join(&format!("/stream/v1/{chain}"))?)
    }

    /// User (per-wallet) stream URL for a chain
    pub fn user_url(&self, chain: ChainId, address: &WalletAddress) -> Result<Url, StreamError> {
        let base = self.base_for(chain)?;
        Ok(base.join(&format!("/stream/v1/{chain}/{address}"))?)
    }
}
