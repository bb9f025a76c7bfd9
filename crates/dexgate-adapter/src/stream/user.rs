//! User (per-wallet) stream wrapper and registry
//!
//! The user stream carries execution reports and balance updates scoped to
//! one wallet address; its endpoint appends the address as a path segment.
//! Applications typically hold one `UserStreamRegistry` at their composition
//! root and hand it by reference to whatever needs per-wallet socket access,
//! rather than keeping implicit global state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::endpoints::{ChainId, GatewayEndpoints, WalletAddress};
use crate::error::StreamError;
use crate::stream::client::{HandlerId, Phase, StreamClient, StreamClientConfig};
use crate::stream::transport::{Transport, WsTransport};
use crate::types::GatewayEvent;

/// Account-scoped event stream for one wallet on one chain
pub struct UserStream {
    chain: ChainId,
    wallet: WalletAddress,
    client: StreamClient,
}

impl UserStream {
    pub fn new(chain: ChainId, wallet: WalletAddress) -> Result<Self, StreamError> {
        Self::with_endpoints(&GatewayEndpoints::new(), chain, wallet)
    }

    pub fn with_endpoints(
        endpoints: &GatewayEndpoints,
        chain: ChainId,
        wallet: WalletAddress,
    ) -> Result<Self, StreamError> {
        Self::with_transport(endpoints, chain, wallet, Arc::new(WsTransport))
    }

    pub fn with_transport(
        endpoints: &GatewayEndpoints,
        chain: ChainId,
        wallet: WalletAddress,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, StreamError> {
        let url = endpoints.user_url(chain, &wallet)?;
        let client = StreamClient::new(StreamClientConfig::new(url), transport);
        Ok(Self { chain, wallet, client })
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn wallet(&self) -> &WalletAddress {
        &self.wallet
    }

    /// The user stream has no per-feed subscriptions; connecting is enough
    /// for the gateway to push every event scoped to the wallet.
    pub fn connect(&self) {
        self.client.connect();
    }

    pub fn disconnect(&self) {
        self.client.disconnect();
    }

    pub fn phase(&self) -> Phase {
        self.client.phase()
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

    pub fn client(&self) -> &StreamClient {
        &self.client
    }
}

/// Explicit registry of user streams, one per wallet address.
///
/// Owned by the application's composition root and passed by reference;
/// streams are created lazily and live until removed.
pub struct UserStreamRegistry {
    endpoints: GatewayEndpoints,
    chain: ChainId,
    transport: Arc<dyn Transport>,
    streams: Mutex<HashMap<WalletAddress, Arc<UserStream>>>,
}

impl UserStreamRegistry {
    pub fn new(chain: ChainId) -> Self {
        Self::with_transport(GatewayEndpoints::new(), chain, Arc::new(WsTransport))
    }

    pub fn with_transport(
        endpoints: GatewayEndpoints,
        chain: ChainId,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self { endpoints, chain, transport, streams: Mutex::new(HashMap::new()) }
    }

    /// The stream for `wallet`, creating it on first use. Repeated calls for
    /// the same address return the same instance.
    pub fn get_or_create(&self, wallet: &WalletAddress) -> Result<Arc<UserStream>, StreamError> {
        let mut streams = self.streams.lock().unwrap();
        if let Some(stream) = streams.get(wallet) {
            return Ok(Arc::clone(stream));
        }
        let stream = Arc::new(UserStream::with_transport(
            &self.endpoints,
            self.chain,
            wallet.clone(),
            Arc::clone(&self.transport),
        )?);
        streams.insert(wallet.clone(), Arc::clone(&stream));
        Ok(stream)
    }

    /// Disconnect and drop the stream for `wallet`, if present
    pub fn remove(&self, wallet: &WalletAddress) {
        if let Some(stream) = self.streams.lock().unwrap().remove(wallet) {
            stream.disconnect();
        }
    }

    /// Disconnect every stream and clear the registry
    pub fn disconnect_all(&self) {
        let mut streams = self.streams.lock().unwrap();
        for stream in streams.values() {
            stream.disconnect();
        }
        streams.clear();
    }

    pub fn len(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::transport::mock::MockTransport;

    fn wallet(last: char) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}{last}", "a".repeat(39))).unwrap()
    }

    fn test_registry() -> (UserStreamRegistry, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        transport.fail_all();
        let registry = UserStreamRegistry::with_transport(
            GatewayEndpoints::new(),
            ChainId(1),
            transport.clone(),
        );
        (registry, transport)
    }

    #[test]
    fn user_url_includes_wallet_segment() {
        let stream = UserStream::new(ChainId(1), wallet('1')).unwrap();
        assert_eq!(
            stream.client().url().as_str(),
            format!("wss://gateway.dexgate.exchange/stream/v1/1/{}", wallet('1'))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn registry_returns_same_instance_per_wallet() {
        let (registry, _transport) = test_registry();
        let a1 = registry.get_or_create(&wallet('1')).unwrap();
        let a2 = registry.get_or_create(&wallet('1')).unwrap();
        let b = registry.get_or_create(&wallet('2')).unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_disconnects_and_forgets() {
        let (registry, _transport) = test_registry();
        let stream = registry.get_or_create(&wallet('1')).unwrap();
        stream.connect();
        registry.remove(&wallet('1'));

        assert_eq!(stream.phase(), Phase::Idle);
        assert!(registry.is_empty());

        // A later lookup builds a fresh instance.
        let again = registry.get_or_create(&wallet('1')).unwrap();
        assert!(!Arc::ptr_eq(&stream, &again));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_all_clears_registry() {
        let (registry, _transport) = test_registry();
        let a = registry.get_or_create(&wallet('1')).unwrap();
        let b = registry.get_or_create(&wallet('2')).unwrap();
        a.connect();
        b.connect();

        registry.disconnect_all();
        assert!(registry.is_empty());
        assert_eq!(a.phase(), Phase::Idle);
        assert_eq!(b.phase(), Phase::Idle);
    }
}
