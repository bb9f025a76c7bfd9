//! Reconnecting pub/sub stream client
//!
//! One `StreamClient` maintains a single logical subscription set against a
//! gateway endpoint, transparently reconnecting with exponential backoff and
//! replaying the set on every reopen, and fans parsed events out to
//! registered handlers.
//!
//! All public methods return immediately after mutating local state; network
//! activity happens on a driver task that owns the transport pair for one
//! connection and is replaced wholesale on reconnect. Failures are absorbed
//! and logged, never thrown to callers: exhausted retries park the client in
//! `Phase::GivenUp` until the owner calls `connect()` again.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::stream::backoff::ReconnectPolicy;
use crate::stream::transport::{Transport, TransportPair};
use crate::types::{next_request_id, GatewayEvent, StreamId, WsRequest};

/// Keep-alive PING cadence
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Connection lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No connection and none wanted
    Idle,
    /// Dialing the gateway
    Connecting,
    /// Transport open, subscriptions live
    Open,
    /// Waiting out a backoff delay before redialing
    PendingReconnect,
    /// Retry cap exhausted; only an explicit `connect()` resumes
    GivenUp,
}

/// Event handler callback
pub type Handler = Arc<dyn Fn(&GatewayEvent) + Send + Sync>;

/// Token identifying a registered handler, for later removal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Client configuration
#[derive(Clone, Debug)]
pub struct StreamClientConfig {
    pub url: Url,
    pub reconnect: ReconnectPolicy,
    pub keep_alive: Duration,
}

impl StreamClientConfig {
    pub fn new(url: Url) -> Self {
        Self { url, reconnect: ReconnectPolicy::default(), keep_alive: DEFAULT_KEEP_ALIVE }
    }
}

struct State {
    phase: Phase,
    subscriptions: BTreeSet<StreamId>,
    /// Sender into the live session, tagged with the driver generation that
    /// owns it so a superseded driver cannot clobber its successor's channel
    outbound: Option<(u64, mpsc::UnboundedSender<WsRequest>)>,
    attempts: u32,
}

struct Inner {
    config: StreamClientConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<State>,
    handlers: Mutex<Vec<(HandlerId, Handler)>>,
    next_handler_id: AtomicU64,
    /// Cleared by `disconnect()`; a close event observed while this is false
    /// must not schedule a reconnect
    stay_connected: AtomicBool,
    /// Bumped by each `connect()`; stale drivers detect supersession
    generation: AtomicU64,
    cancel: Notify,
}

/// Reconnecting stream client handle. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct StreamClient {
    inner: Arc<Inner>,
}

impl StreamClient {
    pub fn new(config: StreamClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    subscriptions: BTreeSet::new(),
                    outbound: None,
                    attempts: 0,
                }),
                handlers: Mutex::new(Vec::new()),
                next_handler_id: AtomicU64::new(1),
                stay_connected: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                cancel: Notify::new(),
            }),
        }
    }

    /// Endpoint this client dials
    pub fn url(&self) -> &Url {
        &self.inner.config.url
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.inner.state.lock().unwrap().phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase() == Phase::Open
    }

    /// Snapshot of the current subscription set
    pub fn subscriptions(&self) -> BTreeSet<StreamId> {
        self.inner.state.lock().unwrap().subscriptions.clone()
    }

    /// Start connecting. Idempotent: a no-op while a connection is live,
    /// being dialed, or already scheduled for reconnect. Resumes a client
    /// that has given up. Must be called within a tokio runtime.
    pub fn connect(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            match state.phase {
                Phase::Connecting | Phase::Open | Phase::PendingReconnect => return,
                Phase::Idle | Phase::GivenUp => {}
            }
            state.phase = Phase::Connecting;
            state.attempts = 0;
        }
        self.inner.stay_connected.store(true, Ordering::SeqCst);
        let gen = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            drive(inner, gen).await;
        });
    }

    /// Tear down: cancels any pending reconnect, stops the keep-alive timer,
    /// closes the transport if open, and clears the subscription set. A close
    /// event arriving afterwards does not trigger a reconnect.
    pub fn disconnect(&self) {
        self.inner.stay_connected.store(false, Ordering::SeqCst);
        self.inner.cancel.notify_waiters();
        let mut state = self.inner.state.lock().unwrap();
        state.outbound = None;
        state.subscriptions.clear();
        state.attempts = 0;
        state.phase = Phase::Idle;
    }

    /// Add a stream to the subscription set. No-op when already subscribed.
    /// Sends an immediate single-stream SUBSCRIBE when open; otherwise the
    /// stream rides the replay batch of the next open (triggering `connect()`
    /// if the client is idle).
    pub fn subscribe(&self, stream: StreamId) {
        let needs_connect = {
            let mut state = self.inner.state.lock().unwrap();
            if !state.subscriptions.insert(stream.clone()) {
                return;
            }
            match state.phase {
                Phase::Open => {
                    send_session(&state, WsRequest::subscribe(
                        vec![stream.to_string()],
                        next_request_id(),
                    ));
                    false
                }
                Phase::Idle | Phase::GivenUp => true,
                Phase::Connecting | Phase::PendingReconnect => false,
            }
        };
        if needs_connect {
            self.connect();
        }
    }

    /// Remove a stream from the subscription set. No-op when not subscribed.
    pub fn unsubscribe(&self, stream: &StreamId) {
        let mut guard = self.inner.state.lock().unwrap();
        let state = &mut *guard;
        if !state.subscriptions.remove(stream) {
            return;
        }
        if state.phase == Phase::Open {
            send_session(state, WsRequest::unsubscribe(
                vec![stream.to_string()],
                next_request_id(),
            ));
        }
    }

    /// Ask the gateway to report the active subscriptions. The reply arrives
    /// through normal handler fan-out; this client does not correlate it.
    pub fn request_subscription_list(&self) {
        let state = self.inner.state.lock().unwrap();
        if state.phase == Phase::Open {
            send_session(&state, WsRequest::list_subscriptions(next_request_id()));
        }
    }

    /// Register a handler invoked for every parsed inbound event, in
    /// registration order. A panicking handler is isolated: delivery to the
    /// remaining handlers continues.
    pub fn add_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        let id = HandlerId(self.inner.next_handler_id.fetch_add(1, Ordering::Relaxed));
        self.inner.handlers.lock().unwrap().push((id, Arc::new(handler)));
        id
    }

    /// Remove a previously registered handler. No-op for unknown ids.
    pub fn remove_handler(&self, id: HandlerId) {
        self.inner.handlers.lock().unwrap().retain(|(hid, _)| *hid != id);
    }
}

/// Queue a request into the live session, if any. Send failures mean the
/// session is tearing down; the subscription set replay covers the gap.
fn send_session(state: &State, request: WsRequest) {
    if let Some((_, tx)) = &state.outbound {
        let _ = tx.send(request);
    }
}

fn is_current(inner: &Inner, gen: u64) -> bool {
    inner.generation.load(Ordering::SeqCst) == gen
}

fn set_phase(inner: &Inner, gen: u64, phase: Phase) {
    let mut state = inner.state.lock().unwrap();
    if is_current(inner, gen) {
        state.phase = phase;
    }
}

/// Driver: connect, run the session until it drops, back off, repeat.
/// Exactly one driver per generation; superseded drivers exit silently.
async fn drive(inner: Arc<Inner>, gen: u64) {
    loop {
        if !is_current(&inner, gen) {
            return;
        }
        if !inner.stay_connected.load(Ordering::SeqCst) {
            set_phase(&inner, gen, Phase::Idle);
            return;
        }

        match inner.transport.connect(&inner.config.url).await {
            Ok(pair) => {
                if !is_current(&inner, gen) {
                    return;
                }
                if !inner.stay_connected.load(Ordering::SeqCst) {
                    set_phase(&inner, gen, Phase::Idle);
                    return;
                }
                run_session(&inner, gen, pair).await;
                if !is_current(&inner, gen) {
                    return;
                }
                if !inner.stay_connected.load(Ordering::SeqCst) {
                    set_phase(&inner, gen, Phase::Idle);
                    return;
                }
            }
            Err(err) => {
                warn!(url = %inner.config.url, error = %err, "gateway connect failed");
            }
        }

        // Schedule the next attempt or give up.
        let delay = {
            let mut state = inner.state.lock().unwrap();
            if !is_current(&inner, gen) {
                return;
            }
            state.outbound = None;
            state.attempts += 1;
            if !inner.config.reconnect.should_retry(state.attempts) {
                state.phase = Phase::GivenUp;
                error!(
                    url = %inner.config.url,
                    attempts = state.attempts - 1,
                    "reconnect attempts exhausted, giving up"
                );
                return;
            }
            state.phase = Phase::PendingReconnect;
            inner.config.reconnect.delay_for(state.attempts)
        };
        warn!(delay_ms = delay.as_millis() as u64, "scheduling gateway reconnect");

        let cancelled = inner.cancel.notified();
        tokio::pin!(cancelled);
        if !inner.stay_connected.load(Ordering::SeqCst) {
            set_phase(&inner, gen, Phase::Idle);
            return;
        }
        tokio::select! {
            _ = &mut cancelled => {
                set_phase(&inner, gen, Phase::Idle);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
        set_phase(&inner, gen, Phase::Connecting);
    }
}

/// One connection's lifetime: replay subscriptions, then pump inbound frames,
/// outbound requests, and the keep-alive timer until close, error, or cancel.
async fn run_session(inner: &Arc<Inner>, gen: u64, pair: TransportPair) {
    let TransportPair { mut sink, mut stream } = pair;
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsRequest>();

    let replay: Vec<String> = {
        let mut state = inner.state.lock().unwrap();
        state.phase = Phase::Open;
        state.attempts = 0;
        state.outbound = Some((gen, out_tx));
        state.subscriptions.iter().map(|s| s.to_string()).collect()
    };
    info!(url = %inner.config.url, streams = replay.len(), "gateway connection open");

    if !replay.is_empty() {
        let request = WsRequest::subscribe(replay, next_request_id());
        if send_frame(&mut sink, &request).await.is_err() {
            clear_session(inner, gen);
            return;
        }
    }

    let mut keep_alive = tokio::time::interval_at(
        tokio::time::Instant::now() + inner.config.keep_alive,
        inner.config.keep_alive,
    );
    keep_alive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let cancelled = inner.cancel.notified();
    tokio::pin!(cancelled);

    loop {
        if !inner.stay_connected.load(Ordering::SeqCst) {
            let _ = sink.close().await;
            break;
        }
        tokio::select! {
            _ = &mut cancelled => {
                let _ = sink.close().await;
                break;
            }
            request = out_rx.recv() => {
                // Senders live in client state; the channel cannot close
                // while this session owns it.
                if let Some(request) = request {
                    if send_frame(&mut sink, &request).await.is_err() {
                        break;
                    }
                }
            }
            _ = keep_alive.tick() => {
                let ping = WsRequest::ping(next_request_id());
                if send_frame(&mut sink, &ping).await.is_err() {
                    warn!("keep-alive ping failed");
                    break;
                }
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => dispatch(inner, text.as_str()),
                Some(Ok(Message::Ping(data))) => {
                    if sink.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    info!("gateway closed connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "websocket error");
                    break;
                }
                None => {
                    info!("gateway stream ended");
                    break;
                }
            }
        }
    }

    clear_session(inner, gen);
}

fn clear_session(inner: &Inner, gen: u64) {
    let mut state = inner.state.lock().unwrap();
    if let Some((owner, _)) = &state.outbound {
        if *owner == gen {
            state.outbound = None;
        }
    }
}

async fn send_frame(
    sink: &mut crate::stream::transport::WsSink,
    request: &WsRequest,
) -> Result<(), ()> {
    let json = match serde_json::to_string(request) {
        Ok(json) => json,
        Err(err) => {
            error!(error = %err, "failed to encode outbound request");
            return Ok(());
        }
    };
    debug!(frame = %json, "sending gateway request");
    sink.send(Message::Text(json.into())).await.map_err(|err| {
        warn!(error = %err, "failed to send gateway request");
    })
}

/// Parse one inbound frame and fan it out. Malformed payloads are logged and
/// dropped; each handler runs inside its own panic boundary.
fn dispatch(inner: &Inner, text: &str) {
    let event = match GatewayEvent::parse(text) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "dropping malformed gateway payload");
            return;
        }
    };
    if event.is_unknown() {
        debug!(event_type = ?event.event_type(), "unrecognized gateway event");
    }

    let handlers: Vec<(HandlerId, Handler)> = inner.handlers.lock().unwrap().clone();
    for (id, handler) in handlers {
        if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
            error!(handler = id.0, "message handler panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::transport::mock::MockTransport;
    use crate::types::{StreamType, WsMethod};
    use std::collections::BTreeSet;

    fn test_client() -> (StreamClient, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let config = StreamClientConfig::new(Url::parse("ws://gateway.test/stream/v1/1").unwrap());
        (StreamClient::new(config, transport.clone()), transport)
    }

    fn depth(symbol: &str) -> StreamId {
        StreamId::new(symbol, &StreamType::Depth)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_set_reduces_to_set_semantics() {
        let (client, transport) = test_client();
        transport.fail_all();

        client.subscribe(depth("ETHUSDC"));
        client.subscribe(depth("ethusdc")); // duplicate after lowercasing
        client.subscribe(depth("btcusdc"));
        client.unsubscribe(&depth("btcusdc"));
        client.unsubscribe(&depth("btcusdc")); // redundant
        client.unsubscribe(&depth("solusdc")); // never subscribed

        let expected: BTreeSet<StreamId> = [depth("ethusdc")].into_iter().collect();
        assert_eq!(client.subscriptions(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_connect_subscribe_yields_one_batched_frame() {
        let (client, transport) = test_client();
        client.subscribe(depth("ETHUSDC"));
        client.connect();

        let mut conn = transport.take_conn(0).await;
        let request = conn.next_request().await.expect("no subscribe frame");
        assert_eq!(request.method, WsMethod::Subscribe);
        assert_eq!(request.params, Some(vec!["ethusdc@depth".to_string()]));

        // No second frame rides along.
        assert!(conn.try_next_request().await.is_none());
        assert_eq!(client.phase(), Phase::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_twice_creates_one_transport() {
        let (client, transport) = test_client();
        client.connect();
        client.connect();
        settle().await;
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_then_reopen_replays_full_set() {
        let (client, transport) = test_client();
        client.subscribe(depth("ethusdc"));
        client.subscribe(depth("btcusdc"));
        client.connect();

        let mut first = transport.take_conn(0).await;
        let replay = first.next_request().await.unwrap();
        assert_eq!(replay.method, WsMethod::Subscribe);

        first.close();

        // Backoff for attempt 1 is 3s; the redial replays everything in one
        // order-independent batch.
        let mut second = transport.take_conn(1).await;
        assert_eq!(transport.connect_count(), 2);
        let replay = second.next_request().await.unwrap();
        assert_eq!(replay.method, WsMethod::Subscribe);
        let got: BTreeSet<String> = replay.params.unwrap().into_iter().collect();
        let want: BTreeSet<String> =
            ["ethusdc@depth".to_string(), "btcusdc@depth".to_string()].into_iter().collect();
        assert_eq!(got, want);
        assert!(second.try_next_request().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_counter_resets_on_successful_open() {
        let (client, transport) = test_client();
        client.subscribe(depth("ethusdc"));
        client.connect();

        let mut first = transport.take_conn(0).await;
        first.next_request().await.unwrap();
        first.close();

        let mut second = transport.take_conn(1).await;
        second.next_request().await.unwrap();
        second.close();

        // Were the counter not reset, this delay would be 4.5s; a 3.5s wait
        // only reaches the third dial if it reset to the base 3s.
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(transport.connect_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_suppresses_stale_close() {
        let (client, transport) = test_client();
        client.subscribe(depth("ethusdc"));
        client.connect();

        let mut conn = transport.take_conn(0).await;
        conn.next_request().await.unwrap();

        client.disconnect();
        conn.close(); // stale close after explicit disconnect

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.connect_count(), 1);
        assert_eq!(client.phase(), Phase::Idle);
        assert!(client.subscriptions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let (client, transport) = test_client();
        transport.fail_all();
        client.connect();

        // Delays sum to ~39.6s; go well past it.
        tokio::time::sleep(Duration::from_secs(120)).await;
        // Initial dial plus the five capped reconnect attempts.
        assert_eq!(transport.connect_count(), 6);
        assert_eq!(client.phase(), Phase::GivenUp);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.connect_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_connect_resumes_after_give_up() {
        let (client, transport) = test_client();
        transport.fail_all();
        client.connect();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(client.phase(), Phase::GivenUp);

        transport.fail_next(0);
        client.connect();
        // Failed dials do not register connections; this is the first success.
        let _conn = transport.take_conn(0).await;
        settle().await;
        assert_eq!(client.phase(), Phase::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_while_open_sends_single_stream_frame() {
        let (client, transport) = test_client();
        client.connect();
        let mut conn = transport.take_conn(0).await;
        settle().await;

        client.subscribe(depth("ethusdc"));
        let request = conn.next_request().await.unwrap();
        assert_eq!(request.method, WsMethod::Subscribe);
        assert_eq!(request.params, Some(vec!["ethusdc@depth".to_string()]));

        client.unsubscribe(&depth("ethusdc"));
        let request = conn.next_request().await.unwrap();
        assert_eq!(request.method, WsMethod::Unsubscribe);
        assert_eq!(request.params, Some(vec!["ethusdc@depth".to_string()]));
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_list_request_goes_out_when_open() {
        let (client, transport) = test_client();
        client.request_subscription_list(); // idle: nowhere to send
        client.connect();
        let mut conn = transport.take_conn(0).await;
        settle().await;

        client.request_subscription_list();
        let request = conn.next_request().await.unwrap();
        assert_eq!(request.method, WsMethod::ListSubscriptions);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_subscribe_sends_nothing() {
        let (client, transport) = test_client();
        client.subscribe(depth("ethusdc"));
        client.connect();
        let mut conn = transport.take_conn(0).await;
        conn.next_request().await.unwrap();

        client.subscribe(depth("ETHUSDC"));
        assert!(conn.try_next_request().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn keep_alive_ping_fires_on_interval() {
        let (client, transport) = test_client();
        client.connect();
        let mut conn = transport.take_conn(0).await;
        settle().await;

        let request = conn.next_request().await.expect("no keep-alive frame");
        assert_eq!(request.method, WsMethod::Ping);
        assert!(request.params.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_is_not_forwarded() {
        let (client, transport) = test_client();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = seen.clone();
        client.add_handler(move |event| {
            sink.lock().unwrap().push(event.event_type().unwrap_or("?").to_string());
        });

        client.connect();
        let conn = transport.take_conn(0).await;
        settle().await;

        conn.send_text("not-json");
        conn.send_text("42");
        settle().await;
        assert!(seen.lock().unwrap().is_empty());

        conn.send_text(r#"{"e":"balanceUpdate","E":1,"a":"USDC","d":"1","T":2}"#);
        settle().await;
        assert_eq!(seen.lock().unwrap().as_slice(), ["balanceUpdate"]);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_handler_does_not_block_delivery() {
        let (client, transport) = test_client();
        client.add_handler(|_| panic!("boom"));
        let seen = Arc::new(Mutex::new(0u32));
        let sink = seen.clone();
        client.add_handler(move |_| {
            *sink.lock().unwrap() += 1;
        });

        client.connect();
        let conn = transport.take_conn(0).await;
        settle().await;

        conn.send_text(r#"{"e":"balanceUpdate","E":1,"a":"USDC","d":"1","T":2}"#);
        conn.send_text(r#"{"e":"balanceUpdate","E":2,"a":"USDC","d":"2","T":3}"#);
        settle().await;
        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn removed_handler_stops_receiving() {
        let (client, transport) = test_client();
        let seen = Arc::new(Mutex::new(0u32));
        let sink = seen.clone();
        let id = client.add_handler(move |_| {
            *sink.lock().unwrap() += 1;
        });

        client.connect();
        let conn = transport.take_conn(0).await;
        settle().await;

        conn.send_text(r#"{"e":"balanceUpdate","E":1,"a":"USDC","d":"1","T":2}"#);
        settle().await;
        client.remove_handler(id);
        conn.send_text(r#"{"e":"balanceUpdate","E":2,"a":"USDC","d":"2","T":3}"#);
        settle().await;
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_triggers_reconnect() {
        let (client, transport) = test_client();
        client.subscribe(depth("ethusdc"));
        client.connect();
        let mut conn = transport.take_conn(0).await;
        conn.next_request().await.unwrap();

        conn.send_error();

        let mut second = transport.take_conn(1).await;
        assert_eq!(transport.connect_count(), 2);
        let replay = second.next_request().await.unwrap();
        assert_eq!(replay.method, WsMethod::Subscribe);
    }
}
