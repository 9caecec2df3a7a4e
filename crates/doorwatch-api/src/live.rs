//! Live WebSocket transport with bounded reconnection.
//!
//! Opens one connection to the event source, parses each text frame into an
//! [`Envelope`], and hands it to the [`Dispatcher`]. On an unexpected close
//! it retries on a fixed interval up to [`ReconnectPolicy::max_attempts`];
//! past that it stays [`Disconnected`](ConnectionState::Disconnected) until
//! [`connect`](Transport::connect) is called again.
//!
//! # Example
//!
//! ```rust,ignore
//! use doorwatch_api::{LiveTransport, MessageKind, ReconnectPolicy, Transport, handler};
//! use url::Url;
//!
//! let url = Url::parse("wss://acs.example.com/events")?;
//! let transport = LiveTransport::new(url, ReconnectPolicy::default());
//!
//! let sub = transport.subscribe(MessageKind::NewAlert, handler(|env| {
//!     println!("{:?}", env.message);
//!     Ok(())
//! }));
//! transport.connect().await?;
//! ```

use std::pin::Pin;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::{self, BoxFuture};
use futures_util::{FutureExt, Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::dispatch::{Dispatcher, Handler, Subscription};
use crate::error::Error;
use crate::message::{Envelope, MessageKind};
use crate::transport::{
    ConnectionState, PendingConnect, ReconnectPolicy, SharedConnect, Transport, lock,
    release_pending, set_state, set_state_within,
};

// ── Connection seam ──────────────────────────────────────────────────

/// Inbound text frames. An `Err` or the end of the stream means the
/// connection is gone.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, Error>> + Send>>;

/// Outbound text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// An open, framed text connection.
pub struct Connection {
    pub frames: FrameStream,
    pub sink: FrameSink,
}

/// Opens framed connections. [`WsOpener`] is the production implementation.
pub trait Opener: Send + Sync + 'static {
    fn open(&self, url: &Url) -> BoxFuture<'static, Result<Connection, Error>>;
}

/// Opens WebSocket connections via `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsOpener;

impl Opener for WsOpener {
    fn open(&self, url: &Url) -> BoxFuture<'static, Result<Connection, Error>> {
        let url = url.clone();
        async move {
            let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

            let (write, read) = ws_stream.split();

            let sink = write
                .sink_map_err(|e| Error::Send(e.to_string()))
                .with(|text: String| future::ready(Ok::<_, Error>(tungstenite::Message::text(text))));

            let frames = read.filter_map(|frame| {
                future::ready(match frame {
                    Ok(tungstenite::Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    Ok(tungstenite::Message::Close(frame)) => {
                        Some(Err(match frame {
                            Some(cf) => Error::WebSocketClosed {
                                code: u16::from(cf.code),
                                reason: cf.reason.to_string(),
                            },
                            None => Error::WebSocketClosed {
                                code: 1005,
                                reason: "no close payload".into(),
                            },
                        }))
                    }
                    Ok(tungstenite::Message::Ping(_)) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("WebSocket ping");
                        None
                    }
                    // Binary, Pong, Frame -- ignore
                    Ok(_) => None,
                    Err(e) => Some(Err(Error::WebSocketConnect(e.to_string()))),
                })
            });

            Ok(Connection {
                frames: Box::pin(frames),
                sink: Box::pin(sink),
            })
        }
        .boxed()
    }
}

// ── LiveTransport ────────────────────────────────────────────────────

/// Transport backed by a real connection to the event source.
///
/// Cheaply cloneable; clones share the connection.
pub struct LiveTransport<O: Opener = WsOpener> {
    inner: Arc<Inner<O>>,
}

impl<O: Opener> Clone for LiveTransport<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<O> {
    url: Url,
    opener: O,
    policy: ReconnectPolicy,
    dispatcher: Arc<Dispatcher>,
    state: watch::Sender<ConnectionState>,
    /// In-flight connect attempt shared by all callers.
    pending: PendingConnect,
    /// Writer side of the active session.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    session: Mutex<Option<CancellationToken>>,
    reconnect: Mutex<Option<CancellationToken>>,
    attempts: AtomicU32,
    /// Bumped by `disconnect()`; attempts started under an older value are void.
    generation: AtomicU64,
}

impl LiveTransport<WsOpener> {
    pub fn new(url: Url, policy: ReconnectPolicy) -> Self {
        Self::with_opener(url, policy, WsOpener)
    }
}

impl<O: Opener> LiveTransport<O> {
    /// Build a transport over a custom [`Opener`].
    pub fn with_opener(url: Url, policy: ReconnectPolicy, opener: O) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                url,
                opener,
                policy,
                dispatcher: Dispatcher::new(),
                state,
                pending: Mutex::new(None),
                outbound: Mutex::new(None),
                session: Mutex::new(None),
                reconnect: Mutex::new(None),
                attempts: AtomicU32::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.inner.policy
    }

    /// Reconnect attempts made since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

impl<O: Opener> Transport for LiveTransport<O> {
    fn connect(&self) -> BoxFuture<'_, Result<(), Error>> {
        let inner = Arc::clone(&self.inner);
        async move {
            if inner.current_state() == ConnectionState::Connected {
                return Ok(());
            }
            // An explicit connect re-arms the automatic retry budget.
            inner.attempts.store(0, Ordering::SeqCst);
            Inner::connect_shared(&inner).await
        }
        .boxed()
    }

    fn disconnect(&self) {
        let inner = &self.inner;
        {
            // Under the pending lock so no attempt can start in between.
            let mut pending = lock(&inner.pending);
            inner.generation.fetch_add(1, Ordering::SeqCst);
            pending.take();
        }

        if let Some(token) = lock(&inner.reconnect).take() {
            token.cancel();
        }

        if let Some(token) = lock(&inner.session).take() {
            set_state(&inner.state, ConnectionState::Closing);
            token.cancel();
        }

        lock(&inner.outbound).take();
        inner.dispatcher.clear();

        set_state(&inner.state, ConnectionState::Disconnected);
        tracing::info!(url = %inner.url, "transport disconnected");
    }

    fn send(&self, envelope: Envelope) {
        let kind = envelope.kind();
        if self.inner.current_state() != ConnectionState::Connected {
            tracing::error!(%kind, "cannot send: transport not connected");
            return;
        }

        let text = match envelope.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(%kind, error = %e, "cannot send: encoding failed");
                return;
            }
        };

        let delivered = lock(&self.inner.outbound)
            .as_ref()
            .is_some_and(|tx| tx.send(text).is_ok());
        if !delivered {
            tracing::error!(%kind, "cannot send: no active session");
        }
    }

    fn subscribe(&self, kind: MessageKind, handler: Handler) -> Subscription {
        self.inner.dispatcher.subscribe(kind, handler)
    }

    fn connection_state(&self) -> ConnectionState {
        self.inner.current_state()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }
}

// ── Connection lifecycle ─────────────────────────────────────────────

impl<O: Opener> Inner<O> {
    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Join the in-flight attempt, or start one.
    fn connect_shared(this: &Arc<Self>) -> SharedConnect {
        let mut pending = lock(&this.pending);
        if let Some((_, attempt)) = pending.as_ref() {
            return attempt.clone();
        }

        // Read while holding the lock `disconnect()` bumps it under.
        let generation = this.generation.load(Ordering::SeqCst);

        // Spawned so the attempt finishes even if every waiter goes away.
        let task = tokio::spawn(Self::establish(Arc::clone(this), generation));
        let attempt = async move {
            task.await
                .unwrap_or_else(|e| Err(Error::WebSocketConnect(format!("connect task failed: {e}"))))
        }
        .boxed()
        .shared();

        *pending = Some((generation, attempt.clone()));
        attempt
    }

    /// One connect attempt, void if `disconnect()` bumps `generation`.
    async fn establish(this: Arc<Self>, generation: u64) -> Result<(), Error> {
        if !this.publish(generation, ConnectionState::Connecting) {
            tracing::debug!("connect attempt superseded before it started");
            return Err(Error::Disconnected);
        }
        tracing::info!(url = %this.url, "connecting");

        let result = this.opener.open(&this.url).await;
        release_pending(&this.pending, generation);

        if this.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("connect attempt superseded by disconnect");
            return Err(Error::Disconnected);
        }

        match result {
            Ok(connection) => {
                let session = Self::start_session(&this, connection);
                if !this.publish(generation, ConnectionState::Connected) {
                    session.cancel();
                    return Err(Error::Disconnected);
                }
                this.attempts.store(0, Ordering::SeqCst);
                if let Some(retry) = lock(&this.reconnect).take() {
                    retry.cancel();
                }
                tracing::info!(url = %this.url, "connected");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %this.url, "connect attempt failed");
                if this.publish(generation, ConnectionState::Disconnected) {
                    Self::schedule_reconnect(&this);
                }
                Err(e)
            }
        }
    }

    fn publish(&self, generation: u64, next: ConnectionState) -> bool {
        set_state_within(&self.state, &self.generation, generation, next)
    }

    fn start_session(this: &Arc<Self>, connection: Connection) -> CancellationToken {
        let cancel = CancellationToken::new();
        if let Some(previous) = lock(&this.session).replace(cancel.clone()) {
            previous.cancel();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&this.outbound) = Some(tx);

        tokio::spawn(Self::run_session(
            Arc::clone(this),
            connection,
            rx,
            cancel.clone(),
        ));
        cancel
    }

    /// Read frames and write outbound envelopes until the connection drops.
    async fn run_session(
        this: Arc<Self>,
        connection: Connection,
        mut outbound: mpsc::UnboundedReceiver<String>,
        cancel: CancellationToken,
    ) {
        let Connection {
            mut frames,
            mut sink,
        } = connection;

        let failure = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    // Flush what was queued before the disconnect.
                    while let Ok(text) = outbound.try_recv() {
                        if sink.send(text).await.is_err() {
                            break;
                        }
                    }
                    if let Err(e) = sink.close().await {
                        tracing::debug!(error = %e, "error closing connection");
                    }
                    return;
                }
                frame = frames.next() => match frame {
                    Some(Ok(text)) => this.handle_frame(&text),
                    Some(Err(e)) => break Some(e),
                    None => break None,
                },
                Some(text) = outbound.recv() => {
                    if let Err(e) = sink.send(text).await {
                        break Some(e);
                    }
                }
            }
        };

        match failure {
            Some(e) => tracing::warn!(error = %e, "connection lost"),
            None => tracing::info!("connection stream ended"),
        }

        if cancel.is_cancelled() {
            return;
        }
        cancel.cancel();
        lock(&this.outbound).take();
        set_state(&this.state, ConnectionState::Disconnected);
        Self::schedule_reconnect(&this);
    }

    /// Parse one frame and dispatch it. Malformed frames are dropped.
    fn handle_frame(&self, text: &str) {
        match Envelope::parse(text) {
            Ok(envelope) => {
                self.dispatcher.dispatch(&envelope);
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed envelope");
            }
        }
    }

    /// Arm the next retry, unless the attempt budget is spent.
    fn schedule_reconnect(this: &Arc<Self>) {
        let attempt = this.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let max_attempts = this.policy.max_attempts;
        if attempt > max_attempts {
            tracing::error!(max_attempts, "reconnection limit reached, giving up");
            set_state(&this.state, ConnectionState::Disconnected);
            return;
        }

        let token = CancellationToken::new();
        if let Some(previous) = lock(&this.reconnect).replace(token.clone()) {
            previous.cancel();
        }

        let delay = this.policy.interval;
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            max_attempts,
            "waiting before reconnect"
        );

        let inner = Arc::clone(this);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if inner.current_state() == ConnectionState::Connected {
                        tracing::debug!("already connected, skipping scheduled reconnect");
                        return;
                    }
                    // A failure here schedules the next attempt itself.
                    let _ = Self::connect_shared(&inner).await;
                }
            }
        });
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio_stream::wrappers::UnboundedReceiverStream;

    use super::*;
    use crate::dispatch::handler;

    /// Test peer: push inbound frames, read outbound frames, or hang up.
    struct Peer {
        inbound: mpsc::UnboundedSender<Result<String, Error>>,
        outbound: mpsc::UnboundedReceiver<String>,
    }

    fn in_memory() -> (Connection, Peer) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();

        let sink = futures_util::sink::unfold(out_tx, |tx, text: String| async move {
            tx.send(text).map_err(|e| Error::Send(e.to_string()))?;
            Ok::<_, Error>(tx)
        });

        let connection = Connection {
            frames: Box::pin(UnboundedReceiverStream::new(in_rx)),
            sink: Box::pin(sink),
        };
        (
            connection,
            Peer {
                inbound: in_tx,
                outbound: out_rx,
            },
        )
    }

    /// Hands out scripted outcomes; refuses the first `refuse_first` calls
    /// and any call once the script runs out.
    #[derive(Default)]
    struct ScriptedOpener {
        script: Mutex<VecDeque<Connection>>,
        calls: Arc<AtomicUsize>,
        delay: Duration,
        refuse_first: usize,
    }

    impl Opener for ScriptedOpener {
        fn open(&self, _url: &Url) -> BoxFuture<'static, Result<Connection, Error>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let next = if call < self.refuse_first {
                None
            } else {
                self.script.lock().unwrap().pop_front()
            };
            let delay = self.delay;
            async move {
                tokio::time::sleep(delay).await;
                next.ok_or_else(|| Error::WebSocketConnect("connection refused".into()))
            }
            .boxed()
        }
    }

    fn transport(
        opener: ScriptedOpener,
        max_attempts: u32,
    ) -> LiveTransport<ScriptedOpener> {
        LiveTransport::with_opener(
            Url::parse("ws://127.0.0.1:9/events").unwrap(),
            ReconnectPolicy {
                interval: Duration::from_secs(5),
                max_attempts,
            },
            opener,
        )
    }

    const STATUS_FRAME: &str = r#"{"type":"SYSTEM_STATUS","payload":{"component":"panel-1","status":"healthy"},"timestamp":"2026-03-01T10:00:00Z"}"#;

    #[tokio::test(start_paused = true)]
    async fn connect_dispatches_frames_and_drops_garbage() {
        let (conn, peer) = in_memory();
        let opener = ScriptedOpener::default();
        opener.script.lock().unwrap().push_back(conn);
        let t = transport(opener, 3);

        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = t.subscribe(
            MessageKind::SystemStatus,
            handler(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        t.connect().await.unwrap();
        assert_eq!(t.connection_state(), ConnectionState::Connected);

        peer.inbound.send(Ok(STATUS_FRAME.into())).unwrap();
        peer.inbound.send(Ok("{ not an envelope".into())).unwrap();
        peer.inbound.send(Ok(STATUS_FRAME.into())).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(t.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_connects_share_one_attempt() {
        let (conn, _peer) = in_memory();
        let opener = ScriptedOpener {
            delay: Duration::from_secs(1),
            ..ScriptedOpener::default()
        };
        opener.script.lock().unwrap().push_back(conn);
        let calls = Arc::clone(&opener.calls);
        let t = transport(opener, 3);

        let (a, b, c) = tokio::join!(t.connect(), t.connect(), t.connect());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Already open: resolves without touching the opener.
        t.connect().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_connect_cancels_pending_retry() {
        let (first, _first_peer) = in_memory();
        let (second, _second_peer) = in_memory();
        let opener = ScriptedOpener {
            refuse_first: 1,
            ..ScriptedOpener::default()
        };
        opener.script.lock().unwrap().extend([first, second]);
        let calls = Arc::clone(&opener.calls);
        let t = transport(opener, 3);

        assert!(t.connect().await.is_err());
        tokio::time::sleep(Duration::from_secs(1)).await;
        t.connect().await.unwrap();

        let mut states = t.watch_state();
        states.mark_unchanged();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // The retry armed by the first failure never fires.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!states.has_changed().unwrap());
        assert_eq!(t.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_before_attempt_runs_voids_it() {
        let (conn, _peer) = in_memory();
        let opener = ScriptedOpener::default();
        opener.script.lock().unwrap().push_back(conn);
        let calls = Arc::clone(&opener.calls);
        let t = transport(opener, 3);

        let attempt = Inner::connect_shared(&t.inner);
        t.disconnect();

        assert!(matches!(attempt.await, Err(Error::Disconnected)));
        assert_eq!(t.connection_state(), ConnectionState::Disconnected);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_attempt_leaves_newer_attempt_shared() {
        let (first, _first_peer) = in_memory();
        let (second, _second_peer) = in_memory();
        let opener = ScriptedOpener {
            delay: Duration::from_secs(1),
            ..ScriptedOpener::default()
        };
        opener.script.lock().unwrap().extend([first, second]);
        let calls = Arc::clone(&opener.calls);
        let t = transport(opener, 3);

        let stale = Inner::connect_shared(&t.inner);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        t.disconnect();

        tokio::time::sleep(Duration::from_millis(400)).await;
        let fresh = Inner::connect_shared(&t.inner);

        // The stale attempt finishes at 1s; the fresh one is still opening.
        tokio::time::sleep(Duration::from_millis(700)).await;
        let joined = Inner::connect_shared(&t.inner);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(matches!(stale.await, Err(Error::Disconnected)));
        fresh.await.unwrap();
        joined.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(t.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnection_stops_after_bound() {
        let opener = ScriptedOpener::default();
        let calls = Arc::clone(&opener.calls);
        let t = transport(opener, 3);

        assert!(t.connect().await.is_err());

        tokio::time::sleep(Duration::from_secs(60)).await;
        // One explicit attempt plus three automatic retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(t.connection_state(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_follow_fixed_interval() {
        let opener = ScriptedOpener::default();
        let calls = Arc::clone(&opener.calls);
        let t = transport(opener, 10);

        assert!(t.connect().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        t.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_close_reconnects_and_resets_budget() {
        let (first, first_peer) = in_memory();
        let (second, _second_peer) = in_memory();
        let opener = ScriptedOpener::default();
        opener.script.lock().unwrap().extend([first, second]);
        let calls = Arc::clone(&opener.calls);
        let t = transport(opener, 2);

        t.connect().await.unwrap();
        drop(first_peer);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(t.connection_state(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(t.connection_state(), ConnectionState::Connected);
        assert_eq!(t.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_reconnect() {
        let opener = ScriptedOpener::default();
        let calls = Arc::clone(&opener.calls);
        let t = transport(opener, 10);

        assert!(t.connect().await.is_err());
        t.disconnect();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(t.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_releases_subscriptions() {
        let (conn, _peer) = in_memory();
        let opener = ScriptedOpener::default();
        opener.script.lock().unwrap().push_back(conn);
        let t = transport(opener, 1);

        let sub = t.subscribe(MessageKind::NewAlert, handler(|_| Ok(())));
        t.connect().await.unwrap();
        t.disconnect();

        assert!(!sub.unsubscribe());
        assert_eq!(t.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn send_writes_frame_when_connected() {
        let (conn, mut peer) = in_memory();
        let opener = ScriptedOpener::default();
        opener.script.lock().unwrap().push_back(conn);
        let t = transport(opener, 1);

        // Not connected yet: dropped, never queued.
        t.send(Envelope::parse(STATUS_FRAME).unwrap());

        t.connect().await.unwrap();
        t.send(Envelope::parse(STATUS_FRAME).unwrap());

        let written = tokio::time::timeout(Duration::from_secs(1), peer.outbound.recv())
            .await
            .unwrap()
            .unwrap();
        let echoed = Envelope::parse(&written).unwrap();
        assert_eq!(echoed.kind(), MessageKind::SystemStatus);
        assert!(peer.outbound.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_connect_works_after_budget_exhausted() {
        let (conn, _peer) = in_memory();
        let opener = ScriptedOpener::default();
        let calls = Arc::clone(&opener.calls);
        let t = transport(opener, 1);

        assert!(t.connect().await.is_err());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        t.inner.opener.script.lock().unwrap().push_back(conn);
        t.connect().await.unwrap();
        assert_eq!(t.connection_state(), ConnectionState::Connected);
    }
}
