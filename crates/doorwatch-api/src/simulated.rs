//! In-process transport that fabricates traffic.
//!
//! Honors the same [`Transport`] contract as the live implementation, so
//! consumers cannot tell the two apart. Once connected, one generator task
//! per message kind emits random but schema-valid envelopes on a fixed
//! period. [`SimulatedTransport::emit`] injects a specific message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use rand::Rng;
use rand::seq::SliceRandom;
use strum::IntoEnumIterator;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::dispatch::{Dispatcher, Handler, Subscription};
use crate::error::Error;
use crate::message::{
    AccessEventPayload, AlertPayload, DoorStatusPayload, EmergencyPayload, Envelope, Message,
    MessageKind, SystemStatusPayload, UserActivityPayload,
};
use crate::transport::{
    ConnectionState, PendingConnect, SharedConnect, Transport, lock, release_pending, set_state,
    set_state_within,
};

// ── SimulationConfig ─────────────────────────────────────────────────

/// Generator periods. A zero period disables that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Artificial handshake latency.
    pub connect_delay: Duration,
    pub door_status: Duration,
    pub access_event: Duration,
    pub new_alert: Duration,
    pub system_status: Duration,
    pub user_activity: Duration,
    pub emergency: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_millis(250),
            door_status: Duration::from_millis(4_000),
            access_event: Duration::from_millis(2_500),
            new_alert: Duration::from_millis(7_000),
            system_status: Duration::from_millis(15_000),
            user_activity: Duration::from_millis(6_000),
            emergency: Duration::ZERO,
        }
    }
}

impl SimulationConfig {
    /// No generators and no handshake delay: traffic only via `emit`.
    pub fn manual() -> Self {
        Self {
            connect_delay: Duration::ZERO,
            door_status: Duration::ZERO,
            access_event: Duration::ZERO,
            new_alert: Duration::ZERO,
            system_status: Duration::ZERO,
            user_activity: Duration::ZERO,
            emergency: Duration::ZERO,
        }
    }

    /// Generator period for `kind`. `ALERT_UPDATE` is never generated.
    pub fn period(&self, kind: MessageKind) -> Duration {
        match kind {
            MessageKind::DoorStatusUpdate => self.door_status,
            MessageKind::AccessEvent => self.access_event,
            MessageKind::NewAlert => self.new_alert,
            MessageKind::AlertUpdate => Duration::ZERO,
            MessageKind::SystemStatus => self.system_status,
            MessageKind::EmergencyLockdown => self.emergency,
            MessageKind::UserActivity => self.user_activity,
        }
    }
}

// ── SimulatedTransport ───────────────────────────────────────────────

/// Transport that never touches the network. Cheaply cloneable.
#[derive(Clone)]
pub struct SimulatedTransport {
    inner: Arc<Inner>,
}

struct Inner {
    config: SimulationConfig,
    dispatcher: Arc<Dispatcher>,
    state: watch::Sender<ConnectionState>,
    pending: PendingConnect,
    generators: Mutex<Option<CancellationToken>>,
    sent: Mutex<Vec<Envelope>>,
    generation: AtomicU64,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl SimulatedTransport {
    pub fn new(config: SimulationConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                dispatcher: Dispatcher::new(),
                state,
                pending: Mutex::new(None),
                generators: Mutex::new(None),
                sent: Mutex::new(Vec::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.inner.config
    }

    /// Deliver `message` to subscribers as if it had arrived on the wire.
    ///
    /// Returns `false` (and delivers nothing) while disconnected.
    pub fn emit(&self, message: Message) -> bool {
        let envelope = Envelope::new(message);
        if self.inner.current_state() != ConnectionState::Connected {
            tracing::warn!(kind = %envelope.kind(), "emit ignored: transport not connected");
            return false;
        }
        self.inner.dispatcher.dispatch(&envelope);
        true
    }

    /// Envelopes accepted by [`send`](Transport::send), oldest first.
    pub fn sent(&self) -> Vec<Envelope> {
        lock(&self.inner.sent).clone()
    }
}

impl Transport for SimulatedTransport {
    fn connect(&self) -> BoxFuture<'_, Result<(), Error>> {
        let inner = Arc::clone(&self.inner);
        async move {
            if inner.current_state() == ConnectionState::Connected {
                return Ok(());
            }
            Inner::connect_shared(&inner).await
        }
        .boxed()
    }

    fn disconnect(&self) {
        let inner = &self.inner;
        {
            let mut pending = lock(&inner.pending);
            inner.generation.fetch_add(1, Ordering::SeqCst);
            pending.take();
        }

        if let Some(token) = lock(&inner.generators).take() {
            set_state(&inner.state, ConnectionState::Closing);
            token.cancel();
        }
        inner.dispatcher.clear();

        set_state(&inner.state, ConnectionState::Disconnected);
        tracing::info!("simulated transport disconnected");
    }

    fn send(&self, envelope: Envelope) {
        let kind = envelope.kind();
        if self.inner.current_state() != ConnectionState::Connected {
            tracing::error!(%kind, "cannot send: transport not connected");
            return;
        }
        tracing::debug!(%kind, "simulated send");
        lock(&self.inner.sent).push(envelope);
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

impl Inner {
    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn connect_shared(this: &Arc<Self>) -> SharedConnect {
        let mut pending = lock(&this.pending);
        if let Some((_, attempt)) = pending.as_ref() {
            return attempt.clone();
        }

        let generation = this.generation.load(Ordering::SeqCst);
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

    async fn establish(this: Arc<Self>, generation: u64) -> Result<(), Error> {
        if !this.publish(generation, ConnectionState::Connecting) {
            return Err(Error::Disconnected);
        }
        tracing::info!("connecting to simulated event source");

        tokio::time::sleep(this.config.connect_delay).await;
        release_pending(&this.pending, generation);

        if this.generation.load(Ordering::SeqCst) != generation {
            return Err(Error::Disconnected);
        }

        let generators = Self::start_generators(&this);
        if !this.publish(generation, ConnectionState::Connected) {
            generators.cancel();
            return Err(Error::Disconnected);
        }
        tracing::info!("simulated transport connected");
        Ok(())
    }

    fn publish(&self, generation: u64, next: ConnectionState) -> bool {
        set_state_within(&self.state, &self.generation, generation, next)
    }

    fn start_generators(this: &Arc<Self>) -> CancellationToken {
        let cancel = CancellationToken::new();
        if let Some(previous) = lock(&this.generators).replace(cancel.clone()) {
            previous.cancel();
        }

        for kind in MessageKind::iter() {
            let period = this.config.period(kind);
            if period.is_zero() {
                continue;
            }
            tracing::debug!(%kind, period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX), "starting generator");
            tokio::spawn(Self::generate(
                Arc::clone(this),
                kind,
                period,
                cancel.child_token(),
            ));
        }
        cancel
    }

    async fn generate(this: Arc<Self>, kind: MessageKind, period: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let envelope = Envelope::new(random_message(kind));
                    this.dispatcher.dispatch(&envelope);
                }
            }
        }
        tracing::debug!(%kind, "generator stopped");
    }
}

// ── Random traffic ───────────────────────────────────────────────────

const DOOR_IDS: &[&str] = &[
    "door-001", "door-002", "door-003", "door-004", "door-005", "door-006", "door-007",
    "door-008",
];
const ZONE_IDS: &[&str] = &["zone-lobby", "zone-office", "zone-lab", "zone-datacenter"];
const FLOOR_IDS: &[&str] = &["floor-1", "floor-2", "floor-3"];
const USERS: &[(&str, &str)] = &[
    ("user-001", "Alex Morgan"),
    ("user-002", "Sam Rivera"),
    ("user-003", "Jordan Lee"),
    ("user-004", "Casey Kim"),
    ("user-005", "Riley Chen"),
];
const DOOR_STATUSES: &[&str] = &["LOCKED", "UNLOCKED", "FORCED_OPEN", "HELD_OPEN", "OFFLINE"];
const CREDENTIALS: &[&str] = &["CARD", "PIN", "MOBILE", "BIOMETRIC"];
const DENIAL_REASONS: &[&str] = &[
    "Invalid credential",
    "Outside schedule",
    "Access level insufficient",
    "Credential expired",
];
const ALERT_TYPES: &[&str] = &["SECURITY", "SYSTEM", "ACCESS", "EMERGENCY"];
const SEVERITIES: &[&str] = &["CRITICAL", "HIGH", "MEDIUM", "LOW", "INFO"];
const COMPONENTS: &[&str] = &["controller-a", "controller-b", "event-bus", "database"];
const COMPONENT_STATUSES: &[&str] = &["healthy", "degraded", "offline"];
const ACTIVITIES: &[&str] = &["login", "logout", "viewed_door", "exported_report"];

fn pick<'a, R: Rng>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn door_name(door_id: &str) -> String {
    let n = door_id.trim_start_matches("door-");
    format!("Door {n}")
}

/// A random, schema-valid message of `kind`.
pub fn random_message(kind: MessageKind) -> Message {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    match kind {
        MessageKind::DoorStatusUpdate => {
            let door_id = pick(&mut rng, DOOR_IDS);
            let status = pick(&mut rng, DOOR_STATUSES);
            Message::DoorStatusUpdate(DoorStatusPayload {
                door_id: door_id.to_owned(),
                status: status.to_owned(),
                timestamp: now,
                name: Some(door_name(door_id)),
                location: None,
                floor_id: Some(pick(&mut rng, FLOOR_IDS).to_owned()),
                zone_id: Some(pick(&mut rng, ZONE_IDS).to_owned()),
                controller_id: Some(pick(&mut rng, COMPONENTS).to_owned()),
                is_online: Some(status != "OFFLINE"),
            })
        }
        MessageKind::AccessEvent => {
            let (user_id, user_name) = USERS.choose(&mut rng).copied().unwrap_or(("user-000", "Unknown"));
            let door_id = pick(&mut rng, DOOR_IDS);
            let granted = rng.gen_bool(0.8);
            Message::AccessEvent(AccessEventPayload {
                id: Some(uuid::Uuid::new_v4().to_string()),
                user_id: user_id.to_owned(),
                user_name: user_name.to_owned(),
                door_id: Some(door_id.to_owned()),
                door_name: door_name(door_id),
                result: if granted { "granted" } else { "denied" }.to_owned(),
                timestamp: now,
                credential_type: Some(pick(&mut rng, CREDENTIALS).to_owned()),
                denial_reason: (!granted).then(|| pick(&mut rng, DENIAL_REASONS).to_owned()),
                anomaly_score: Some(rng.gen_range(0.0..1.0)),
            })
        }
        MessageKind::NewAlert | MessageKind::AlertUpdate => {
            let alert_type = pick(&mut rng, ALERT_TYPES);
            let severity = pick(&mut rng, SEVERITIES);
            let door_id = pick(&mut rng, DOOR_IDS);
            let alert = AlertPayload {
                id: uuid::Uuid::new_v4().to_string(),
                alert_type: alert_type.to_owned(),
                severity: severity.to_owned(),
                title: format!("{severity} {alert_type} alert"),
                message: format!("Activity requires attention at {}", door_name(door_id)),
                timestamp: now,
                acknowledged: false,
                acknowledged_by: None,
                acknowledged_at: None,
                related_entity_id: Some(door_id.to_owned()),
                related_entity_type: Some("DOOR".to_owned()),
            };
            if kind == MessageKind::NewAlert {
                Message::NewAlert(alert)
            } else {
                Message::AlertUpdate(alert)
            }
        }
        MessageKind::SystemStatus => Message::SystemStatus(SystemStatusPayload {
            component: pick(&mut rng, COMPONENTS).to_owned(),
            status: pick(&mut rng, COMPONENT_STATUSES).to_owned(),
            message: None,
        }),
        MessageKind::EmergencyLockdown => {
            let active = rng.gen_bool(0.3);
            let zone_ids = if active {
                let count = rng.gen_range(1..=ZONE_IDS.len());
                ZONE_IDS
                    .choose_multiple(&mut rng, count)
                    .map(|z| (*z).to_owned())
                    .collect()
            } else {
                Vec::new()
            };
            Message::EmergencyLockdown(EmergencyPayload {
                active,
                zone_ids,
                reason: active.then(|| "Simulated lockdown drill".to_owned()),
                initiated_by: Some("simulator".to_owned()),
            })
        }
        MessageKind::UserActivity => {
            let (user_id, _) = USERS.choose(&mut rng).copied().unwrap_or(("user-000", "Unknown"));
            Message::UserActivity(UserActivityPayload {
                user_id: user_id.to_owned(),
                activity: pick(&mut rng, ACTIVITIES).to_owned(),
                details: None,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::dispatch::handler;

    fn counter(t: &SimulatedTransport, kind: MessageKind) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let sub = t.subscribe(
            kind,
            handler(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        (hits, sub)
    }

    #[test]
    fn generated_messages_survive_the_wire() {
        for kind in MessageKind::iter() {
            for _ in 0..20 {
                let envelope = Envelope::new(random_message(kind));
                let text = envelope.to_json().unwrap();
                let parsed = Envelope::parse(&text).unwrap();
                assert_eq!(parsed.kind(), kind);
            }
        }
    }

    #[test]
    fn denied_access_carries_reason() {
        for _ in 0..50 {
            let Message::AccessEvent(event) = random_message(MessageKind::AccessEvent) else {
                panic!("wrong variant");
            };
            assert_eq!(event.result == "denied", event.denial_reason.is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn generators_follow_their_period() {
        let t = SimulatedTransport::new(SimulationConfig {
            door_status: Duration::from_secs(1),
            ..SimulationConfig::manual()
        });
        let (doors, _d) = counter(&t, MessageKind::DoorStatusUpdate);
        let (alerts, _a) = counter(&t, MessageKind::NewAlert);

        t.connect().await.unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        assert_eq!(doors.load(Ordering::SeqCst), 3);
        assert_eq!(alerts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_stops_generators() {
        let t = SimulatedTransport::new(SimulationConfig {
            access_event: Duration::from_secs(1),
            ..SimulationConfig::manual()
        });
        let (hits, _sub) = counter(&t, MessageKind::AccessEvent);

        t.connect().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        t.disconnect();
        let seen = hits.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), seen);
        assert_eq!(t.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_is_shared_and_idempotent() {
        let t = SimulatedTransport::new(SimulationConfig {
            connect_delay: Duration::from_millis(500),
            ..SimulationConfig::manual()
        });
        let mut states = t.watch_state();

        let (a, b) = tokio::join!(t.connect(), t.connect());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(t.connection_state(), ConnectionState::Connected);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), ConnectionState::Connected);

        t.connect().await.unwrap();
        assert!(!states.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_during_connect_aborts_attempt() {
        let t = SimulatedTransport::new(SimulationConfig {
            connect_delay: Duration::from_secs(1),
            ..SimulationConfig::manual()
        });
        let attempt = {
            let t = t.clone();
            tokio::spawn(async move { t.connect().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        t.disconnect();

        assert!(matches!(attempt.await.unwrap(), Err(Error::Disconnected)));
        assert_eq!(t.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_before_attempt_runs_voids_it() {
        let t = SimulatedTransport::new(SimulationConfig {
            connect_delay: Duration::from_millis(50),
            ..SimulationConfig::manual()
        });
        let mut states = t.watch_state();

        let attempt = Inner::connect_shared(&t.inner);
        t.disconnect();
        states.mark_unchanged();

        assert!(matches!(attempt.await, Err(Error::Disconnected)));
        assert_eq!(t.connection_state(), ConnectionState::Disconnected);
        assert!(!states.has_changed().unwrap());

        // The voided attempt does not block the next one.
        t.connect().await.unwrap();
        assert_eq!(t.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn emit_requires_connection() {
        let t = SimulatedTransport::new(SimulationConfig::manual());
        let (hits, _sub) = counter(&t, MessageKind::SystemStatus);
        let status = || {
            Message::SystemStatus(SystemStatusPayload {
                component: "panel".into(),
                status: "healthy".into(),
                message: None,
            })
        };

        assert!(!t.emit(status()));
        t.connect().await.unwrap();
        assert!(t.emit(status()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn send_is_recorded_only_when_connected() {
        let t = SimulatedTransport::new(SimulationConfig::manual());
        let envelope = Envelope::new(random_message(MessageKind::AlertUpdate));

        t.send(envelope.clone());
        assert!(t.sent().is_empty());

        t.connect().await.unwrap();
        t.send(envelope.clone());
        assert_eq!(t.sent(), vec![envelope]);
    }
}
