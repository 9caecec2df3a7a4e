// ── Event pipeline ──
//
// The composition root: one transport feeding one set of stores. Owns
// the subscriptions it registers and tears them down on shutdown.

use std::sync::{Arc, Mutex, PoisonError};

use doorwatch_api::{
    AlertPayload, ConnectionState, Envelope, Message, MessageKind, Subscription, Transport, handler,
};
use strum::IntoEnumIterator;
use tokio::sync::{broadcast, watch};

use crate::config::RuntimeConfig;
use crate::convert::{self, ConversionError};
use crate::error::CoreError;
use crate::model::{AccessEvent, Alert};
use crate::persist::KeyValueStore;
use crate::store::Stores;
use crate::view::ConnectionIndicator;

const ACTIVITY_CHANNEL_SIZE: usize = 256;

/// Wires a [`Transport`] into [`Stores`].
///
/// Cheaply cloneable; clones drive the same pipeline.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    transport: Arc<dyn Transport>,
    stores: Arc<Stores>,
    activity: broadcast::Sender<Arc<Envelope>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>, stores: Arc<Stores>) -> Self {
        let (activity, _) = broadcast::channel(ACTIVITY_CHANNEL_SIZE);
        Self {
            inner: Arc::new(PipelineInner {
                transport,
                stores,
                activity,
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Build the transport and stores `config` describes.
    pub fn from_config(config: &RuntimeConfig, kv: Arc<dyn KeyValueStore>) -> Self {
        let stores = Arc::new(Stores::new(&config.limits, kv));
        Self::new(config.build_transport(), stores)
    }

    pub fn stores(&self) -> &Arc<Stores> {
        &self.inner.stores
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Register one handler per message kind, then connect.
    ///
    /// Handlers stay registered when the connect fails, so traffic flows
    /// as soon as a scheduled reconnect succeeds.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.subscribe_all();
        self.inner.transport.connect().await?;
        tracing::info!("pipeline started");
        Ok(())
    }

    /// Unregister every handler and disconnect.
    pub fn shutdown(&self) {
        let subscriptions = std::mem::take(&mut *self.lock_subscriptions());
        for sub in subscriptions {
            sub.unsubscribe();
        }
        self.inner.transport.disconnect();
        tracing::info!("pipeline shut down");
    }

    fn subscribe_all(&self) {
        let mut subscriptions = self.lock_subscriptions();
        if !subscriptions.is_empty() {
            return;
        }

        for kind in MessageKind::iter() {
            let stores = Arc::clone(&self.inner.stores);
            let activity = self.inner.activity.clone();
            let sub = self.inner.transport.subscribe(
                kind,
                handler(move |envelope| {
                    route(&stores, envelope)?;
                    // No receivers is fine: nobody is watching the feed.
                    let _ = activity.send(Arc::new(envelope.clone()));
                    Ok(())
                }),
            );
            subscriptions.push(sub);
        }
        tracing::debug!(handlers = subscriptions.len(), "pipeline handlers registered");
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<Subscription>> {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Operator actions ─────────────────────────────────────────────

    /// Acknowledge locally, then tell the event source.
    ///
    /// Returns `false` (and sends nothing) if the alert is unknown or was
    /// already acknowledged.
    pub fn acknowledge_alert(&self, id: &str, user_id: &str) -> bool {
        let stores = &self.inner.stores;
        if !stores.alerts.acknowledge_alert(id, user_id) {
            return false;
        }
        if let Some(alert) = stores.alerts.get(id) {
            let payload = AlertPayload::from(alert.as_ref());
            self.inner
                .transport
                .send(Envelope::new(Message::AlertUpdate(payload)));
        }
        true
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Every envelope the pipeline applied, in arrival order.
    pub fn activity(&self) -> broadcast::Receiver<Arc<Envelope>> {
        self.inner.activity.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.transport.connection_state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.inner.transport.watch_state()
    }

    pub fn connection_indicator(&self) -> ConnectionIndicator {
        ConnectionIndicator::from(self.connection_state())
    }
}

// ── Routing ──────────────────────────────────────────────────────────

/// Apply one envelope to the stores.
pub fn route(stores: &Stores, envelope: &Envelope) -> Result<(), ConversionError> {
    match &envelope.message {
        Message::DoorStatusUpdate(p) => {
            let existing = stores.doors.door(&p.door_id);
            let door = convert::merge_door_status(existing.as_deref(), p)?;
            stores.doors.update_door(door);
        }
        Message::AccessEvent(p) => {
            stores.access_events.add_event(AccessEvent::try_from(p)?);
        }
        Message::NewAlert(p) => {
            stores.alerts.add_alert(Alert::try_from(p)?);
        }
        Message::AlertUpdate(p) => {
            if p.acknowledged {
                let by = p.acknowledged_by.as_deref().unwrap_or("unknown");
                stores.alerts.acknowledge_alert(&p.id, by);
            } else {
                tracing::debug!(alert_id = %p.id, "ignoring non-acknowledging alert update");
            }
        }
        Message::SystemStatus(p) => {
            stores
                .system
                .record(convert::component_status(p, envelope.timestamp));
        }
        Message::EmergencyLockdown(p) => {
            if p.active {
                stores
                    .emergency
                    .activate_emergency(p.zone_ids.iter().cloned(), p.reason.clone());
            } else {
                stores.emergency.deactivate_emergency();
            }
        }
        Message::UserActivity(p) => {
            tracing::debug!(user_id = %p.user_id, activity = %p.activity, "user activity");
        }
    }
    Ok(())
}
