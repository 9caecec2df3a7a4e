//! The transport capability shared by the live and simulated implementations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::dispatch::{Handler, Subscription};
use crate::error::Error;
use crate::message::{Envelope, MessageKind};

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Closing,
    Disconnected,
    Unknown,
}

// ── ReconnectPolicy ──────────────────────────────────────────────────

/// Fixed-interval, bounded reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay between attempts. Default: 5s.
    pub interval: Duration,

    /// Attempts after an unexpected close before giving up. Default: 10.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 10,
        }
    }
}

// ── Transport ────────────────────────────────────────────────────────

/// One logical connection to the event source.
///
/// Implementations deliver every successfully parsed envelope to the
/// handlers registered through [`subscribe`](Self::subscribe). Swapping one
/// implementation for another requires no change in any consumer.
pub trait Transport: Send + Sync {
    /// Open the connection.
    ///
    /// Resolves immediately when already connected. Concurrent callers
    /// share a single in-flight attempt. A failed attempt schedules
    /// reconnection according to the transport's policy.
    fn connect(&self) -> BoxFuture<'_, Result<(), Error>>;

    /// Cancel pending reconnects, close the connection, and release all
    /// subscriptions.
    fn disconnect(&self);

    /// Send an envelope. Logs and drops it when not connected.
    fn send(&self, envelope: Envelope);

    /// Register `handler` for `kind`.
    fn subscribe(&self, kind: MessageKind, handler: Handler) -> Subscription;

    /// Current connection state. Pure read.
    fn connection_state(&self) -> ConnectionState;

    /// Observe connection state transitions.
    fn watch_state(&self) -> watch::Receiver<ConnectionState>;
}

// ── Shared plumbing ──────────────────────────────────────────────────

/// A connect attempt that every concurrent caller awaits.
pub(crate) type SharedConnect = Shared<BoxFuture<'static, Result<(), Error>>>;

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The in-flight attempt, tagged with the disconnect generation it
/// started under.
pub(crate) type PendingConnect = Mutex<Option<(u64, SharedConnect)>>;

/// Clear `pending` only if it still holds the attempt from `generation`.
pub(crate) fn release_pending(pending: &PendingConnect, generation: u64) {
    let mut slot = lock(pending);
    if slot.as_ref().is_some_and(|(g, _)| *g == generation) {
        slot.take();
    }
}

/// Publish `next` if it differs from the current state.
pub(crate) fn set_state(tx: &watch::Sender<ConnectionState>, next: ConnectionState) {
    tx.send_if_modified(|state| transition(state, next));
}

/// Publish `next` only while `generation` is still current.
///
/// The check runs under the channel's write lock, so a concurrent
/// disconnect either lands first (and this is skipped) or overwrites it.
pub(crate) fn set_state_within(
    tx: &watch::Sender<ConnectionState>,
    current: &AtomicU64,
    generation: u64,
    next: ConnectionState,
) -> bool {
    let mut applied = false;
    tx.send_if_modified(|state| {
        if current.load(Ordering::SeqCst) != generation {
            return false;
        }
        applied = true;
        transition(state, next)
    });
    applied
}

fn transition(state: &mut ConnectionState, next: ConnectionState) -> bool {
    if *state == next {
        false
    } else {
        tracing::debug!(from = %state, to = %next, "connection state changed");
        *state = next;
        true
    }
}
