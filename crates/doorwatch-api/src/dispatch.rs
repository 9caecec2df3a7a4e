//! Type-indexed fan-out of envelopes to registered handlers.
//!
//! Handlers for one [`MessageKind`] run in registration order. Each dispatch
//! pass works on a snapshot of the handler list, so registrations and
//! removals made while a pass is running only affect later passes. Every
//! handler runs behind its own isolation boundary: a returned error or a
//! panic is logged and the remaining handlers still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::message::{Envelope, MessageKind};

/// Error a handler may return. Logged at the dispatch boundary.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<(), HandlerError>;

/// A subscriber callback.
pub type Handler = Arc<dyn Fn(&Envelope) -> HandlerResult + Send + Sync>;

/// Box a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Envelope) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

struct Registered {
    id: u64,
    handler: Handler,
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Handlers invoked.
    pub invoked: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

/// Routes each envelope to every handler registered for its exact kind.
#[derive(Default)]
pub struct Dispatcher {
    handlers: DashMap<MessageKind, Vec<Registered>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `handler` for `kind`. The returned [`Subscription`] removes
    /// exactly this registration.
    pub fn subscribe(self: &Arc<Self>, kind: MessageKind, handler: Handler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .entry(kind)
            .or_default()
            .push(Registered { id, handler });

        tracing::trace!(%kind, id, "handler registered");

        Subscription {
            kind,
            id,
            dispatcher: Arc::downgrade(self),
        }
    }

    /// Deliver `envelope` to every handler registered for its kind.
    pub fn dispatch(&self, envelope: &Envelope) -> DispatchOutcome {
        let kind = envelope.kind();

        // Snapshot, then release the shard lock before calling out so
        // handlers may (un)subscribe without deadlocking.
        let snapshot: Vec<Handler> = match self.handlers.get(&kind) {
            Some(list) => list.iter().map(|r| Arc::clone(&r.handler)).collect(),
            None => Vec::new(),
        };

        let mut outcome = DispatchOutcome::default();
        for handler in snapshot {
            outcome.invoked += 1;
            match catch_unwind(AssertUnwindSafe(|| handler(envelope))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    outcome.failed += 1;
                    tracing::warn!(%kind, error = %e, "handler failed");
                }
                Err(panic) => {
                    outcome.failed += 1;
                    tracing::error!(%kind, panic = panic_message(&*panic), "handler panicked");
                }
            }
        }
        outcome
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: MessageKind) -> usize {
        self.handlers.get(&kind).map_or(0, |list| list.len())
    }

    /// Whether `kind` currently has an entry at all.
    pub fn has_kind(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.handlers.clear();
    }

    fn remove(&self, kind: MessageKind, id: u64) -> bool {
        let removed = {
            let Some(mut list) = self.handlers.get_mut(&kind) else {
                return false;
            };
            let before = list.len();
            list.retain(|r| r.id != id);
            before != list.len()
        };
        // No empty lists left behind.
        self.handlers.remove_if(&kind, |_, list| list.is_empty());
        removed
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<(MessageKind, usize)> = self
            .handlers
            .iter()
            .map(|entry| (*entry.key(), entry.value().len()))
            .collect();
        kinds.sort();
        f.debug_struct("Dispatcher").field("handlers", &kinds).finish()
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// Token for one handler registration.
///
/// Dropping the token does not unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe).
#[derive(Debug)]
pub struct Subscription {
    kind: MessageKind,
    id: u64,
    dispatcher: Weak<Dispatcher>,
}

impl Subscription {
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Remove this registration. Returns `false` if it was already gone
    /// (for example after the transport released all subscriptions).
    pub fn unsubscribe(self) -> bool {
        self.dispatcher
            .upgrade()
            .is_some_and(|d| d.remove(self.kind, self.id))
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

// ── Tests ────────────────────────────────────────────────────────────
