// ── Reactive state cell ──
//
// One immutable snapshot per store, published through a `watch` channel.
// Every accepted mutation swaps in a fresh `Arc`, so `Arc::ptr_eq` on two
// snapshots tells a subscriber whether anything changed in between.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::stream::StoreStream;

pub(crate) struct StoreCell<S: Send + Sync + 'static> {
    snapshot: watch::Sender<Arc<S>>,

    /// Bumped on every published mutation.
    version: AtomicU64,
}

impl<S: Send + Sync + 'static> StoreCell<S> {
    pub(crate) fn new(initial: S) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(initial));
        Self {
            snapshot,
            version: AtomicU64::new(0),
        }
    }

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<S> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> StoreStream<S> {
        StoreStream::new(self.snapshot.subscribe())
    }

    pub(crate) fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Compute the next state from the current one.
    ///
    /// `next` returns `None` for a no-op, which leaves the published `Arc`
    /// untouched and wakes nobody. Runs under the channel's write lock, so
    /// concurrent updates serialize. Returns whether a new snapshot was
    /// published.
    pub(crate) fn update(&self, next: impl FnOnce(&S) -> Option<S>) -> bool {
        self.snapshot.send_if_modified(|current| match next(current.as_ref()) {
            Some(state) => {
                *current = Arc::new(state);
                self.version.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        })
    }
}
