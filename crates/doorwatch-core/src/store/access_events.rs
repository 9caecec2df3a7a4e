// ── Access event store ──
//
// Append-only log of badge-in attempts, newest first, bounded.

use std::sync::Arc;

use super::cell::StoreCell;
use crate::model::AccessEvent;
use crate::stream::StoreStream;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessEventState {
    /// Newest first.
    pub events: Vec<Arc<AccessEvent>>,
}

pub struct AccessEventStore {
    cell: StoreCell<AccessEventState>,
    max_events: usize,
}

impl AccessEventStore {
    pub fn new(max_events: usize) -> Self {
        Self {
            cell: StoreCell::new(AccessEventState::default()),
            max_events,
        }
    }

    /// Record an event, dropping the oldest beyond capacity.
    pub fn add_event(&self, event: AccessEvent) -> bool {
        let max = self.max_events;
        self.cell.update(|state| {
            let mut events = Vec::with_capacity((state.events.len() + 1).min(max));
            events.push(Arc::new(event));
            events.extend(state.events.iter().take(max.saturating_sub(1)).cloned());
            events.truncate(max);
            Some(AccessEventState { events })
        })
    }

    pub fn snapshot(&self) -> Arc<AccessEventState> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> StoreStream<AccessEventState> {
        self.cell.subscribe()
    }

    pub fn denied_count(&self) -> usize {
        self.snapshot().events.iter().filter(|e| e.is_denied()).count()
    }

    /// Retained events at `door_id`, newest first.
    pub fn events_for_door(&self, door_id: &str) -> Vec<Arc<AccessEvent>> {
        self.snapshot()
            .events
            .iter()
            .filter(|e| e.door_id == door_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::{AccessResult, CredentialType};

    fn event(id: &str, door_id: &str, result: AccessResult) -> AccessEvent {
        AccessEvent {
            id: id.into(),
            user_id: "user-1".into(),
            user_name: "Alex".into(),
            door_id: door_id.into(),
            door_name: door_id.into(),
            timestamp: Utc::now(),
            result,
            credential_type: CredentialType::Card,
            denial_reason: None,
            anomaly_score: None,
        }
    }

    #[test]
    fn bounded_newest_first() {
        let store = AccessEventStore::new(1000);
        for i in 0..1005 {
            store.add_event(event(&format!("e{i}"), "d1", AccessResult::Granted));
        }
        let state = store.snapshot();
        assert_eq!(state.events.len(), 1000);
        assert_eq!(state.events[0].id, "e1004");
        assert_eq!(state.events[999].id, "e5");
    }

    #[test]
    fn derived_queries() {
        let store = AccessEventStore::new(10);
        store.add_event(event("e1", "d1", AccessResult::Granted));
        store.add_event(event("e2", "d2", AccessResult::Denied));
        store.add_event(event("e3", "d1", AccessResult::Denied));

        assert_eq!(store.denied_count(), 2);
        let ids: Vec<_> = store
            .events_for_door("d1")
            .iter()
            .map(|e| e.id.clone())
            .collect();
        assert_eq!(ids, ["e3", "e1"]);
    }
}
