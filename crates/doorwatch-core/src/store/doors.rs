// ── Door store ──
//
// Doors keyed by id in first-seen order. Upserts replace the whole door;
// an id never appears twice.

use std::sync::Arc;

use indexmap::IndexMap;

use super::cell::StoreCell;
use crate::model::Door;
use crate::stream::StoreStream;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoorState {
    pub doors: IndexMap<String, Arc<Door>>,
}

pub struct DoorStore {
    cell: StoreCell<DoorState>,
}

impl Default for DoorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DoorStore {
    pub fn new() -> Self {
        Self {
            cell: StoreCell::new(DoorState::default()),
        }
    }

    /// Insert or replace one door. Returns `false` if nothing changed.
    pub fn update_door(&self, door: Door) -> bool {
        self.update_multiple_doors([door])
    }

    /// Insert or replace many doors in a single published change.
    ///
    /// Later entries win when the batch names an id twice.
    pub fn update_multiple_doors(&self, doors: impl IntoIterator<Item = Door>) -> bool {
        let doors: Vec<Door> = doors.into_iter().collect();
        self.cell.update(|state| {
            let changed = doors
                .iter()
                .any(|d| state.doors.get(&d.id).is_none_or(|cur| **cur != *d));
            if !changed {
                return None;
            }

            let mut next = state.doors.clone();
            for door in doors {
                next.insert(door.id.clone(), Arc::new(door));
            }
            Some(DoorState { doors: next })
        })
    }

    pub fn snapshot(&self) -> Arc<DoorState> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> StoreStream<DoorState> {
        self.cell.subscribe()
    }

    pub fn door(&self, id: &str) -> Option<Arc<Door>> {
        self.snapshot().doors.get(id).cloned()
    }

    pub fn doors_in_zone(&self, zone_id: &str) -> Vec<Arc<Door>> {
        self.snapshot()
            .doors
            .values()
            .filter(|d| d.zone_id == zone_id)
            .cloned()
            .collect()
    }

    pub fn offline_count(&self) -> usize {
        self.snapshot()
            .doors
            .values()
            .filter(|d| d.is_offline())
            .count()
    }

    pub fn len(&self) -> usize {
        self.snapshot().doors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().doors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DoorStatus;

    fn door(id: &str, zone: &str, status: DoorStatus) -> Door {
        let mut d = Door::placeholder(id, status);
        d.zone_id = zone.into();
        d
    }

    #[test]
    fn upsert_never_duplicates() {
        let store = DoorStore::new();
        store.update_door(door("d1", "z1", DoorStatus::Locked));
        store.update_door(door("d1", "z1", DoorStatus::Unlocked));
        store.update_multiple_doors([
            door("d1", "z1", DoorStatus::HeldOpen),
            door("d2", "z2", DoorStatus::Locked),
            door("d2", "z2", DoorStatus::Offline),
        ]);

        let state = store.snapshot();
        assert_eq!(state.doors.len(), 2);
        assert_eq!(state.doors["d1"].status, DoorStatus::HeldOpen);
        assert_eq!(state.doors["d2"].status, DoorStatus::Offline);
    }

    #[test]
    fn identical_upsert_keeps_snapshot() {
        let store = DoorStore::new();
        store.update_door(door("d1", "z1", DoorStatus::Locked));
        let before = store.snapshot();

        assert!(!store.update_door(door("d1", "z1", DoorStatus::Locked)));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));

        assert!(store.update_door(door("d1", "z1", DoorStatus::Unlocked)));
        assert!(!Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn batch_matches_sequential_updates() {
        let input = [
            door("d1", "z1", DoorStatus::Locked),
            door("d2", "z1", DoorStatus::Unlocked),
            door("d1", "z2", DoorStatus::ForcedOpen),
        ];

        let sequential = DoorStore::new();
        for d in input.clone() {
            sequential.update_door(d);
        }
        let batched = DoorStore::new();
        batched.update_multiple_doors(input);

        assert_eq!(*sequential.snapshot(), *batched.snapshot());
    }

    #[test]
    fn batch_publishes_once() {
        let store = DoorStore::new();
        store.update_multiple_doors((0..10).map(|i| door(&format!("d{i}"), "z", DoorStatus::Locked)));
        assert_eq!(store.len(), 10);
        assert_eq!(store.cell.version(), 1);
    }

    #[test]
    fn lookups() {
        let store = DoorStore::new();
        store.update_multiple_doors([
            door("d1", "lobby", DoorStatus::Locked),
            door("d2", "lobby", DoorStatus::Offline),
            door("d3", "lab", DoorStatus::Locked),
        ]);

        assert_eq!(store.doors_in_zone("lobby").len(), 2);
        assert_eq!(store.offline_count(), 1);
        assert_eq!(store.door("d3").map(|d| d.zone_id.clone()).as_deref(), Some("lab"));
        assert!(store.door("nope").is_none());
    }
}
