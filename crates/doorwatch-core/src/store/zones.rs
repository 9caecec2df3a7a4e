// ── Zone store ──

use std::sync::Arc;

use super::cell::StoreCell;
use crate::model::Zone;
use crate::stream::StoreStream;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneState {
    pub zones: Vec<Arc<Zone>>,
    /// Always one of `zones` (same id, same value) or `None`.
    pub selected: Option<Arc<Zone>>,
}

impl ZoneState {
    pub fn get(&self, id: &str) -> Option<&Arc<Zone>> {
        self.zones.iter().find(|z| z.id == id)
    }
}

pub struct ZoneStore {
    cell: StoreCell<ZoneState>,
}

impl Default for ZoneStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneStore {
    pub fn new() -> Self {
        Self {
            cell: StoreCell::new(ZoneState::default()),
        }
    }

    /// Replace the whole zone list. The selection follows its id into the
    /// new list, or is cleared if the zone is gone.
    pub fn set_zones(&self, zones: Vec<Zone>) -> bool {
        self.cell.update(|state| {
            let zones: Vec<Arc<Zone>> = zones.into_iter().map(Arc::new).collect();
            let selected = state
                .selected
                .as_ref()
                .and_then(|sel| zones.iter().find(|z| z.id == sel.id).cloned());
            let next = ZoneState { zones, selected };
            (next != *state).then_some(next)
        })
    }

    /// Replace one zone by id. Unknown ids are ignored.
    pub fn update_zone(&self, zone: Zone) -> bool {
        self.cell.update(|state| {
            let index = state.zones.iter().position(|z| z.id == zone.id)?;
            if *state.zones[index] == zone {
                return None;
            }

            let zone = Arc::new(zone);
            let mut zones = state.zones.clone();
            zones[index] = Arc::clone(&zone);
            let selected = match &state.selected {
                Some(sel) if sel.id == zone.id => Some(zone),
                other => other.clone(),
            };
            Some(ZoneState { zones, selected })
        })
    }

    /// Select a zone by id, or clear the selection with `None`.
    /// Returns `false` for an unknown id.
    pub fn select_zone(&self, id: Option<&str>) -> bool {
        self.cell.update(|state| {
            let selected = match id {
                Some(id) => Some(Arc::clone(state.get(id)?)),
                None => None,
            };
            if selected.as_ref().map(|z| &z.id) == state.selected.as_ref().map(|z| &z.id) {
                return None;
            }
            Some(ZoneState {
                zones: state.zones.clone(),
                selected,
            })
        })
    }

    pub fn snapshot(&self) -> Arc<ZoneState> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> StoreStream<ZoneState> {
        self.cell.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SecurityLevel;

    fn zone(id: &str, occupancy: u32) -> Zone {
        Zone {
            id: id.into(),
            name: id.to_uppercase(),
            floor_id: "floor-1".into(),
            occupancy,
            capacity: 20,
            security_level: SecurityLevel::Medium,
            active_alerts: 0,
        }
    }

    #[test]
    fn update_refreshes_selection_with_matching_id() {
        let store = ZoneStore::new();
        store.set_zones(vec![zone("a", 1), zone("b", 2)]);
        assert!(store.select_zone(Some("a")));

        assert!(store.update_zone(zone("a", 9)));
        let state = store.snapshot();
        assert_eq!(state.selected.as_ref().map(|z| z.occupancy), Some(9));

        assert!(store.update_zone(zone("b", 5)));
        let state = store.snapshot();
        assert_eq!(state.selected.as_ref().map(|z| z.id.as_str()), Some("a"));
        assert_eq!(state.selected.as_ref().map(|z| z.occupancy), Some(9));
    }

    #[test]
    fn unknown_zone_update_is_noop() {
        let store = ZoneStore::new();
        store.set_zones(vec![zone("a", 1)]);
        let before = store.snapshot();
        assert!(!store.update_zone(zone("ghost", 1)));
        assert!(!store.select_zone(Some("ghost")));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn set_zones_drops_vanished_selection() {
        let store = ZoneStore::new();
        store.set_zones(vec![zone("a", 1), zone("b", 1)]);
        store.select_zone(Some("b"));

        store.set_zones(vec![zone("a", 3)]);
        assert!(store.snapshot().selected.is_none());
    }
}
