// ── Emergency lockdown store ──

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use super::cell::StoreCell;
use crate::model::EmergencyState;
use crate::stream::StoreStream;

pub struct EmergencyStore {
    cell: StoreCell<EmergencyState>,
}

impl Default for EmergencyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencyStore {
    pub fn new() -> Self {
        Self {
            cell: StoreCell::new(EmergencyState::default()),
        }
    }

    /// Enter (or re-scope) lockdown for `zone_ids`.
    ///
    /// While already active, the zone set and reason are replaced but the
    /// original activation time is kept.
    pub fn activate_emergency(
        &self,
        zone_ids: impl IntoIterator<Item = String>,
        reason: Option<String>,
    ) -> bool {
        let affected_zones: BTreeSet<String> = zone_ids.into_iter().collect();
        self.cell.update(|state| {
            if state.active && state.affected_zones == affected_zones && state.reason == reason {
                return None;
            }
            let activated_at = if state.active {
                state.activated_at
            } else {
                Some(Utc::now())
            };
            tracing::warn!(zones = affected_zones.len(), "emergency lockdown active");
            Some(EmergencyState {
                active: true,
                affected_zones,
                activated_at,
                reason,
            })
        })
    }

    /// Leave lockdown. No-op when not active.
    pub fn deactivate_emergency(&self) -> bool {
        self.cell.update(|state| {
            if !state.active {
                return None;
            }
            tracing::info!("emergency lockdown lifted");
            Some(EmergencyState::default())
        })
    }

    pub fn snapshot(&self) -> Arc<EmergencyState> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> StoreStream<EmergencyState> {
        self.cell.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.snapshot().active
    }
}
