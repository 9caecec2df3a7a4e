// ── Backend component health ──
//
// Latest SYSTEM_STATUS per component, in first-reported order.

use std::sync::Arc;

use indexmap::IndexMap;

use super::cell::StoreCell;
use crate::model::{ComponentHealth, ComponentStatus};
use crate::stream::StoreStream;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemState {
    pub components: IndexMap<String, ComponentStatus>,
}

impl SystemState {
    /// Worst health across components; `Unknown` when nothing has reported.
    pub fn overall(&self) -> ComponentHealth {
        let healths = self.components.values().map(|c| c.health);
        if self.components.is_empty() {
            ComponentHealth::Unknown
        } else if healths.clone().any(|h| h == ComponentHealth::Offline) {
            ComponentHealth::Offline
        } else if healths.clone().any(|h| h == ComponentHealth::Degraded) {
            ComponentHealth::Degraded
        } else if healths.clone().all(|h| h == ComponentHealth::Healthy) {
            ComponentHealth::Healthy
        } else {
            ComponentHealth::Unknown
        }
    }
}

pub struct SystemStatusStore {
    cell: StoreCell<SystemState>,
}

impl Default for SystemStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStatusStore {
    pub fn new() -> Self {
        Self {
            cell: StoreCell::new(SystemState::default()),
        }
    }

    pub fn record(&self, status: ComponentStatus) -> bool {
        self.cell.update(|state| {
            let mut components = state.components.clone();
            components.insert(status.component.clone(), status);
            Some(SystemState { components })
        })
    }

    pub fn snapshot(&self) -> Arc<SystemState> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> StoreStream<SystemState> {
        self.cell.subscribe()
    }
}
