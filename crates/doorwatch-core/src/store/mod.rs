// ── Reactive domain stores ──
//
// One store per concern, each publishing immutable snapshots. `Stores`
// bundles them for the pipeline; it is constructed explicitly and passed
// around, never reached through a global.

mod access_events;
mod alerts;
pub(crate) mod cell;
mod doors;
mod emergency;
mod incidents;
mod preferences;
mod system;
mod zones;

use std::sync::Arc;

pub use access_events::{AccessEventState, AccessEventStore};
pub use alerts::{AlertState, AlertStore};
pub use doors::{DoorState, DoorStore};
pub use emergency::EmergencyStore;
pub use incidents::{IncidentState, IncidentStore};
pub use preferences::{PREFERENCES_KEY, PreferencesStore};
pub use system::{SystemState, SystemStatusStore};
pub use zones::{ZoneState, ZoneStore};

use crate::config::StoreLimits;
use crate::persist::KeyValueStore;

/// Every domain store the pipeline feeds.
pub struct Stores {
    pub alerts: AlertStore,
    pub doors: DoorStore,
    pub access_events: AccessEventStore,
    pub zones: ZoneStore,
    pub incidents: IncidentStore,
    pub preferences: PreferencesStore,
    pub emergency: EmergencyStore,
    pub system: SystemStatusStore,
}

impl Stores {
    pub fn new(limits: &StoreLimits, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            alerts: AlertStore::new(limits.max_alerts),
            doors: DoorStore::new(),
            access_events: AccessEventStore::new(limits.max_access_events),
            zones: ZoneStore::new(),
            incidents: IncidentStore::new(),
            preferences: PreferencesStore::new(kv),
            emergency: EmergencyStore::new(),
            system: SystemStatusStore::new(),
        }
    }
}
