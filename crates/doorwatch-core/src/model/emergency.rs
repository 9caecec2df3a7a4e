use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Facility-wide lockdown state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyState {
    pub active: bool,
    pub affected_zones: BTreeSet<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl EmergencyState {
    pub fn affects(&self, zone_id: &str) -> bool {
        self.active && self.affected_zones.contains(zone_id)
    }
}
