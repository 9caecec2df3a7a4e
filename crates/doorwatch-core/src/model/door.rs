// ── Door domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum DoorStatus {
    Locked,
    Unlocked,
    ForcedOpen,
    HeldOpen,
    Offline,
}

impl DoorStatus {
    /// Forced or held open: states an operator must look at.
    pub fn is_alarm(self) -> bool {
        matches!(self, Self::ForcedOpen | Self::HeldOpen)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Door {
    pub id: String,
    pub name: String,
    pub location: String,
    pub floor_id: String,
    pub zone_id: String,
    pub status: DoorStatus,
    pub controller_id: String,
    pub is_online: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl Door {
    /// A door known only by id. Attributes are filled by later updates.
    pub fn placeholder(id: impl Into<String>, status: DoorStatus) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            location: String::new(),
            floor_id: String::new(),
            zone_id: String::new(),
            status,
            controller_id: String::new(),
            is_online: status != DoorStatus::Offline,
            last_heartbeat: None,
        }
    }

    /// Offline by status or by lost heartbeat.
    pub fn is_offline(&self) -> bool {
        !self.is_online || self.status == DoorStatus::Offline
    }
}
