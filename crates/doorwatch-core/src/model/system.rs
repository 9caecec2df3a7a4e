use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health reported by a backend component. Unrecognized values map to
/// `Unknown` rather than rejecting the message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ComponentHealth {
    Healthy,
    Degraded,
    Offline,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    pub component: String,
    pub health: ComponentHealth,
    pub message: Option<String>,
    pub reported_at: DateTime<Utc>,
}
