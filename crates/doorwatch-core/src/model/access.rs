// ── Access event domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AccessResult {
    Granted,
    Denied,
}

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
pub enum CredentialType {
    Card,
    Pin,
    Mobile,
    Biometric,
    #[default]
    Unknown,
}

/// One badge-in attempt. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEvent {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub door_id: String,
    pub door_name: String,
    pub timestamp: DateTime<Utc>,
    pub result: AccessResult,
    pub credential_type: CredentialType,
    pub denial_reason: Option<String>,
    pub anomaly_score: Option<f64>,
}

impl AccessEvent {
    pub fn is_denied(&self) -> bool {
        self.result == AccessResult::Denied
    }
}
