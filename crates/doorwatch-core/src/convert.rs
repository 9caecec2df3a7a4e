// ── Wire-to-domain conversions ──
//
// Bridges `doorwatch_api` payloads into canonical `doorwatch_core::model`
// types. Enumerated fields arrive as strings and are validated here; a
// value outside the known set rejects the whole message.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use doorwatch_api::{AccessEventPayload, AlertPayload, DoorStatusPayload, SystemStatusPayload};

use crate::model::{
    AccessEvent, AccessResult, Alert, ComponentHealth, ComponentStatus, CredentialType, Door,
    DoorStatus,
};

/// A payload field held a value outside its domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {value:?}")]
pub struct ConversionError {
    pub field: &'static str,
    pub value: String,
}

// ── Helpers ────────────────────────────────────────────────────────

fn parse_field<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ConversionError> {
    T::from_str(raw).map_err(|_| ConversionError {
        field,
        value: raw.to_owned(),
    })
}

fn parse_optional<T: FromStr>(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<T>, ConversionError> {
    raw.map(|s| parse_field(field, s)).transpose()
}

// ── Alert ──────────────────────────────────────────────────────────

impl TryFrom<&AlertPayload> for Alert {
    type Error = ConversionError;

    fn try_from(p: &AlertPayload) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: p.id.clone(),
            alert_type: parse_field("alert type", &p.alert_type)?,
            severity: parse_field("alert severity", &p.severity)?,
            title: p.title.clone(),
            message: p.message.clone(),
            timestamp: p.timestamp,
            acknowledged: p.acknowledged,
            acknowledged_by: p.acknowledged_by.clone(),
            acknowledged_at: p.acknowledged_at,
            related_entity_id: p.related_entity_id.clone(),
            related_entity_type: parse_optional(
                "related entity type",
                p.related_entity_type.as_deref(),
            )?,
        })
    }
}

impl From<&Alert> for AlertPayload {
    fn from(a: &Alert) -> Self {
        AlertPayload {
            id: a.id.clone(),
            alert_type: a.alert_type.to_string(),
            severity: a.severity.to_string(),
            title: a.title.clone(),
            message: a.message.clone(),
            timestamp: a.timestamp,
            acknowledged: a.acknowledged,
            acknowledged_by: a.acknowledged_by.clone(),
            acknowledged_at: a.acknowledged_at,
            related_entity_id: a.related_entity_id.clone(),
            related_entity_type: a.related_entity_type.map(|t| t.to_string()),
        }
    }
}

// ── Access events ──────────────────────────────────────────────────

impl TryFrom<&AccessEventPayload> for AccessEvent {
    type Error = ConversionError;

    fn try_from(p: &AccessEventPayload) -> Result<Self, Self::Error> {
        let result: AccessResult = parse_field("access result", &p.result)?;
        // Readers that cannot classify the credential still report the swipe.
        let credential_type = p
            .credential_type
            .as_deref()
            .and_then(|c| CredentialType::from_str(c).ok())
            .unwrap_or_default();

        Ok(AccessEvent {
            id: p
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            user_id: p.user_id.clone(),
            user_name: p.user_name.clone(),
            door_id: p.door_id.clone().unwrap_or_default(),
            door_name: p.door_name.clone(),
            timestamp: p.timestamp,
            result,
            credential_type,
            denial_reason: p.denial_reason.clone(),
            anomaly_score: p.anomaly_score,
        })
    }
}

// ── Doors ──────────────────────────────────────────────────────────

/// Apply a status update onto the door it names.
///
/// Attributes absent from the payload keep their previous values; an
/// unseen door starts from a placeholder.
pub fn merge_door_status(
    existing: Option<&Door>,
    p: &DoorStatusPayload,
) -> Result<Door, ConversionError> {
    let status: DoorStatus = parse_field("door status", &p.status)?;
    let mut door = existing
        .cloned()
        .unwrap_or_else(|| Door::placeholder(&p.door_id, status));

    door.status = status;
    door.is_online = p.is_online.unwrap_or(status != DoorStatus::Offline);
    door.last_heartbeat = Some(p.timestamp);

    if let Some(name) = &p.name {
        door.name.clone_from(name);
    }
    if let Some(location) = &p.location {
        door.location.clone_from(location);
    }
    if let Some(floor_id) = &p.floor_id {
        door.floor_id.clone_from(floor_id);
    }
    if let Some(zone_id) = &p.zone_id {
        door.zone_id.clone_from(zone_id);
    }
    if let Some(controller_id) = &p.controller_id {
        door.controller_id.clone_from(controller_id);
    }

    Ok(door)
}

// ── System status ──────────────────────────────────────────────────

/// Unrecognized health strings map to [`ComponentHealth::Unknown`].
pub fn component_status(p: &SystemStatusPayload, reported_at: DateTime<Utc>) -> ComponentStatus {
    ComponentStatus {
        component: p.component.clone(),
        health: ComponentHealth::from_str(&p.status).unwrap_or_default(),
        message: p.message.clone(),
        reported_at,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{AlertSeverity, AlertType, RelatedEntityType};

    fn alert_payload() -> AlertPayload {
        AlertPayload {
            id: "a-1".into(),
            alert_type: "security".into(),
            severity: "HIGH".into(),
            title: "Door forced".into(),
            message: "North entrance forced open".into(),
            timestamp: Utc::now(),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            related_entity_id: Some("door-001".into()),
            related_entity_type: Some("DOOR".into()),
        }
    }

    #[test]
    fn alert_payload_converts_both_ways() {
        let alert = Alert::try_from(&alert_payload()).unwrap();
        assert_eq!(alert.alert_type, AlertType::Security);
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.related_entity_type, Some(RelatedEntityType::Door));

        let back = AlertPayload::from(&alert);
        assert_eq!(back.alert_type, "SECURITY");
        assert_eq!(back.related_entity_id.as_deref(), Some("door-001"));
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let mut payload = alert_payload();
        payload.severity = "APOCALYPTIC".into();
        let err = Alert::try_from(&payload).unwrap_err();
        assert_eq!(err.field, "alert severity");
        assert_eq!(err.value, "APOCALYPTIC");
    }

    #[test]
    fn access_event_defaults() {
        let payload = AccessEventPayload {
            id: None,
            user_id: "user-1".into(),
            user_name: "Alex".into(),
            door_id: None,
            door_name: "Lobby".into(),
            result: "denied".into(),
            timestamp: Utc::now(),
            credential_type: Some("retina".into()),
            denial_reason: Some("Outside schedule".into()),
            anomaly_score: None,
        };
        let event = AccessEvent::try_from(&payload).unwrap();
        assert!(event.is_denied());
        assert!(!event.id.is_empty());
        assert_eq!(event.credential_type, CredentialType::Unknown);
    }

    #[test]
    fn door_status_merges_onto_existing() {
        let mut existing = Door::placeholder("door-7", DoorStatus::Locked);
        existing.name = "Server room".into();
        existing.zone_id = "zone-dc".into();

        let update = DoorStatusPayload {
            door_id: "door-7".into(),
            status: "FORCED_OPEN".into(),
            timestamp: Utc::now(),
            name: None,
            location: Some("B2".into()),
            floor_id: None,
            zone_id: None,
            controller_id: None,
            is_online: None,
        };
        let door = merge_door_status(Some(&existing), &update).unwrap();

        assert_eq!(door.status, DoorStatus::ForcedOpen);
        assert_eq!(door.name, "Server room");
        assert_eq!(door.zone_id, "zone-dc");
        assert_eq!(door.location, "B2");
        assert!(door.is_online);
        assert_eq!(door.last_heartbeat, Some(update.timestamp));
    }

    #[test]
    fn offline_status_implies_not_online() {
        let update = DoorStatusPayload {
            door_id: "door-9".into(),
            status: "offline".into(),
            timestamp: Utc::now(),
            name: None,
            location: None,
            floor_id: None,
            zone_id: None,
            controller_id: None,
            is_online: None,
        };
        let door = merge_door_status(None, &update).unwrap();
        assert!(door.is_offline());
        assert_eq!(door.name, "door-9");
    }
}
