//! Wire envelope and typed payloads.
//!
//! Every frame on the wire is a JSON object of the shape
//! `{ "type": "<KIND>", "payload": { ... }, "timestamp": "<RFC 3339>" }`.
//! The payload shape is fully determined by `type`; parsing validates it
//! into the matching [`Message`] variant so consumers never see untyped data.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Error;

// ── MessageKind ──────────────────────────────────────────────────────

/// Discriminant of a wire message. The dispatcher routes on this alone.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    DoorStatusUpdate,
    AccessEvent,
    NewAlert,
    AlertUpdate,
    SystemStatus,
    EmergencyLockdown,
    UserActivity,
}

// ── Payloads ─────────────────────────────────────────────────────────

/// `DOOR_STATUS_UPDATE` payload.
///
/// Only `doorId`, `status`, and `timestamp` are required; controllers that
/// know more about the door send the remaining attributes too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorStatusPayload {
    pub door_id: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
}

/// `ACCESS_EVENT` payload. `result` is `"granted"` or `"denied"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEventPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door_id: Option<String>,
    pub door_name: String,
    pub result: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,
}

/// `NEW_ALERT` / `ALERT_UPDATE` payload: a full alert object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: String,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity_type: Option<String>,
}

/// `SYSTEM_STATUS` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatusPayload {
    pub component: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `EMERGENCY_LOCKDOWN` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyPayload {
    pub active: bool,
    #[serde(default)]
    pub zone_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiated_by: Option<String>,
}

/// `USER_ACTIVITY` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityPayload {
    pub user_id: String,
    pub activity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ── Message ──────────────────────────────────────────────────────────

/// A validated message: one variant per [`MessageKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    DoorStatusUpdate(DoorStatusPayload),
    AccessEvent(AccessEventPayload),
    NewAlert(AlertPayload),
    AlertUpdate(AlertPayload),
    SystemStatus(SystemStatusPayload),
    EmergencyLockdown(EmergencyPayload),
    UserActivity(UserActivityPayload),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::DoorStatusUpdate(_) => MessageKind::DoorStatusUpdate,
            Self::AccessEvent(_) => MessageKind::AccessEvent,
            Self::NewAlert(_) => MessageKind::NewAlert,
            Self::AlertUpdate(_) => MessageKind::AlertUpdate,
            Self::SystemStatus(_) => MessageKind::SystemStatus,
            Self::EmergencyLockdown(_) => MessageKind::EmergencyLockdown,
            Self::UserActivity(_) => MessageKind::UserActivity,
        }
    }

    /// Validate a raw payload against the shape `kind` requires.
    fn from_wire(kind: MessageKind, payload: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            MessageKind::DoorStatusUpdate => Self::DoorStatusUpdate(serde_json::from_value(payload)?),
            MessageKind::AccessEvent => Self::AccessEvent(serde_json::from_value(payload)?),
            MessageKind::NewAlert => Self::NewAlert(serde_json::from_value(payload)?),
            MessageKind::AlertUpdate => Self::AlertUpdate(serde_json::from_value(payload)?),
            MessageKind::SystemStatus => Self::SystemStatus(serde_json::from_value(payload)?),
            MessageKind::EmergencyLockdown => {
                Self::EmergencyLockdown(serde_json::from_value(payload)?)
            }
            MessageKind::UserActivity => Self::UserActivity(serde_json::from_value(payload)?),
        })
    }
}

// ── Envelope ─────────────────────────────────────────────────────────

/// The sole unit of communication between transport and application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireEnvelope")]
pub struct Envelope {
    pub message: Message,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Wrap a message, stamping it with the current time.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }

    /// Parse a text frame. Unknown kinds and malformed payloads are errors.
    pub fn parse(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|e| Error::deserialization(&e, text))
    }

    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::deserialization(&e, ""))
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Envelope", 3)?;
        state.serialize_field("type", &self.kind())?;
        match &self.message {
            Message::DoorStatusUpdate(p) => state.serialize_field("payload", p)?,
            Message::AccessEvent(p) => state.serialize_field("payload", p)?,
            Message::NewAlert(p) | Message::AlertUpdate(p) => {
                state.serialize_field("payload", p)?;
            }
            Message::SystemStatus(p) => state.serialize_field("payload", p)?,
            Message::EmergencyLockdown(p) => state.serialize_field("payload", p)?,
            Message::UserActivity(p) => state.serialize_field("payload", p)?,
        }
        state.serialize_field("timestamp", &self.timestamp)?;
        state.end()
    }
}

/// Raw frame shape, before the payload is checked against its kind.
#[derive(Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type")]
    kind: MessageKind,
    payload: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = serde_json::Error;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        Ok(Self {
            message: Message::from_wire(wire.kind, wire.payload)?,
            timestamp: wire.timestamp,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn kind_names_match_wire_format() {
        assert_eq!(MessageKind::DoorStatusUpdate.to_string(), "DOOR_STATUS_UPDATE");
        assert_eq!(MessageKind::EmergencyLockdown.to_string(), "EMERGENCY_LOCKDOWN");
        assert_eq!(
            "USER_ACTIVITY".parse::<MessageKind>().unwrap(),
            MessageKind::UserActivity
        );
        assert_eq!(MessageKind::iter().count(), 7);
    }

    #[test]
    fn parse_door_status_update() {
        let raw = serde_json::json!({
            "type": "DOOR_STATUS_UPDATE",
            "payload": {
                "doorId": "door-001",
                "status": "FORCED_OPEN",
                "timestamp": "2026-03-01T10:00:00Z"
            },
            "timestamp": "2026-03-01T10:00:01Z"
        });

        let envelope = Envelope::parse(&raw.to_string()).unwrap();
        assert_eq!(envelope.kind(), MessageKind::DoorStatusUpdate);
        let Message::DoorStatusUpdate(payload) = envelope.message else {
            panic!("wrong variant");
        };
        assert_eq!(payload.door_id, "door-001");
        assert_eq!(payload.status, "FORCED_OPEN");
        assert!(payload.name.is_none());
    }

    #[test]
    fn parse_access_event() {
        let raw = r#"{
            "type": "ACCESS_EVENT",
            "payload": {
                "userId": "u-17",
                "userName": "Dana Reyes",
                "doorName": "Lobby East",
                "result": "denied",
                "timestamp": "2026-03-01T10:00:00Z",
                "denialReason": "Expired credential"
            },
            "timestamp": "2026-03-01T10:00:00Z"
        }"#;

        let envelope = Envelope::parse(raw).unwrap();
        let Message::AccessEvent(payload) = envelope.message else {
            panic!("wrong variant");
        };
        assert_eq!(payload.user_name, "Dana Reyes");
        assert_eq!(payload.result, "denied");
        assert_eq!(payload.denial_reason.as_deref(), Some("Expired credential"));
    }

    #[test]
    fn payload_must_match_kind() {
        // A NEW_ALERT frame carrying a door payload is rejected, not coerced.
        let raw = serde_json::json!({
            "type": "NEW_ALERT",
            "payload": { "doorId": "door-001", "status": "LOCKED", "timestamp": "2026-03-01T10:00:00Z" },
            "timestamp": "2026-03-01T10:00:00Z"
        });
        let err = Envelope::parse(&raw.to_string()).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let raw = r#"{"type":"FIRMWARE_PUSH","payload":{},"timestamp":"2026-03-01T10:00:00Z"}"#;
        assert!(Envelope::parse(raw).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let err = Envelope::parse("not json at all").unwrap_err();
        let Error::Deserialization { body, .. } = err else {
            panic!("expected deserialization error");
        };
        assert_eq!(body, "not json at all");
    }

    #[test]
    fn serialized_envelope_has_wire_shape() {
        let envelope = Envelope::new(Message::EmergencyLockdown(EmergencyPayload {
            active: true,
            zone_ids: vec!["zone-a".into()],
            reason: Some("drill".into()),
            initiated_by: None,
        }));

        let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "EMERGENCY_LOCKDOWN");
        assert_eq!(value["payload"]["zoneIds"][0], "zone-a");
        assert_eq!(value["payload"]["active"], true);
        assert!(value["payload"].get("initiatedBy").is_none());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn alert_payload_uses_type_field() {
        let payload = AlertPayload {
            id: "a-1".into(),
            alert_type: "SECURITY".into(),
            severity: "CRITICAL".into(),
            title: "Door forced".into(),
            message: "Server room door forced open".into(),
            timestamp: Utc::now(),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            related_entity_id: Some("door-004".into()),
            related_entity_type: Some("DOOR".into()),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "SECURITY");
        assert_eq!(value["relatedEntityId"], "door-004");

        let back: AlertPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }
}
