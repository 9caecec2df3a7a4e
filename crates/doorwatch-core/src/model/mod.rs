// ── Domain model ──
//
// Canonical, validated representations of everything the dashboard shows.
// Wire payloads are converted into these types in `convert`; stores and
// views never see raw strings for enumerated fields.

pub mod access;
pub mod alert;
pub mod door;
pub mod emergency;
pub mod incident;
pub mod preferences;
pub mod system;
pub mod zone;

pub use access::{AccessEvent, AccessResult, CredentialType};
pub use alert::{Alert, AlertSeverity, AlertType, RelatedEntityType};
pub use door::{Door, DoorStatus};
pub use emergency::EmergencyState;
pub use incident::{Incident, IncidentStatus};
pub use preferences::{PreferencesUpdate, Theme, UserPreferences};
pub use system::{ComponentHealth, ComponentStatus};
pub use zone::{SecurityLevel, Zone};
