// doorwatch-core: domain stores and the event pipeline between doorwatch-api and consumers.

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod store;
pub mod stream;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_URL, RuntimeConfig, StoreLimits, TransportMode};
pub use error::CoreError;
pub use persist::{KeyValueStore, MemoryStore};
pub use pipeline::Pipeline;
pub use store::Stores;
pub use stream::StoreStream;
pub use view::{ConnectionIndicator, FeedEntry, LiveFeed, Tone};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AccessEvent, AccessResult, Alert, AlertSeverity, AlertType, ComponentHealth, Door, DoorStatus,
    EmergencyState, Incident, IncidentStatus, PreferencesUpdate, Theme, UserPreferences, Zone,
};

// The wire layer types consumers need alongside the stores.
pub use doorwatch_api::{ConnectionState, Envelope, Message, MessageKind, Transport};
