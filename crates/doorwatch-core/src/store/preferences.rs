// ── Preferences store ──
//
// Loaded once from the key-value port at construction; every accepted
// change is written back. A failed write is logged and the in-memory
// value still applies.

use std::sync::Arc;

use super::cell::StoreCell;
use crate::model::{PreferencesUpdate, UserPreferences};
use crate::persist::KeyValueStore;
use crate::stream::StoreStream;

/// Key under which preferences are persisted.
pub const PREFERENCES_KEY: &str = "doorwatch.preferences";

pub struct PreferencesStore {
    cell: StoreCell<UserPreferences>,
    kv: Arc<dyn KeyValueStore>,
}

impl PreferencesStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        let initial = load(kv.as_ref());
        Self {
            cell: StoreCell::new(initial),
            kv,
        }
    }

    /// Apply a partial change. Returns `false` if nothing changed.
    pub fn update_preferences(&self, update: &PreferencesUpdate) -> bool {
        let changed = self.cell.update(|current| {
            let next = update.apply_to(current);
            (next != *current).then_some(next)
        });
        if changed {
            self.persist();
        }
        changed
    }

    /// Restore defaults.
    pub fn reset(&self) -> bool {
        let changed = self.cell.update(|current| {
            let defaults = UserPreferences::default();
            (defaults != *current).then_some(defaults)
        });
        if changed {
            self.persist();
        }
        changed
    }

    pub fn snapshot(&self) -> Arc<UserPreferences> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> StoreStream<UserPreferences> {
        self.cell.subscribe()
    }

    fn persist(&self) {
        let prefs = self.snapshot();
        let result = serde_json::to_string(prefs.as_ref())
            .map_err(|e| e.to_string())
            .and_then(|json| self.kv.set(PREFERENCES_KEY, &json).map_err(|e| e.to_string()));
        if let Err(error) = result {
            tracing::warn!(%error, "failed to persist preferences");
        }
    }
}

fn load(kv: &dyn KeyValueStore) -> UserPreferences {
    match kv.get(PREFERENCES_KEY) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored preferences unreadable, using defaults");
            UserPreferences::default()
        }),
        Ok(None) => UserPreferences::default(),
        Err(e) => {
            tracing::warn!(error = %e, "cannot read stored preferences, using defaults");
            UserPreferences::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::model::{AlertSeverity, Theme};
    use crate::persist::MemoryStore;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, CoreError> {
            Err(CoreError::Persistence {
                message: "disk on fire".into(),
            })
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), CoreError> {
            Err(CoreError::Persistence {
                message: "disk on fire".into(),
            })
        }
        fn remove(&self, _key: &str) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[test]
    fn changes_survive_a_new_store() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = PreferencesStore::new(Arc::clone(&kv));
        assert!(store.update_preferences(&PreferencesUpdate {
            theme: Some(Theme::Dark),
            minimum_alert_severity: Some(AlertSeverity::High),
            ..PreferencesUpdate::default()
        }));

        let reloaded = PreferencesStore::new(kv);
        let prefs = reloaded.snapshot();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.minimum_alert_severity, AlertSeverity::High);
    }

    #[test]
    fn unchanged_update_keeps_snapshot() {
        let store = PreferencesStore::new(Arc::new(MemoryStore::new()));
        let before = store.snapshot();
        assert!(!store.update_preferences(&PreferencesUpdate {
            theme: Some(Theme::System),
            ..PreferencesUpdate::default()
        }));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn corrupt_blob_falls_back_to_defaults() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(PREFERENCES_KEY, "not json").unwrap();
        let store = PreferencesStore::new(kv);
        assert_eq!(*store.snapshot(), UserPreferences::default());
    }

    #[test]
    fn failing_backend_still_applies_in_memory() {
        let store = PreferencesStore::new(Arc::new(BrokenStore));
        assert!(store.update_preferences(&PreferencesUpdate {
            sound_enabled: Some(false),
            ..PreferencesUpdate::default()
        }));
        assert!(!store.snapshot().sound_enabled);
        assert!(store.reset());
        assert!(store.snapshot().sound_enabled);
    }
}
