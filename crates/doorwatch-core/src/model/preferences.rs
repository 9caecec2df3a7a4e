// ── Operator preferences ──

use serde::{Deserialize, Serialize};

use super::alert::AlertSeverity;

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
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Per-operator dashboard settings. Missing fields fall back to defaults
/// so older persisted blobs keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: Theme,
    pub sound_enabled: bool,
    pub desktop_notifications: bool,
    /// Alerts below this severity are hidden from the dashboard.
    pub minimum_alert_severity: AlertSeverity,
    /// Entries kept in the live feed.
    pub live_feed_limit: usize,
    pub default_floor_id: Option<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            sound_enabled: true,
            desktop_notifications: true,
            minimum_alert_severity: AlertSeverity::Info,
            live_feed_limit: 50,
            default_floor_id: None,
        }
    }
}

/// A partial preferences change. `None` leaves a field untouched;
/// `default_floor_id: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    pub sound_enabled: Option<bool>,
    pub desktop_notifications: Option<bool>,
    pub minimum_alert_severity: Option<AlertSeverity>,
    pub live_feed_limit: Option<usize>,
    #[allow(clippy::option_option)]
    pub default_floor_id: Option<Option<String>>,
}

impl PreferencesUpdate {
    /// `current` with this update applied.
    pub fn apply_to(&self, current: &UserPreferences) -> UserPreferences {
        UserPreferences {
            theme: self.theme.unwrap_or(current.theme),
            sound_enabled: self.sound_enabled.unwrap_or(current.sound_enabled),
            desktop_notifications: self
                .desktop_notifications
                .unwrap_or(current.desktop_notifications),
            minimum_alert_severity: self
                .minimum_alert_severity
                .unwrap_or(current.minimum_alert_severity),
            live_feed_limit: self.live_feed_limit.unwrap_or(current.live_feed_limit),
            default_floor_id: self
                .default_floor_id
                .clone()
                .unwrap_or_else(|| current.default_floor_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_blob_fills_defaults() {
        let prefs: UserPreferences = serde_json::from_str(r#"{"theme":"DARK"}"#).unwrap_or_default();
        assert_eq!(prefs.theme, Theme::Dark);
        assert!(prefs.sound_enabled);
        assert_eq!(prefs.live_feed_limit, 50);
    }

    #[test]
    fn update_touches_only_named_fields() {
        let current = UserPreferences {
            default_floor_id: Some("floor-2".into()),
            ..UserPreferences::default()
        };
        let next = PreferencesUpdate {
            sound_enabled: Some(false),
            ..PreferencesUpdate::default()
        }
        .apply_to(&current);

        assert!(!next.sound_enabled);
        assert_eq!(next.default_floor_id.as_deref(), Some("floor-2"));

        let cleared = PreferencesUpdate {
            default_floor_id: Some(None),
            ..PreferencesUpdate::default()
        }
        .apply_to(&next);
        assert_eq!(cleared.default_floor_id, None);
    }
}
