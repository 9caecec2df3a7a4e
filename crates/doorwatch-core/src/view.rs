// ── Presentation contracts ──
//
// What the dashboard widgets consume: alert ordering, the connection
// indicator, and one-line live feed entries. Pure functions of store
// snapshots and envelopes; no I/O.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use doorwatch_api::{ConnectionState, Envelope, Message, MessageKind};
use serde::Serialize;

use crate::model::{Alert, UserPreferences};
use crate::store::AlertState;

// ── Alert ordering ─────────────────────────────────────────────────

/// Dashboard order: unacknowledged first, then most severe, then newest.
pub fn display_order(a: &Alert, b: &Alert) -> Ordering {
    a.acknowledged
        .cmp(&b.acknowledged)
        .then_with(|| a.severity.cmp(&b.severity))
        .then_with(|| b.timestamp.cmp(&a.timestamp))
}

/// All retained alerts in [`display_order`].
pub fn sorted_alerts(state: &AlertState) -> Vec<Arc<Alert>> {
    let mut alerts = state.alerts.clone();
    alerts.sort_by(|a, b| display_order(a, b));
    alerts
}

/// Alerts at or above the operator's severity floor, in display order.
pub fn visible_alerts(state: &AlertState, prefs: &UserPreferences) -> Vec<Arc<Alert>> {
    let mut alerts: Vec<_> = state
        .alerts
        .iter()
        .filter(|a| a.severity.at_least(prefs.minimum_alert_severity))
        .cloned()
        .collect();
    alerts.sort_by(|a, b| display_order(a, b));
    alerts
}

// ── Connection indicator ───────────────────────────────────────────

/// Visual weight of an indicator or feed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tone {
    Positive,
    Pending,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionIndicator {
    pub state: ConnectionState,
    pub label: &'static str,
    pub tone: Tone,
}

impl From<ConnectionState> for ConnectionIndicator {
    fn from(state: ConnectionState) -> Self {
        let (label, tone) = match state {
            ConnectionState::Connected => ("Live", Tone::Positive),
            ConnectionState::Connecting => ("Connecting", Tone::Pending),
            ConnectionState::Closing => ("Closing", Tone::Pending),
            ConnectionState::Disconnected => ("Offline", Tone::Negative),
            ConnectionState::Unknown => ("Unknown", Tone::Neutral),
        };
        Self { state, label, tone }
    }
}

// ── Live feed ──────────────────────────────────────────────────────

/// One line of the live event feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    pub summary: String,
    pub tone: Tone,
}

impl From<&Envelope> for FeedEntry {
    fn from(envelope: &Envelope) -> Self {
        let (summary, tone) = summarize(&envelope.message);
        Self {
            timestamp: envelope.timestamp,
            kind: envelope.kind(),
            summary,
            tone,
        }
    }
}

fn summarize(message: &Message) -> (String, Tone) {
    match message {
        Message::DoorStatusUpdate(p) => {
            let name = p.name.as_deref().unwrap_or(&p.door_id);
            let tone = match p.status.to_ascii_uppercase().as_str() {
                "FORCED_OPEN" | "HELD_OPEN" => Tone::Negative,
                "OFFLINE" => Tone::Pending,
                _ => Tone::Neutral,
            };
            (format!("{name} is now {}", p.status), tone)
        }
        Message::AccessEvent(p) => {
            if p.result.eq_ignore_ascii_case("granted") {
                (format!("{} entered {}", p.user_name, p.door_name), Tone::Positive)
            } else {
                let reason = p
                    .denial_reason
                    .as_deref()
                    .map(|r| format!(" ({r})"))
                    .unwrap_or_default();
                (
                    format!("{} denied at {}{reason}", p.user_name, p.door_name),
                    Tone::Negative,
                )
            }
        }
        Message::NewAlert(p) => {
            let tone = match p.severity.to_ascii_uppercase().as_str() {
                "CRITICAL" | "HIGH" => Tone::Negative,
                "MEDIUM" => Tone::Pending,
                _ => Tone::Neutral,
            };
            (format!("[{}] {}", p.severity, p.title), tone)
        }
        Message::AlertUpdate(p) => {
            let summary = match (p.acknowledged, p.acknowledged_by.as_deref()) {
                (true, Some(by)) => format!("{} acknowledged by {by}", p.title),
                (true, None) => format!("{} acknowledged", p.title),
                (false, _) => format!("{} updated", p.title),
            };
            (summary, Tone::Neutral)
        }
        Message::SystemStatus(p) => {
            let tone = if p.status.eq_ignore_ascii_case("healthy") {
                Tone::Positive
            } else {
                Tone::Pending
            };
            (format!("{} is {}", p.component, p.status), tone)
        }
        Message::EmergencyLockdown(p) => {
            if p.active {
                (
                    format!("Emergency lockdown in {} zone(s)", p.zone_ids.len()),
                    Tone::Negative,
                )
            } else {
                ("Emergency lockdown lifted".to_owned(), Tone::Positive)
            }
        }
        Message::UserActivity(p) => (format!("{}: {}", p.user_id, p.activity), Tone::Neutral),
    }
}

/// Bounded, newest-first list of feed entries.
#[derive(Debug, Clone)]
pub struct LiveFeed {
    entries: VecDeque<FeedEntry>,
    limit: usize,
}

impl LiveFeed {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn push(&mut self, entry: FeedEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
    }

    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
