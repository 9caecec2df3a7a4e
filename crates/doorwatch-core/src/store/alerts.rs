// ── Alert store ──
//
// Newest-first, bounded list of alerts plus a running count of the
// unacknowledged ones. The count always equals the number of
// unacknowledged alerts in the list, including across eviction.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use super::cell::StoreCell;
use crate::model::{Alert, AlertSeverity};
use crate::stream::StoreStream;

/// Published alert state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    /// Newest first.
    pub alerts: Vec<Arc<Alert>>,
    pub unacknowledged_count: usize,
}

impl AlertState {
    pub fn get(&self, id: &str) -> Option<&Arc<Alert>> {
        self.alerts.iter().find(|a| a.id == id)
    }
}

pub struct AlertStore {
    cell: StoreCell<AlertState>,
    max_alerts: usize,
}

impl AlertStore {
    pub fn new(max_alerts: usize) -> Self {
        Self {
            cell: StoreCell::new(AlertState::default()),
            max_alerts,
        }
    }

    pub fn max_alerts(&self) -> usize {
        self.max_alerts
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Prepend `alert`, evicting the oldest beyond capacity.
    ///
    /// An alert whose id is already present is ignored; returns `false`.
    pub fn add_alert(&self, alert: Alert) -> bool {
        let max = self.max_alerts;
        self.cell.update(|state| {
            if state.get(&alert.id).is_some() {
                tracing::warn!(alert_id = %alert.id, "ignoring duplicate alert");
                return None;
            }

            let incoming_unacked = usize::from(!alert.acknowledged);
            let mut alerts = Vec::with_capacity((state.alerts.len() + 1).min(max));
            alerts.push(Arc::new(alert));
            alerts.extend(state.alerts.iter().cloned());

            let evicted = alerts.split_off(alerts.len().min(max));
            let evicted_unacked = evicted.iter().filter(|a| !a.acknowledged).count();
            if !evicted.is_empty() {
                tracing::debug!(evicted = evicted.len(), "alert capacity reached, evicting oldest");
            }

            Some(AlertState {
                alerts,
                unacknowledged_count: (state.unacknowledged_count + incoming_unacked)
                    .saturating_sub(evicted_unacked),
            })
        })
    }

    /// Mark an alert acknowledged by `user_id`.
    ///
    /// No-op (returns `false`) if the id is unknown or the alert is already
    /// acknowledged.
    pub fn acknowledge_alert(&self, id: &str, user_id: &str) -> bool {
        self.cell.update(|state| {
            let index = state
                .alerts
                .iter()
                .position(|a| a.id == id && !a.acknowledged)?;

            let mut acked = Alert::clone(&state.alerts[index]);
            acked.acknowledged = true;
            acked.acknowledged_by = Some(user_id.to_owned());
            acked.acknowledged_at = Some(Utc::now());

            let mut alerts = state.alerts.clone();
            alerts[index] = Arc::new(acked);

            Some(AlertState {
                alerts,
                unacknowledged_count: state.unacknowledged_count.saturating_sub(1),
            })
        })
    }

    /// Remove one alert. Returns `false` if it was not present.
    pub fn clear_alert(&self, id: &str) -> bool {
        self.cell.update(|state| {
            let removed = state.get(id)?;
            let was_unacked = !removed.acknowledged;

            let alerts = state
                .alerts
                .iter()
                .filter(|a| a.id != id)
                .cloned()
                .collect();

            Some(AlertState {
                alerts,
                unacknowledged_count: state
                    .unacknowledged_count
                    .saturating_sub(usize::from(was_unacked)),
            })
        })
    }

    pub fn clear_all_alerts(&self) -> bool {
        self.cell.update(|state| {
            if state.alerts.is_empty() && state.unacknowledged_count == 0 {
                None
            } else {
                Some(AlertState::default())
            }
        })
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<AlertState> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> StoreStream<AlertState> {
        self.cell.subscribe()
    }

    pub fn version(&self) -> u64 {
        self.cell.version()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Alert>> {
        self.snapshot().get(id).cloned()
    }

    pub fn unacknowledged_count(&self) -> usize {
        self.snapshot().unacknowledged_count
    }

    /// Unacknowledged alerts at CRITICAL severity.
    pub fn critical_count(&self) -> usize {
        self.snapshot()
            .alerts
            .iter()
            .filter(|a| !a.acknowledged && a.severity == AlertSeverity::Critical)
            .count()
    }

    /// Retained alerts per severity, most severe first.
    pub fn count_by_severity(&self) -> BTreeMap<AlertSeverity, usize> {
        let mut counts = BTreeMap::new();
        for alert in &self.snapshot().alerts {
            *counts.entry(alert.severity).or_insert(0) += 1;
        }
        counts
    }
}
