// ── Incident store ──
//
// Status changes are accepted as given. A move backwards through the
// lifecycle is logged but not refused.

use std::sync::Arc;

use super::cell::StoreCell;
use crate::model::Incident;
use crate::stream::StoreStream;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentState {
    /// Newest first.
    pub incidents: Vec<Arc<Incident>>,
    /// Always one of `incidents` (same id, same value) or `None`.
    pub active_incident: Option<Arc<Incident>>,
}

impl IncidentState {
    pub fn get(&self, id: &str) -> Option<&Arc<Incident>> {
        self.incidents.iter().find(|i| i.id == id)
    }
}

pub struct IncidentStore {
    cell: StoreCell<IncidentState>,
}

impl Default for IncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IncidentStore {
    pub fn new() -> Self {
        Self {
            cell: StoreCell::new(IncidentState::default()),
        }
    }

    /// Prepend an incident. An id already present is ignored.
    pub fn add_incident(&self, incident: Incident) -> bool {
        self.cell.update(|state| {
            if state.get(&incident.id).is_some() {
                tracing::warn!(incident_id = %incident.id, "ignoring duplicate incident");
                return None;
            }
            let mut incidents = Vec::with_capacity(state.incidents.len() + 1);
            incidents.push(Arc::new(incident));
            incidents.extend(state.incidents.iter().cloned());
            Some(IncidentState {
                incidents,
                active_incident: state.active_incident.clone(),
            })
        })
    }

    /// Replace an incident by id. Unknown ids are ignored.
    pub fn update_incident(&self, incident: Incident) -> bool {
        self.cell.update(|state| {
            let index = state.incidents.iter().position(|i| i.id == incident.id)?;
            let current = &state.incidents[index];
            if **current == incident {
                return None;
            }
            if !current.status.can_advance_to(incident.status) {
                tracing::warn!(
                    incident_id = %incident.id,
                    from = %current.status,
                    to = %incident.status,
                    "incident status moved backwards"
                );
            }

            let incident = Arc::new(incident);
            let mut incidents = state.incidents.clone();
            incidents[index] = Arc::clone(&incident);
            let active_incident = match &state.active_incident {
                Some(active) if active.id == incident.id => Some(incident),
                other => other.clone(),
            };
            Some(IncidentState {
                incidents,
                active_incident,
            })
        })
    }

    /// Point at an incident by id, or clear with `None`.
    /// Returns `false` for an unknown id.
    pub fn set_active_incident(&self, id: Option<&str>) -> bool {
        self.cell.update(|state| {
            let active_incident = match id {
                Some(id) => Some(Arc::clone(state.get(id)?)),
                None => None,
            };
            let unchanged = active_incident.as_ref().map(|i| &i.id)
                == state.active_incident.as_ref().map(|i| &i.id);
            if unchanged {
                return None;
            }
            Some(IncidentState {
                incidents: state.incidents.clone(),
                active_incident,
            })
        })
    }

    pub fn snapshot(&self) -> Arc<IncidentState> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> StoreStream<IncidentState> {
        self.cell.subscribe()
    }
}
