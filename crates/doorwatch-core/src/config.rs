// ── Runtime pipeline configuration ──
//
// These types describe *how* the pipeline runs: which transport, where
// it connects, how it retries, and how much history the stores keep.
// They never touch disk; the config crate builds a `RuntimeConfig` and
// hands it in.

use std::sync::Arc;

use doorwatch_api::{LiveTransport, ReconnectPolicy, SimulatedTransport, SimulationConfig, Transport};
use serde::{Deserialize, Serialize};
use url::Url;

/// Which transport feeds the pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransportMode {
    /// WebSocket connection to a real event source.
    Live,
    /// In-process generator; no network.
    Simulated,
}

/// Retention bounds for the history-keeping stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_alerts: usize,
    pub max_access_events: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_alerts: 100,
            max_access_events: 1000,
        }
    }
}

/// Everything needed to assemble a running pipeline.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub mode: TransportMode,
    pub url: Url,
    pub reconnect: ReconnectPolicy,
    pub simulation: SimulationConfig,
    pub limits: StoreLimits,
}

impl RuntimeConfig {
    /// A simulated setup with default tuning.
    pub fn simulated() -> Self {
        Self {
            mode: TransportMode::Simulated,
            url: default_url(),
            reconnect: ReconnectPolicy::default(),
            simulation: SimulationConfig::default(),
            limits: StoreLimits::default(),
        }
    }

    /// A live setup against `url` with default tuning.
    pub fn live(url: Url) -> Self {
        Self {
            mode: TransportMode::Live,
            url,
            ..Self::simulated()
        }
    }

    /// Construct the transport this configuration selects.
    pub fn build_transport(&self) -> Arc<dyn Transport> {
        match self.mode {
            TransportMode::Live => {
                tracing::debug!(url = %self.url, "using live transport");
                Arc::new(LiveTransport::new(self.url.clone(), self.reconnect.clone()))
            }
            TransportMode::Simulated => {
                tracing::debug!("using simulated transport");
                Arc::new(SimulatedTransport::new(self.simulation.clone()))
            }
        }
    }
}

/// Default event source endpoint.
pub const DEFAULT_URL: &str = "ws://localhost:8080/ws";

fn default_url() -> Url {
    Url::parse(DEFAULT_URL).unwrap_or_else(|_| unreachable!("DEFAULT_URL is a valid URL"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("LIVE".parse::<TransportMode>().ok(), Some(TransportMode::Live));
        assert_eq!("simulated".parse::<TransportMode>().ok(), Some(TransportMode::Simulated));
        assert_eq!(TransportMode::Simulated.to_string(), "simulated");
    }

    #[test]
    fn simulated_build_starts_disconnected() {
        let transport = RuntimeConfig::simulated().build_transport();
        assert_eq!(
            transport.connection_state(),
            doorwatch_api::ConnectionState::Disconnected
        );
    }
}
