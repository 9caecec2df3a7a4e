//! Configuration for doorwatch.
//!
//! TOML file plus `DOORWATCH_*` environment overrides, layered with
//! `figment`, and translation to `doorwatch_core::RuntimeConfig`. Also
//! hosts the file-backed key-value store preferences persist through.

mod kv;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use doorwatch_api::{ReconnectPolicy, SimulationConfig};
use doorwatch_core::{DEFAULT_URL, RuntimeConfig, StoreLimits, TransportMode};

pub use kv::FileKeyValueStore;

/// Environment variables that, set to `development`, select the simulated
/// transport when no mode is configured.
pub const DEVELOPMENT_ENV_VARS: [&str; 2] = ["DOORWATCH_ENV", "NODE_ENV"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Where preferences are persisted. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences_file: Option<PathBuf>,

    #[serde(default)]
    pub transport: TransportSection,

    #[serde(default)]
    pub simulation: SimulationSection,

    #[serde(default)]
    pub limits: LimitsSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransportSection {
    /// Event source endpoint (`ws://` or `wss://`).
    #[serde(default = "default_url")]
    pub url: String,

    /// `live` or `simulated`. Unset: decided by the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TransportMode>,

    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_secs: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            mode: None,
            reconnect_interval_secs: default_reconnect_interval(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.into()
}
fn default_reconnect_interval() -> u64 {
    5
}
fn default_max_reconnect_attempts() -> u32 {
    10
}

/// Generator periods for the simulated transport, in milliseconds.
/// Zero disables a generator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationSection {
    pub connect_delay_ms: u64,
    pub door_status_ms: u64,
    pub access_event_ms: u64,
    pub new_alert_ms: u64,
    pub system_status_ms: u64,
    pub user_activity_ms: u64,
    pub emergency_ms: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            connect_delay_ms: 250,
            door_status_ms: 4_000,
            access_event_ms: 2_500,
            new_alert_ms: 7_000,
            system_status_ms: 15_000,
            user_activity_ms: 6_000,
            emergency_ms: 0,
        }
    }
}

impl From<&SimulationSection> for SimulationConfig {
    fn from(s: &SimulationSection) -> Self {
        Self {
            connect_delay: Duration::from_millis(s.connect_delay_ms),
            door_status: Duration::from_millis(s.door_status_ms),
            access_event: Duration::from_millis(s.access_event_ms),
            new_alert: Duration::from_millis(s.new_alert_ms),
            system_status: Duration::from_millis(s.system_status_ms),
            user_activity: Duration::from_millis(s.user_activity_ms),
            emergency: Duration::from_millis(s.emergency_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsSection {
    pub max_alerts: usize,
    pub max_access_events: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        let limits = StoreLimits::default();
        Self {
            max_alerts: limits.max_alerts,
            max_access_events: limits.max_access_events,
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "doorwatch", "doorwatch")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the persisted preferences.
pub fn default_preferences_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("preferences.json"),
        |dirs| dirs.data_dir().join("preferences.json"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("doorwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical config path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DOORWATCH_").split("__"));

    let config: Config = figment.extract()?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to runtime config ───────────────────────────────────

/// Pick the transport: explicit configuration wins, otherwise a
/// development environment selects the simulator.
pub fn resolve_mode(
    configured: Option<TransportMode>,
    env: impl Fn(&str) -> Option<String>,
) -> TransportMode {
    if let Some(mode) = configured {
        return mode;
    }
    let development = DEVELOPMENT_ENV_VARS
        .iter()
        .any(|var| env(var).is_some_and(|v| v.trim().eq_ignore_ascii_case("development")));
    if development {
        TransportMode::Simulated
    } else {
        TransportMode::Live
    }
}

impl Config {
    /// Where preferences persist for this configuration.
    pub fn preferences_path(&self) -> PathBuf {
        self.preferences_file
            .clone()
            .unwrap_or_else(default_preferences_path)
    }

    /// Validate and build the runtime configuration.
    ///
    /// `env` looks up environment variables; pass `|k| std::env::var(k).ok()`
    /// outside tests.
    pub fn to_runtime_config(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<RuntimeConfig, ConfigError> {
        let url: url::Url = self
            .transport
            .url
            .parse()
            .map_err(|e| ConfigError::Validation {
                field: "transport.url".into(),
                reason: format!("{e}: {}", self.transport.url),
            })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::Validation {
                field: "transport.url".into(),
                reason: format!("expected a ws:// or wss:// URL, got '{}'", url.scheme()),
            });
        }

        if self.transport.reconnect_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "transport.reconnect_interval_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.limits.max_alerts == 0 || self.limits.max_access_events == 0 {
            return Err(ConfigError::Validation {
                field: "limits".into(),
                reason: "store limits must be at least 1".into(),
            });
        }

        Ok(RuntimeConfig {
            mode: resolve_mode(self.transport.mode, env),
            url,
            reconnect: ReconnectPolicy {
                interval: Duration::from_secs(self.transport.reconnect_interval_secs),
                max_attempts: self.transport.max_reconnect_attempts,
            },
            simulation: SimulationConfig::from(&self.simulation),
            limits: StoreLimits {
                max_alerts: self.limits.max_alerts,
                max_access_events: self.limits.max_access_events,
            },
        })
    }
}
