//! Configuration resolution for the CLI.
//!
//! Loads the TOML config (honoring `--config`), applies the `--url` and
//! `--simulate` overrides, and builds the pipeline the commands drive.

use std::path::PathBuf;
use std::sync::Arc;

use doorwatch_config::{Config, FileKeyValueStore};
use doorwatch_core::{Pipeline, RuntimeConfig, TransportMode};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file the CLI reads: `--config` if given, else the platform path.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(doorwatch_config::config_path)
}

/// Load the config file and environment, then apply CLI flag overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = doorwatch_config::load_config_from(&config_path(global))?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(url) = &global.url {
        cfg.transport.url.clone_from(url);
        if !global.simulate {
            cfg.transport.mode = Some(TransportMode::Live);
        }
    }
    if global.simulate {
        cfg.transport.mode = Some(TransportMode::Simulated);
    }
}

/// A pipeline plus the configuration it was built from.
pub struct Session {
    pub pipeline: Pipeline,
    pub runtime: RuntimeConfig,
}

impl Session {
    pub fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let cfg = load(global)?;
        let runtime = cfg.to_runtime_config(|key| std::env::var(key).ok())?;
        let preferences = FileKeyValueStore::new(cfg.preferences_path());
        tracing::debug!(
            mode = %runtime.mode,
            url = %runtime.url,
            preferences = %preferences.path().display(),
            "opening session"
        );
        let pipeline = Pipeline::from_config(&runtime, Arc::new(preferences));
        Ok(Self { pipeline, runtime })
    }

    /// Start the pipeline; a failed first connect is an error.
    pub async fn start(&self) -> Result<(), CliError> {
        self.pipeline.start().await.map_err(|e| self.connect_error(e))
    }

    /// Start the pipeline; a failed first connect is logged and the
    /// transport's reconnect schedule takes over.
    pub async fn start_tolerant(&self) {
        if let Err(e) = self.pipeline.start().await {
            tracing::warn!(url = %self.runtime.url, error = %e, "initial connect failed, retrying");
        }
    }

    fn connect_error(&self, err: doorwatch_core::CoreError) -> CliError {
        match err {
            doorwatch_core::CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed {
                url: self.runtime.url.to_string(),
                reason,
            },
            other => other.into(),
        }
    }
}
