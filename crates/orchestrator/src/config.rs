// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration file (JSON).

use fm_adapters::{DatabaseConfig, SmsConfig, SmtpConfig};
use fm_core::ClientConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// One named external component.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComponentConfig {
    Postgres(DatabaseConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub clients: HashMap<String, ClientConfig>,
    #[serde(default)]
    pub components: HashMap<String, ComponentConfig>,

    #[serde(default)]
    pub builtin_scenarios_directory: Option<PathBuf>,
    #[serde(default)]
    pub scenarios_directory: Option<PathBuf>,

    #[serde(default = "default_max_concurrent_scenarios")]
    pub max_concurrent_scenarios: u32,
    /// Seconds between scenario ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: f64,
    /// Seconds between exported-state refreshes.
    #[serde(default = "default_state_update_interval")]
    pub state_update_interval: f64,
    /// `maximum_processing_time` for CMD_GET_STATE polls.
    #[serde(default = "default_get_state_timeout")]
    pub get_state_timeout: f64,

    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub sms: Option<SmsConfig>,

    /// Queue snapshot file; None disables persistence.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    /// Daemon log directory; None logs to stderr only.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_name() -> String {
    "orchestrator".to_string()
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_concurrent_scenarios() -> u32 {
    4
}

fn default_tick_interval() -> f64 {
    1.0
}

fn default_state_update_interval() -> f64 {
    2.0
}

fn default_get_state_timeout() -> f64 {
    2.0
}

impl OrchestratorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: OrchestratorConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval <= 0.0 {
            return Err(ConfigError::Parse(format!(
                "tick_interval {} must be positive",
                self.tick_interval
            )));
        }
        for (name, client) in &self.clients {
            if client.address.is_empty() {
                return Err(ConfigError::Parse(format!("client {name} has an empty address")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
