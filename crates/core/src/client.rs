// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client registry records: configured coordinates merged with the
//! runtime state reported by `CMD_GET_STATE` replies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::Endpoint;

/// Static client entry from the orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Merged view of one client: config fields plus the last reported
/// runtime state. Subsystem blobs the core does not model (for example
/// `io_server`) are kept verbatim under `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Last reported state; integer FSM code for core listeners, but
    /// domain components may report their own state names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsm_state: Option<Value>,
    #[serde(default)]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ClientRecord {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            address: config.address.clone(),
            port: config.port,
            groups: config.groups.clone(),
            depends_on: config.depends_on.clone(),
            ..Default::default()
        }
    }

    pub fn endpoint(&self, name: &str) -> Endpoint {
        Endpoint::new(name, self.address.clone(), self.port)
    }

    /// Merge a `CMD_GET_STATE` reply payload into this record. The four
    /// core fields are extracted; every other key lands in `extra`.
    pub fn apply_state_reply(&mut self, data: &Map<String, Value>) {
        for (key, value) in data {
            match key.as_str() {
                "fsm_state" => self.fsm_state = Some(value.clone()),
                "error" => self.error = value.as_bool().unwrap_or(false),
                "error_message" => {
                    self.error_message = value.as_str().map(str::to_string);
                }
                "health_check" => self.health_check = Some(value.clone()),
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Record as a JSON object, for template navigation and condition
    /// evaluation.
    pub fn as_value(&self) -> Value {
        // Serialization of this record cannot fail: every field is a
        // JSON-native type.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
