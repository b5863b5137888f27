// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario file model.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::condition::Condition;

pub const DEFAULT_PRIORITY: i64 = 100;

/// One scenario as loaded from a JSON file. Execution-state fields
/// (counters, cooldown stamps) live in the tracker, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Lower runs first.
    #[serde(default = "default_priority")]
    pub priority: i64,
    /// Minimum seconds between successive executions.
    #[serde(default)]
    pub cooldown: f64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_executions: u32,
    /// Lifetime cap; reaching it blocks the scenario until CMD_ACK.
    #[serde(default)]
    pub max_executions: Option<u64>,
    pub trigger: Trigger,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

fn default_max_concurrent() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    /// Absent conditions mean: automatic scenarios never fire, manual
    /// scenarios ignore the field entirely.
    #[serde(default)]
    pub conditions: Option<Condition>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One entry of the `actions` list: the kind tag plus the full config
/// object (the tag stays inside so actions can re-read it).
#[derive(Debug, Clone, Serialize)]
pub struct ActionSpec {
    pub kind: String,
    pub config: Value,
}

impl<'de> Deserialize<'de> for ActionSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let config = Value::deserialize(deserializer)?;
        let Some(object) = config.as_object() else {
            return Err(D::Error::custom("action must be an object"));
        };
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::custom("action is missing a \"type\" tag"))?
            .to_string();
        Ok(ActionSpec { kind, config })
    }
}

impl ActionSpec {
    pub fn new(kind: impl Into<String>, config: Value) -> Self {
        Self { kind: kind.into(), config }
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
