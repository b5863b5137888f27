// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run scenario context and the orchestrator port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fm_core::ClientRecord;
use fm_adapters::Components;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("unknown client {0}")]
    UnknownClient(String),

    #[error("unknown scenario {0}")]
    UnknownScenario(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

/// The orchestrator surface available to actions: emitting events,
/// reading the live client map, and nested scenario invocation.
#[async_trait]
pub trait CommandPort: Send + Sync + 'static {
    /// Queue an event to one client (fire-and-forget delivery through
    /// the outbound loop).
    async fn send_event(
        &self,
        client: &str,
        event_type: &str,
        data: Map<String, Value>,
    ) -> Result<(), PortError>;

    /// Live view of the client registry (unlike the snapshot captured
    /// in the context at trigger time).
    fn clients(&self) -> HashMap<String, ClientRecord>;

    /// Run another scenario inline. `depth` guards against cycles.
    async fn run_scenario(&self, name: &str, depth: u32) -> Result<Value, PortError>;
}

/// Consecutive-failure counters per action kind, shared across all
/// scenarios. Outbound kinds use these to go quiet after repeated
/// delivery failures; CMD_ACK resets everything.
#[derive(Default)]
pub struct ErrorCounters {
    counts: Mutex<HashMap<String, u32>>,
}

impl ErrorCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: &str) -> u32 {
        self.counts.lock().get(kind).copied().unwrap_or(0)
    }

    /// Returns the new consecutive-failure count.
    pub fn record_failure(&self, kind: &str) -> u32 {
        let mut counts = self.counts.lock();
        let count = counts.entry(kind.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn record_success(&self, kind: &str) {
        self.counts.lock().remove(kind);
    }

    /// True once `max_error_attempts` consecutive failures were seen.
    /// A zero threshold disables the guard.
    pub fn should_skip(&self, kind: &str, max_error_attempts: u32) -> bool {
        max_error_attempts > 0 && self.count(kind) >= max_error_attempts
    }

    pub fn reset_all(&self) {
        self.counts.lock().clear();
    }
}

/// Everything one scenario run carries into its conditions and actions.
#[derive(Clone)]
pub struct ScenarioContext {
    pub scenario_name: String,
    pub run_id: String,
    /// Client map snapshot taken at trigger evaluation.
    pub clients: HashMap<String, ClientRecord>,
    pub components: Arc<Components>,
    /// Bindings produced by the trigger's conditions.
    pub trigger_data: Map<String, Value>,
    pub port: Arc<dyn CommandPort>,
    pub counters: Arc<ErrorCounters>,
    /// Wall clock at trigger evaluation; used by time conditions.
    pub now: DateTime<Utc>,
    /// Nesting depth for execute_scenario.
    pub depth: u32,
}

impl ScenarioContext {
    /// Root object for template resolution: trigger bindings at the
    /// top level and under `trigger`, plus the client snapshot and run
    /// identity.
    pub fn template_root(&self) -> Value {
        let mut root = Map::new();
        for (key, value) in &self.trigger_data {
            root.insert(key.clone(), value.clone());
        }
        root.insert("trigger".into(), Value::Object(self.trigger_data.clone()));
        let clients: Map<String, Value> = self
            .clients
            .iter()
            .map(|(name, record)| (name.clone(), record.as_value()))
            .collect();
        root.insert("clients".into(), Value::Object(clients));
        root.insert("scenario_name".into(), json!(self.scenario_name));
        root.insert("run_id".into(), json!(self.run_id));
        Value::Object(root)
    }

    /// Child context for nested action lists carrying extra bindings.
    pub fn with_bindings(&self, bindings: Map<String, Value>) -> ScenarioContext {
        let mut child = self.clone();
        for (key, value) in bindings {
            child.trigger_data.insert(key, value);
        }
        child
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
