// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener state and the exported state report.

use fm_core::FsmState;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Counters maintained by the worker loops.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub received: u64,
    pub processed: u64,
    pub sent: u64,
    pub send_failures: u64,
}

/// Mutable listener state, guarded by the state mutex in the runtime.
#[derive(Debug, Clone)]
pub struct ListenerState {
    pub fsm: FsmState,
    pub error: bool,
    pub error_message: Option<String>,
    pub metrics: Metrics,
}

impl Default for ListenerState {
    fn default() -> Self {
        Self {
            fsm: FsmState::Stopped,
            error: false,
            error_message: None,
            metrics: Metrics::default(),
        }
    }
}

/// Snapshot returned for `CMD_GET_STATE`: one consistent view taken
/// under the state lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateReport {
    pub fsm_state: FsmState,
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub health_check: Value,
    pub metrics: Metrics,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateReport {
    pub fn new(
        state: &ListenerState,
        uptime_ms: u64,
        queue_depths: crate::queues::QueueDepths,
        extra: Map<String, Value>,
    ) -> Self {
        Self {
            fsm_state: state.fsm,
            error: state.error,
            error_message: state.error_message.clone(),
            health_check: json!({
                "uptime_ms": uptime_ms,
                "queues": queue_depths,
            }),
            metrics: state.metrics,
            extra,
        }
    }

    /// Report as the `data` payload of a reply event.
    pub fn into_data(self) -> Map<String, Value> {
        match serde_json::to_value(&self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
