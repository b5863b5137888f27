// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client registry: config merged with runtime state per registered component.

use fm_core::{ClientConfig, ClientRecord, Endpoint};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Mutable map of every registered client. Written by the state-reply
/// handler; read as cloned snapshots by trigger evaluation.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, ClientRecord>>,
}

impl ClientRegistry {
    pub fn from_config(clients: &HashMap<String, ClientConfig>) -> Self {
        let records = clients
            .iter()
            .map(|(name, config)| (name.clone(), ClientRecord::from_config(config)))
            .collect();
        Self { clients: Mutex::new(records) }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn endpoint(&self, name: &str) -> Option<Endpoint> {
        self.clients.lock().get(name).map(|record| record.endpoint(name))
    }

    /// Consistent copy for one tick's trigger evaluation.
    pub fn snapshot(&self) -> HashMap<String, ClientRecord> {
        self.clients.lock().clone()
    }

    /// Merge a `CMD_GET_STATE` reply payload into the named record.
    pub fn apply_state_reply(&self, name: &str, data: &Map<String, Value>) {
        let mut clients = self.clients.lock();
        if let Some(record) = clients.get_mut(name) {
            record.apply_state_reply(data);
        }
    }

    /// Mark a client unreachable: state becomes UNKNOWN, the error
    /// fields record the transport failure.
    pub fn mark_unreachable(&self, name: &str, message: &str) {
        let mut clients = self.clients.lock();
        if let Some(record) = clients.get_mut(name) {
            record.fsm_state = Some(Value::from(-1));
            record.error = true;
            record.error_message = Some(message.to_string());
        }
    }

    /// Exported view for the orchestrator's own state report.
    pub fn as_value(&self) -> Value {
        let clients = self.clients.lock();
        let map: Map<String, Value> = clients
            .iter()
            .map(|(name, record)| (name.clone(), record.as_value()))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
