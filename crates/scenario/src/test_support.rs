// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and fakes for scenario tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use fm_adapters::Components;
use fm_core::ClientRecord;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::context::{CommandPort, ErrorCounters, PortError, ScenarioContext};

/// A recorded outbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct SentEvent {
    pub client: String,
    pub event_type: String,
    pub data: Map<String, Value>,
}

/// In-memory [`CommandPort`] capturing everything actions dispatch.
#[derive(Default)]
pub struct FakePort {
    pub sent: Mutex<Vec<SentEvent>>,
    pub clients: Mutex<HashMap<String, ClientRecord>>,
    pub nested_runs: Mutex<Vec<String>>,
    pub fail_sends: AtomicBool,
}

impl FakePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_client_state(&self, name: &str, state: Value) {
        let mut clients = self.clients.lock();
        let record = clients.entry(name.to_string()).or_insert_with(|| client_record(&[]));
        record.fsm_state = Some(state);
    }

    pub fn insert_client(&self, name: &str, record: ClientRecord) {
        self.clients.lock().insert(name.to_string(), record);
    }

    pub fn sent_events(&self) -> Vec<SentEvent> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl CommandPort for FakePort {
    async fn send_event(
        &self,
        client: &str,
        event_type: &str,
        data: Map<String, Value>,
    ) -> Result<(), PortError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(PortError::Transport("fake transport down".to_string()));
        }
        self.sent.lock().push(SentEvent {
            client: client.to_string(),
            event_type: event_type.to_string(),
            data,
        });
        Ok(())
    }

    fn clients(&self) -> HashMap<String, ClientRecord> {
        self.clients.lock().clone()
    }

    async fn run_scenario(&self, name: &str, _depth: u32) -> Result<Value, PortError> {
        self.nested_runs.lock().push(name.to_string());
        Ok(Value::Null)
    }
}

/// Client record with the given groups and no runtime state.
pub fn client_record(groups: &[&str]) -> ClientRecord {
    ClientRecord {
        address: "127.0.0.1".into(),
        port: 8001,
        groups: groups.iter().map(|g| g.to_string()).collect(),
        ..Default::default()
    }
}

/// Client record reporting `state` (pass a code or a name).
pub fn client_in_state(state: Value) -> ClientRecord {
    let mut record = client_record(&[]);
    record.fsm_state = Some(state);
    record
}

/// Client record in FAULT with an error message.
pub fn faulted_client(message: &str) -> ClientRecord {
    let mut record = client_record(&[]);
    record.fsm_state = Some(json!(10));
    record.error = true;
    record.error_message = Some(message.to_string());
    record
}

/// Context over the given clients with empty trigger data.
pub fn context(clients: HashMap<String, ClientRecord>) -> ScenarioContext {
    context_with(clients, Arc::new(Components::new()), Arc::new(FakePort::new()))
}

pub fn context_with(
    clients: HashMap<String, ClientRecord>,
    components: Arc<Components>,
    port: Arc<dyn CommandPort>,
) -> ScenarioContext {
    ScenarioContext {
        scenario_name: "under-test".to_string(),
        run_id: "run-test".to_string(),
        clients,
        components,
        trigger_data: Map::new(),
        port,
        counters: Arc::new(ErrorCounters::new()),
        // fixed instant: 2026-03-02 10:30 UTC, a Monday
        now: match Utc.with_ymd_and_hms(2026, 3, 2, 10, 30, 0) {
            chrono::LocalResult::Single(t) => t,
            _ => Utc::now(),
        },
        depth: 0,
    }
}
