// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator's [`CommandPort`]: how scenario actions reach the
//! fleet.

use async_trait::async_trait;
use fm_adapters::Components;
use fm_core::{ClientRecord, SystemClock};
use fm_listener::ListenerHandle;
use fm_scenario::{CommandPort, PortError, ScenarioEngine};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::registry::ClientRegistry;

pub struct OrchestratorPort {
    listener: ListenerHandle,
    registry: Arc<ClientRegistry>,
    engine: Arc<ScenarioEngine<SystemClock>>,
    components: Arc<Components>,
    /// Self-reference so nested scenario runs share this port.
    weak_self: Weak<OrchestratorPort>,
    /// `maximum_processing_time` for emitted command events.
    command_timeout: f64,
}

impl OrchestratorPort {
    pub fn new(
        listener: ListenerHandle,
        registry: Arc<ClientRegistry>,
        engine: Arc<ScenarioEngine<SystemClock>>,
        components: Arc<Components>,
        command_timeout: f64,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            listener,
            registry,
            engine,
            components,
            weak_self: weak_self.clone(),
            command_timeout,
        })
    }

    fn strong_self(&self) -> Result<Arc<Self>, PortError> {
        self.weak_self
            .upgrade()
            .ok_or_else(|| PortError::Other("orchestrator port is shutting down".to_string()))
    }
}

#[async_trait]
impl CommandPort for OrchestratorPort {
    async fn send_event(
        &self,
        client: &str,
        event_type: &str,
        data: Map<String, Value>,
    ) -> Result<(), PortError> {
        let endpoint = self
            .registry
            .endpoint(client)
            .ok_or_else(|| PortError::UnknownClient(client.to_string()))?;
        self.listener
            .notify_event(&endpoint, event_type, data, self.command_timeout);
        Ok(())
    }

    fn clients(&self) -> HashMap<String, ClientRecord> {
        self.registry.snapshot()
    }

    async fn run_scenario(&self, name: &str, depth: u32) -> Result<Value, PortError> {
        let port = self.strong_self()?;
        self.engine
            .run_named(
                name,
                self.registry.snapshot(),
                Arc::clone(&self.components),
                port as Arc<dyn CommandPort>,
                depth,
            )
            .await
    }
}
