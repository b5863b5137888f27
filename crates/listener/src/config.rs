// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-listener runtime configuration.

use fm_core::Endpoint;
use fm_transport::SendOptions;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Logical component name, the `source` of every emitted event.
    pub name: String,
    /// Ingress bind address.
    pub address: String,
    /// Ingress bind port. 0 picks an ephemeral port.
    pub port: u16,
    /// Frequency of `check_local_data` while in RUN.
    pub local_check_interval: Duration,
    /// Frequency of the exported-state refresh.
    pub state_update_interval: Duration,
    /// Queue snapshot file; None disables persistence.
    pub snapshot_path: Option<PathBuf>,
    /// Outbound retry policy.
    pub send_options: SendOptions,
}

impl ListenerConfig {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
            local_check_interval: Duration::from_secs(1),
            state_update_interval: Duration::from_secs(2),
            snapshot_path: None,
            send_options: SendOptions::default(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.name.clone(), self.address.clone(), self.port)
    }
}
