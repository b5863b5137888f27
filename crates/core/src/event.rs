// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event record exchanged between components.
//!
//! Events are immutable once constructed: replies are new records that
//! carry the original `id` with source and destination swapped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::fsm::Command;

/// Default number of seconds after which a sender considers an event lost.
pub const DEFAULT_MAX_PROCESSING_TIME: f64 = 10.0;

/// Reply coordinates of a component: logical name plus HTTP address/port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub address: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self { name: name.into(), address: address.into(), port }
    }

    /// Base URL for the component's event ingress.
    pub fn url(&self) -> String {
        format!("http://{}:{}/event", self.address, self.port)
    }
}

/// Outcome carried by reply events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl EventResult {
    pub fn ok() -> Self {
        Self { success: true, message: None, data: None }
    }

    pub fn ok_with(data: Value) -> Self {
        Self { success: true, message: None, data: Some(data) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: Some(message.into()), data: None }
    }
}

/// Immutable event record.
///
/// `id` is monotonic per sender and unique only within one sender; the
/// pair `(source, id)` identifies an event fleet-wide. Replies keep the
/// original `id` and swap the source/destination coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub source: String,
    pub source_address: String,
    pub source_port: u16,
    pub destination: String,
    pub destination_address: String,
    pub destination_port: u16,
    pub event_type: SmolStr,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<EventResult>,
    #[serde(default = "default_max_processing_time")]
    pub maximum_processing_time: f64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn default_max_processing_time() -> f64 {
    DEFAULT_MAX_PROCESSING_TIME
}

impl Event {
    /// Construct an outbound event from `source` to `destination`.
    pub fn new(
        id: u64,
        source: &Endpoint,
        destination: &Endpoint,
        event_type: impl Into<SmolStr>,
        data: Map<String, Value>,
        maximum_processing_time: f64,
    ) -> Self {
        Self {
            id,
            source: source.name.clone(),
            source_address: source.address.clone(),
            source_port: source.port,
            destination: destination.name.clone(),
            destination_address: destination.address.clone(),
            destination_port: destination.port,
            event_type: event_type.into(),
            data,
            result: None,
            maximum_processing_time,
            timestamp: Utc::now(),
        }
    }

    /// Build the reply to this event: same `id` and `event_type`, source
    /// and destination swapped, fresh timestamp, result attached.
    pub fn reply(&self, result: EventResult) -> Event {
        Event {
            id: self.id,
            source: self.destination.clone(),
            source_address: self.destination_address.clone(),
            source_port: self.destination_port,
            destination: self.source.clone(),
            destination_address: self.source_address.clone(),
            destination_port: self.source_port,
            event_type: self.event_type.clone(),
            data: Map::new(),
            result: Some(result),
            maximum_processing_time: self.maximum_processing_time,
            timestamp: Utc::now(),
        }
    }

    /// True when this event is a reply to one of ours.
    pub fn is_reply(&self) -> bool {
        self.result.is_some()
    }

    /// The lifecycle command this event carries, if any.
    pub fn command(&self) -> Option<Command> {
        Command::from_tag(&self.event_type)
    }

    /// Reply coordinates of the sender.
    pub fn source_endpoint(&self) -> Endpoint {
        Endpoint::new(self.source.clone(), self.source_address.clone(), self.source_port)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
