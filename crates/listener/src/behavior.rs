// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The behavior seam.
//!
//! A listener's domain logic is a [`Behavior`]: lifecycle hooks invoked
//! by the command handlers, a periodic local check that only runs in
//! RUN, and the RUN-state event analyzer. Every method defaults to a
//! no-op so components override only what they need.

use async_trait::async_trait;
use fm_core::Event;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::runtime::ListenerHandle;

/// Failure inside a lifecycle hook. Drives the listener to FAULT.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// What the analyzer did with a RUN-state event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// Fully handled; the event is dropped.
    Handled,
    /// Needs deferred work; the event moves to the processing queue.
    Defer,
}

#[async_trait]
pub trait Behavior: Send + Sync + 'static {
    async fn on_initialize(&self, _listener: &ListenerHandle) -> Result<(), HookError> {
        Ok(())
    }

    async fn on_run(&self, _listener: &ListenerHandle) -> Result<(), HookError> {
        Ok(())
    }

    async fn on_pause(&self, _listener: &ListenerHandle) -> Result<(), HookError> {
        Ok(())
    }

    async fn on_stop(&self, _listener: &ListenerHandle) -> Result<(), HookError> {
        Ok(())
    }

    async fn on_ack(&self, _listener: &ListenerHandle) -> Result<(), HookError> {
        Ok(())
    }

    /// Periodic work while in RUN, at the configured frequency.
    async fn check_local_data(&self, _listener: &ListenerHandle) -> Result<(), HookError> {
        Ok(())
    }

    /// Classify a non-lifecycle event received in RUN.
    async fn analyze_event(
        &self,
        _listener: &ListenerHandle,
        _event: &Event,
    ) -> Result<AnalyzeOutcome, HookError> {
        Ok(AnalyzeOutcome::Defer)
    }

    /// Extra fields merged into the exported state report.
    fn state_fields(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// A behavior with no domain logic; useful for plain relays and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBehavior;

#[async_trait]
impl Behavior for NullBehavior {}
