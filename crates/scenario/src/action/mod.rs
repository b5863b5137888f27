// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action contract and registry.
//!
//! Actions receive their template-resolved config plus the scenario
//! context and return an arbitrary JSON result that lands in the run's
//! action log. A raised [`ActionError`] aborts the scenario instance.
//!
//! The structural kinds (`evaluate_condition`, `execute_scenario`,
//! `wait_for_state`) need to recurse into the engine and are handled
//! there; everything else is resolved through this registry.

pub mod builtin;
pub mod outbound;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::context::ScenarioContext;

/// Failure inside an action's `execute`. Aborts the scenario instance.
#[derive(Debug, Error)]
#[error("action {action_type} failed: {message}")]
pub struct ActionError {
    pub action_type: String,
    pub message: String,
}

impl ActionError {
    pub fn new(action_type: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self { action_type: action_type.into(), message: message.to_string() }
    }
}

#[async_trait]
pub trait ActionKind: Send + Sync + 'static {
    async fn execute(&self, config: &Value, ctx: &ScenarioContext)
        -> Result<Value, ActionError>;
}

/// Tag → implementation lookup, same registration discipline as the
/// condition registry: explicit at startup, duplicate tag replaces
/// with a WARN so user-supplied kinds win.
#[derive(Default)]
pub struct ActionRegistry {
    kinds: HashMap<String, Arc<dyn ActionKind>>,
}

/// Error-counter thresholds for the outbound delivery kinds, from the
/// orchestrator's smtp/sms config blocks.
#[derive(Debug, Clone, Copy)]
pub struct OutboundPolicy {
    pub email_max_error_attempts: u32,
    pub sms_max_error_attempts: u32,
}

impl Default for OutboundPolicy {
    fn default() -> Self {
        Self { email_max_error_attempts: 3, sms_max_error_attempts: 3 }
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins(policy: OutboundPolicy) -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        outbound::register_outbound(&mut registry, policy);
        registry
    }

    pub fn register(&mut self, tag: impl Into<String>, kind: Arc<dyn ActionKind>) {
        let tag = tag.into();
        if self.kinds.insert(tag.clone(), kind).is_some() {
            warn!(tag = %tag, "action tag re-registered; later registration wins");
        }
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn ActionKind>> {
        self.kinds.get(tag).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.kinds.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
