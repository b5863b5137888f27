// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builtin action kinds that need no external adapters.

use async_trait::async_trait;
use fm_core::{Command, Selector};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use super::{ActionError, ActionKind, ActionRegistry};
use crate::context::ScenarioContext;

pub fn register_builtins(registry: &mut ActionRegistry) {
    registry.register("log_event", Arc::new(LogEventAction));
    registry.register("send_command", Arc::new(SendCommandAction));
    registry.register("send_custom_command", Arc::new(SendCustomCommandAction));
}

fn bad_config(action_type: &str, e: impl std::fmt::Display) -> ActionError {
    ActionError::new(action_type, format!("invalid config: {e}"))
}

/// `log_event`: structured log line from a scenario.
pub struct LogEventAction;

#[derive(Deserialize)]
struct LogEventConfig {
    #[serde(default = "default_level")]
    level: String,
    message: String,
}

fn default_level() -> String {
    "info".to_string()
}

#[async_trait]
impl ActionKind for LogEventAction {
    async fn execute(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<Value, ActionError> {
        let config: LogEventConfig =
            serde_json::from_value(config.clone()).map_err(|e| bad_config("log_event", e))?;
        let scenario = ctx.scenario_name.as_str();
        match config.level.to_lowercase().as_str() {
            "error" => error!(scenario, "{}", config.message),
            "warn" | "warning" => warn!(scenario, "{}", config.message),
            "debug" => debug!(scenario, "{}", config.message),
            "trace" => trace!(scenario, "{}", config.message),
            _ => info!(scenario, "{}", config.message),
        }
        Ok(Value::Null)
    }
}

/// Resolve the selector keys of an action config against the live
/// client map.
fn resolve_selector(
    action_type: &str,
    config: &Value,
    ctx: &ScenarioContext,
) -> Result<Vec<String>, ActionError> {
    let selector = Selector::from_config(config).map_err(|e| bad_config(action_type, e))?;
    let names = selector.resolve(&ctx.port.clients());
    if names.is_empty() {
        return Err(ActionError::new(
            action_type,
            "selector resolved to no clients",
        ));
    }
    Ok(names)
}

/// `send_command`: dispatch one of the standard `CMD_*` events.
pub struct SendCommandAction;

#[derive(Deserialize)]
struct SendCommandConfig {
    command: String,
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
}

#[async_trait]
impl ActionKind for SendCommandAction {
    async fn execute(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<Value, ActionError> {
        let parsed: SendCommandConfig =
            serde_json::from_value(config.clone()).map_err(|e| bad_config("send_command", e))?;
        if Command::from_tag(&parsed.command).is_none() {
            return Err(ActionError::new(
                "send_command",
                format!("{:?} is not a lifecycle command", parsed.command),
            ));
        }
        let names = resolve_selector("send_command", config, ctx)?;
        for name in &names {
            ctx.port
                .send_event(name, &parsed.command, Map::new())
                .await
                .map_err(|e| ActionError::new("send_command", e))?;
        }
        info!(
            scenario = %ctx.scenario_name,
            command = %parsed.command,
            clients = names.len(),
            "command dispatched"
        );
        Ok(json!({"command": parsed.command, "sent_to": names}))
    }
}

/// `send_custom_command`: arbitrary event type with a payload.
pub struct SendCustomCommandAction;

#[derive(Deserialize)]
struct SendCustomCommandConfig {
    command: String,
    #[serde(default)]
    data: Map<String, Value>,
}

#[async_trait]
impl ActionKind for SendCustomCommandAction {
    async fn execute(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<Value, ActionError> {
        let parsed: SendCustomCommandConfig = serde_json::from_value(config.clone())
            .map_err(|e| bad_config("send_custom_command", e))?;
        if parsed.command.is_empty() {
            return Err(ActionError::new("send_custom_command", "command is empty"));
        }
        let names = resolve_selector("send_custom_command", config, ctx)?;
        for name in &names {
            ctx.port
                .send_event(name, &parsed.command, parsed.data.clone())
                .await
                .map_err(|e| ActionError::new("send_custom_command", e))?;
        }
        Ok(json!({"command": parsed.command, "sent_to": names}))
    }
}

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
