// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builtin leaf condition kinds.

use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use fm_core::{ClientRecord, FsmState};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{ConditionError, ConditionKind, ConditionOutcome, ConditionRegistry};
use crate::context::ScenarioContext;

pub fn register_builtins(registry: &mut ConditionRegistry) {
    registry.register("client_state", Arc::new(ClientStateCondition));
    registry.register("time", Arc::new(TimeCondition));
    registry.register("error_message", Arc::new(ErrorMessageCondition));
    registry.register("database", Arc::new(DatabaseCondition));
    registry.register("database_list", Arc::new(DatabaseListCondition));
    registry.register("virtual_device_error", Arc::new(VirtualDeviceErrorCondition));
}

fn config_error<T>(tag: &str, e: impl std::fmt::Display) -> Result<T, ConditionError> {
    Err(ConditionError::Config { tag: tag.to_string(), message: e.to_string() })
}

/// Compare a reported state against a wanted one. Core listeners
/// report integer FSM codes, domain components may report their own
/// state names; the comparison bridges codes and canonical names.
pub fn state_matches(reported: Option<&Value>, wanted: &Value) -> bool {
    let Some(reported) = reported else {
        return false;
    };
    match wanted {
        Value::Array(options) => options.iter().any(|w| state_matches(Some(reported), w)),
        Value::String(name) => match reported {
            Value::String(s) => s == name,
            Value::Number(n) => code_name(n).as_deref() == Some(name),
            _ => false,
        },
        Value::Number(code) => match reported {
            Value::Number(n) => n == code,
            Value::String(s) => FsmState::from_name(s)
                .and_then(|state| code.as_i64().map(|c| c == i64::from(state.code())))
                .unwrap_or(false),
            _ => false,
        },
        _ => false,
    }
}

fn code_name(n: &serde_json::Number) -> Option<String> {
    let code = i8::try_from(n.as_i64()?).ok()?;
    FsmState::try_from(code).ok().map(|state| state.name().to_string())
}

/// `client_state`: one client's reported state against a value or set.
pub struct ClientStateCondition;

#[derive(Deserialize)]
struct ClientStateConfig {
    client: String,
    #[serde(default)]
    state: Option<Value>,
    #[serde(default)]
    states: Option<Vec<Value>>,
}

#[async_trait]
impl ConditionKind for ClientStateCondition {
    async fn evaluate(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<ConditionOutcome, ConditionError> {
        let config: ClientStateConfig = match serde_json::from_value(config.clone()) {
            Ok(config) => config,
            Err(e) => return config_error("client_state", e),
        };
        let wanted = match (config.state, config.states) {
            (Some(state), None) => state,
            (None, Some(states)) => Value::Array(states),
            _ => {
                return config_error("client_state", "exactly one of state/states is required");
            }
        };
        let matched = ctx
            .clients
            .get(&config.client)
            .map(|record| state_matches(record.fsm_state.as_ref(), &wanted))
            .unwrap_or(false);
        Ok(ConditionOutcome { matched, bindings: Map::new() })
    }
}

/// `time`: wall-clock window and weekday schedule.
pub struct TimeCondition;

#[derive(Deserialize)]
struct TimeConfig {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    before: Option<String>,
    #[serde(default)]
    days: Option<Vec<String>>,
}

fn parse_hhmm(tag: &str, s: &str) -> Result<u32, ConditionError> {
    let (h, m) = match s.split_once(':') {
        Some(parts) => parts,
        None => return config_error(tag, format!("expected HH:MM, found {s:?}")),
    };
    let hours: u32 = match h.parse() {
        Ok(v) if v < 24 => v,
        _ => return config_error(tag, format!("bad hour in {s:?}")),
    };
    let minutes: u32 = match m.parse() {
        Ok(v) if v < 60 => v,
        _ => return config_error(tag, format!("bad minute in {s:?}")),
    };
    Ok(hours * 60 + minutes)
}

#[async_trait]
impl ConditionKind for TimeCondition {
    async fn evaluate(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<ConditionOutcome, ConditionError> {
        let config: TimeConfig = match serde_json::from_value(config.clone()) {
            Ok(config) => config,
            Err(e) => return config_error("time", e),
        };
        let now = ctx.now;
        if let Some(days) = &config.days {
            let today = now.weekday().to_string().to_lowercase();
            let matched = days.iter().any(|d| today.starts_with(&d.to_lowercase()));
            if !matched {
                return Ok(ConditionOutcome::no());
            }
        }
        let minute_of_day = now.hour() * 60 + now.minute();
        let in_window = match (&config.after, &config.before) {
            (Some(after), Some(before)) => {
                let after = parse_hhmm("time", after)?;
                let before = parse_hhmm("time", before)?;
                if after <= before {
                    minute_of_day >= after && minute_of_day < before
                } else {
                    // window wraps midnight
                    minute_of_day >= after || minute_of_day < before
                }
            }
            (Some(after), None) => minute_of_day >= parse_hhmm("time", after)?,
            (None, Some(before)) => minute_of_day < parse_hhmm("time", before)?,
            (None, None) => true,
        };
        Ok(ConditionOutcome { matched: in_window, bindings: Map::new() })
    }
}

/// `error_message`: match reported error messages across clients.
pub struct ErrorMessageCondition;

#[derive(Deserialize)]
struct ErrorMessageConfig {
    #[serde(default)]
    client: Option<String>,
    #[serde(default)]
    clients: Option<Vec<String>>,
    pattern: String,
    #[serde(rename = "match", default = "default_match_mode")]
    mode: String,
    /// Only consider clients in FAULT or reporting error=true.
    #[serde(default = "default_true")]
    only_errors: bool,
    /// Binding key for the first regex capture group.
    #[serde(default)]
    bind: Option<String>,
}

fn default_match_mode() -> String {
    "substring".to_string()
}

fn default_true() -> bool {
    true
}

fn is_faulted(record: &ClientRecord) -> bool {
    record.error || state_matches(record.fsm_state.as_ref(), &json!("FAULT"))
}

#[async_trait]
impl ConditionKind for ErrorMessageCondition {
    async fn evaluate(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<ConditionOutcome, ConditionError> {
        let config: ErrorMessageConfig = match serde_json::from_value(config.clone()) {
            Ok(config) => config,
            Err(e) => return config_error("error_message", e),
        };
        let mut names: Vec<String> = match (&config.client, &config.clients) {
            (Some(client), _) => vec![client.clone()],
            (None, Some(clients)) => clients.clone(),
            (None, None) => ctx.clients.keys().cloned().collect(),
        };
        names.sort();

        let regex = if config.mode == "regex" {
            match Regex::new(&config.pattern) {
                Ok(regex) => Some(regex),
                Err(e) => return config_error("error_message", e),
            }
        } else {
            None
        };

        for name in names {
            let Some(record) = ctx.clients.get(&name) else {
                continue;
            };
            if config.only_errors && !is_faulted(record) {
                continue;
            }
            let Some(message) = record.error_message.as_deref() else {
                continue;
            };
            let mut bindings = Map::new();
            let matched = match config.mode.as_str() {
                "exact" => message == config.pattern,
                "starts_with" => message.starts_with(&config.pattern),
                "regex" => match &regex {
                    Some(regex) => match regex.captures(message) {
                        Some(captures) => {
                            for group in regex.capture_names().flatten() {
                                if let Some(m) = captures.name(group) {
                                    bindings.insert(group.to_string(), json!(m.as_str()));
                                }
                            }
                            if let (Some(bind), Some(m)) = (&config.bind, captures.get(1)) {
                                bindings.insert(bind.clone(), json!(m.as_str()));
                            }
                            true
                        }
                        None => false,
                    },
                    None => false,
                },
                "substring" => message.contains(&config.pattern),
                other => {
                    return config_error("error_message", format!("unknown match mode {other:?}"));
                }
            };
            if matched {
                bindings.insert("client".into(), json!(name));
                bindings.insert("error_message".into(), json!(message));
                return Ok(ConditionOutcome::yes_with(bindings));
            }
        }
        Ok(ConditionOutcome::no())
    }
}

/// `database`: single-value query compared against an expectation.
pub struct DatabaseCondition;

#[derive(Deserialize)]
struct DatabaseConfig {
    component: String,
    query: String,
    expected: Value,
    #[serde(default = "default_operator")]
    operator: String,
    #[serde(default)]
    bind: Option<String>,
}

fn default_operator() -> String {
    "eq".to_string()
}

fn compare_values(value: &Value, expected: &Value, operator: &str) -> Result<bool, String> {
    match operator {
        "eq" => Ok(value == expected),
        "ne" => Ok(value != expected),
        "gt" | "gte" | "lt" | "lte" => {
            let (a, b) = match (value.as_f64(), expected.as_f64()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(format!("operator {operator} requires numeric operands")),
            };
            Ok(match operator {
                "gt" => a > b,
                "gte" => a >= b,
                "lt" => a < b,
                _ => a <= b,
            })
        }
        other => Err(format!("unknown operator {other:?}")),
    }
}

#[async_trait]
impl ConditionKind for DatabaseCondition {
    async fn evaluate(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<ConditionOutcome, ConditionError> {
        let config: DatabaseConfig = match serde_json::from_value(config.clone()) {
            Ok(config) => config,
            Err(e) => return config_error("database", e),
        };
        let database = ctx.components.database(&config.component)?;
        let value = database.query_value(&config.query).await?.unwrap_or(Value::Null);
        let matched = compare_values(&value, &config.expected, &config.operator)
            .map_err(|message| ConditionError::Config { tag: "database".into(), message })?;
        let mut bindings = Map::new();
        if matched {
            if let Some(bind) = config.bind {
                bindings.insert(bind, value);
            }
        }
        Ok(ConditionOutcome { matched, bindings })
    }
}

/// `database_list`: multi-row query bound into the trigger context;
/// true iff the result is non-empty.
pub struct DatabaseListCondition;

#[derive(Deserialize)]
struct DatabaseListConfig {
    component: String,
    query: String,
    #[serde(default = "default_rows_bind")]
    bind: String,
}

fn default_rows_bind() -> String {
    "rows".to_string()
}

#[async_trait]
impl ConditionKind for DatabaseListCondition {
    async fn evaluate(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<ConditionOutcome, ConditionError> {
        let config: DatabaseListConfig = match serde_json::from_value(config.clone()) {
            Ok(config) => config,
            Err(e) => return config_error("database_list", e),
        };
        let database = ctx.components.database(&config.component)?;
        let rows = database.query_rows(&config.query).await?;
        if rows.is_empty() {
            return Ok(ConditionOutcome::no());
        }
        let mut bindings = Map::new();
        bindings.insert(config.bind, Value::Array(rows));
        Ok(ConditionOutcome::yes_with(bindings))
    }
}

/// `virtual_device_error`: query one client's
/// `io_server.failed_virtual_devices` map.
pub struct VirtualDeviceErrorCondition;

#[derive(Deserialize)]
struct VirtualDeviceErrorConfig {
    client: String,
    #[serde(default)]
    device_id: Option<Value>,
    #[serde(default)]
    device_type: Option<String>,
    #[serde(default)]
    physical_device: Option<String>,
}

#[async_trait]
impl ConditionKind for VirtualDeviceErrorCondition {
    async fn evaluate(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<ConditionOutcome, ConditionError> {
        let config: VirtualDeviceErrorConfig = match serde_json::from_value(config.clone()) {
            Ok(config) => config,
            Err(e) => return config_error("virtual_device_error", e),
        };
        let Some(record) = ctx.clients.get(&config.client) else {
            return Ok(ConditionOutcome::no());
        };
        let Some(failed) = record
            .extra
            .get("io_server")
            .and_then(|io| io.get("failed_virtual_devices"))
            .and_then(Value::as_object)
        else {
            return Ok(ConditionOutcome::no());
        };

        let wanted_id = config.device_id.as_ref().map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

        let mut device_ids: Vec<&String> = failed.keys().collect();
        device_ids.sort();
        for device_id in device_ids {
            // Map values checked for presence via keys().
            let Some(device) = failed.get(device_id) else {
                continue;
            };
            if let Some(wanted) = &wanted_id {
                if device_id != wanted {
                    continue;
                }
            }
            if let Some(wanted) = &config.device_type {
                if device.get("device_type").and_then(Value::as_str) != Some(wanted) {
                    continue;
                }
            }
            if let Some(wanted) = &config.physical_device {
                if device.get("physical_device").and_then(Value::as_str) != Some(wanted) {
                    continue;
                }
            }
            let mut bindings = Map::new();
            bindings.insert("client".into(), json!(config.client));
            bindings.insert("device_id".into(), json!(device_id));
            for key in ["physical_device", "error_message", "device_type"] {
                if let Some(value) = device.get(key) {
                    bindings.insert(key.into(), value.clone());
                }
            }
            return Ok(ConditionOutcome::yes_with(bindings));
        }
        Ok(ConditionOutcome::no())
    }
}

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
