// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound delivery kinds guarded by consecutive-error counters.
//!
//! Each kind consults the shared [`ErrorCounters`] before attempting
//! delivery: after `max_error_attempts` consecutive failures the
//! action becomes a WARN-logging no-op until a success of that kind
//! resets the counter (in practice the reset comes from operator ACK).

use async_trait::async_trait;
use fm_adapters::{EmailMessage, SmsMessage};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use super::{ActionError, ActionKind, ActionRegistry, OutboundPolicy};
use crate::context::ScenarioContext;

pub fn register_outbound(registry: &mut ActionRegistry, policy: OutboundPolicy) {
    registry.register(
        "send_email",
        Arc::new(SendEmailAction { max_error_attempts: policy.email_max_error_attempts }),
    );
    registry.register(
        "send_sms",
        Arc::new(SendSmsAction { max_error_attempts: policy.sms_max_error_attempts }),
    );
    registry.register("database_update", Arc::new(DatabaseUpdateAction));
}

fn skipped(kind: &str, count: u32) -> Value {
    warn!(action = kind, consecutive_errors = count, "skipped due to errors");
    json!({"skipped": true, "consecutive_errors": count})
}

/// `send_email`: deliver through the configured mail transport.
pub struct SendEmailAction {
    pub max_error_attempts: u32,
}

#[derive(Deserialize)]
struct SendEmailConfig {
    to: Value,
    subject: String,
    #[serde(default)]
    body: String,
}

fn recipient_list(to: &Value) -> Result<Vec<String>, String> {
    match to {
        Value::String(one) => Ok(vec![one.clone()]),
        Value::Array(many) => many
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("recipient {v} is not a string"))
            })
            .collect(),
        other => Err(format!("\"to\" must be a string or list, found {other}")),
    }
}

#[async_trait]
impl ActionKind for SendEmailAction {
    async fn execute(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<Value, ActionError> {
        if ctx.counters.should_skip("send_email", self.max_error_attempts) {
            return Ok(skipped("send_email", ctx.counters.count("send_email")));
        }
        let config: SendEmailConfig = serde_json::from_value(config.clone())
            .map_err(|e| ActionError::new("send_email", format!("invalid config: {e}")))?;
        let to = recipient_list(&config.to).map_err(|e| ActionError::new("send_email", e))?;
        let message = EmailMessage { to, subject: config.subject, body: config.body };

        let result = match ctx.components.mailer() {
            Ok(mailer) => mailer.send(&message).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                ctx.counters.record_success("send_email");
                Ok(json!({"sent": true, "recipients": message.to.len()}))
            }
            Err(e) => {
                let count = ctx.counters.record_failure("send_email");
                Err(ActionError::new(
                    "send_email",
                    format!("{e} (consecutive failures: {count})"),
                ))
            }
        }
    }
}

/// `send_sms`: deliver through the configured SMS gateway.
pub struct SendSmsAction {
    pub max_error_attempts: u32,
}

#[derive(Deserialize)]
struct SendSmsConfig {
    to: String,
    text: String,
}

#[async_trait]
impl ActionKind for SendSmsAction {
    async fn execute(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<Value, ActionError> {
        if ctx.counters.should_skip("send_sms", self.max_error_attempts) {
            return Ok(skipped("send_sms", ctx.counters.count("send_sms")));
        }
        let config: SendSmsConfig = serde_json::from_value(config.clone())
            .map_err(|e| ActionError::new("send_sms", format!("invalid config: {e}")))?;
        let message = SmsMessage { to: config.to, text: config.text };

        let result = match ctx.components.sms_gateway() {
            Ok(gateway) => gateway.send(&message).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                ctx.counters.record_success("send_sms");
                Ok(json!({"sent": true}))
            }
            Err(e) => {
                let count = ctx.counters.record_failure("send_sms");
                Err(ActionError::new(
                    "send_sms",
                    format!("{e} (consecutive failures: {count})"),
                ))
            }
        }
    }
}

/// `database_update`: transactional statement against a named
/// database component.
pub struct DatabaseUpdateAction;

#[derive(Deserialize)]
struct DatabaseUpdateConfig {
    component: String,
    query: String,
}

#[async_trait]
impl ActionKind for DatabaseUpdateAction {
    async fn execute(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<Value, ActionError> {
        let config: DatabaseUpdateConfig = serde_json::from_value(config.clone())
            .map_err(|e| ActionError::new("database_update", format!("invalid config: {e}")))?;
        let database = ctx
            .components
            .database(&config.component)
            .map_err(|e| ActionError::new("database_update", e))?;
        let rows_affected = database
            .execute(&config.query)
            .await
            .map_err(|e| ActionError::new("database_update", e))?;
        Ok(json!({"rows_affected": rows_affected}))
    }
}

#[cfg(test)]
#[path = "outbound_tests.rs"]
mod tests;
