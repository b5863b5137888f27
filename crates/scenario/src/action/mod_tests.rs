// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

struct Marker(&'static str);

#[async_trait]
impl ActionKind for Marker {
    async fn execute(
        &self,
        _config: &Value,
        _ctx: &ScenarioContext,
    ) -> Result<Value, ActionError> {
        Ok(json!(self.0))
    }
}

#[test]
fn builtin_registry_contains_standard_kinds() {
    let registry = ActionRegistry::with_builtins(OutboundPolicy::default());
    for tag in ["log_event", "send_command", "send_custom_command", "send_email", "send_sms", "database_update"] {
        assert!(registry.contains(tag), "missing builtin {tag}");
    }
}

#[test]
fn unknown_tag_resolves_to_none() {
    let registry = ActionRegistry::with_builtins(OutboundPolicy::default());
    assert!(registry.get("launch_rocket").is_none());
}

#[tokio::test]
async fn duplicate_tag_keeps_one_entry_and_later_wins() {
    let mut registry = ActionRegistry::new();
    registry.register("notify", Arc::new(Marker("first")));
    let before = registry.len();
    registry.register("notify", Arc::new(Marker("second")));
    assert_eq!(registry.len(), before);

    let ctx = crate::test_support::context(Default::default());
    let kind = registry.get("notify").unwrap();
    assert_eq!(kind.execute(&json!({}), &ctx).await.unwrap(), json!("second"));
}

#[test]
fn action_error_formats_kind_and_message() {
    let error = ActionError::new("send_email", "smtp unreachable");
    assert_eq!(error.to_string(), "action send_email failed: smtp unreachable");
}
