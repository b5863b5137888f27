// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{client_in_state, context};
use serde_json::json;
use std::collections::HashMap;

fn ctx_io_run() -> ScenarioContext {
    let mut clients = HashMap::new();
    clients.insert("io".to_string(), client_in_state(json!(4)));
    clients.insert("algo".to_string(), client_in_state(json!(0)));
    context(clients)
}

fn leaf(client: &str, state: &str) -> Value {
    json!({"client_state": {"client": client, "state": state}})
}

async fn eval(tree: Value, ctx: &ScenarioContext) -> ConditionOutcome {
    let condition = Condition::parse(&tree).unwrap();
    let registry = ConditionRegistry::with_builtins();
    evaluate_tree(&condition, &registry, ctx).await
}

#[test]
fn parse_requires_single_top_level_key() {
    assert!(Condition::parse(&json!({"and": [], "or": []})).is_err());
    assert!(Condition::parse(&json!({})).is_err());
    assert!(Condition::parse(&json!("and")).is_err());
}

#[test]
fn parse_accepts_all_child_forms() {
    // list form
    assert!(matches!(
        Condition::parse(&json!({"and": [leaf("io", "RUN")]})).unwrap(),
        Condition::And(children) if children.len() == 1
    ));
    // wrapped form
    assert!(matches!(
        Condition::parse(&json!({"or": {"conditions": [leaf("io", "RUN"), leaf("algo", "RUN")]}}))
            .unwrap(),
        Condition::Or(children) if children.len() == 2
    ));
    // single-child form
    assert!(matches!(
        Condition::parse(&json!({"not": leaf("io", "RUN")})).unwrap(),
        Condition::Not(_)
    ));
}

#[test]
fn not_rejects_multiple_children() {
    let result = Condition::parse(&json!({"not": [leaf("io", "RUN"), leaf("algo", "RUN")]}));
    assert!(result.is_err());
}

#[test]
fn unknown_tag_parses_as_leaf() {
    let condition = Condition::parse(&json!({"shift_active": {"shift": "night"}})).unwrap();
    assert!(matches!(condition, Condition::Leaf { tag, .. } if tag == "shift_active"));
}

#[tokio::test]
async fn and_requires_every_child() {
    let ctx = ctx_io_run();
    assert!(eval(json!({"and": [leaf("io", "RUN"), leaf("algo", "STOPPED")]}), &ctx).await.matched);
    assert!(!eval(json!({"and": [leaf("io", "RUN"), leaf("algo", "RUN")]}), &ctx).await.matched);
}

#[tokio::test]
async fn or_takes_first_match() {
    let ctx = ctx_io_run();
    assert!(eval(json!({"or": [leaf("io", "PAUSE"), leaf("algo", "STOPPED")]}), &ctx).await.matched);
    assert!(!eval(json!({"or": [leaf("io", "PAUSE"), leaf("algo", "PAUSE")]}), &ctx).await.matched);
}

#[tokio::test]
async fn not_inverts_the_child() {
    let ctx = ctx_io_run();
    assert!(eval(json!({"not": leaf("io", "PAUSE")}), &ctx).await.matched);
    assert!(!eval(json!({"not": leaf("io", "RUN")}), &ctx).await.matched);
}

#[tokio::test]
async fn xor_requires_exactly_one_match() {
    let ctx = ctx_io_run();
    assert!(eval(json!({"xor": [leaf("io", "RUN"), leaf("algo", "RUN")]}), &ctx).await.matched);
    assert!(
        !eval(json!({"xor": [leaf("io", "RUN"), leaf("algo", "STOPPED")]}), &ctx).await.matched
    );
    assert!(!eval(json!({"xor": [leaf("io", "PAUSE"), leaf("algo", "RUN")]}), &ctx).await.matched);
}

#[tokio::test]
async fn nand_and_nor_invert_their_bases() {
    let ctx = ctx_io_run();
    assert!(!eval(json!({"nand": [leaf("io", "RUN"), leaf("algo", "STOPPED")]}), &ctx).await.matched);
    assert!(eval(json!({"nand": [leaf("io", "RUN"), leaf("algo", "RUN")]}), &ctx).await.matched);
    assert!(eval(json!({"nor": [leaf("io", "PAUSE"), leaf("algo", "PAUSE")]}), &ctx).await.matched);
    assert!(!eval(json!({"nor": [leaf("io", "RUN")]}), &ctx).await.matched);
}

#[tokio::test]
async fn unknown_leaf_tag_is_false_not_fatal() {
    let ctx = ctx_io_run();
    assert!(!eval(json!({"shift_active": {}}), &ctx).await.matched);
    // and still composes
    assert!(!eval(json!({"and": [leaf("io", "RUN"), {"shift_active": {}}]}), &ctx).await.matched);
}

#[tokio::test]
async fn and_merges_child_bindings() {
    let mut clients = HashMap::new();
    clients.insert("io".to_string(), crate::test_support::faulted_client("gripper jam"));
    let ctx = context(clients);
    let tree = json!({"and": [
        {"error_message": {"client": "io", "pattern": "jam"}},
        {"not": {"client_state": {"client": "io", "state": "RUN"}}}
    ]});
    let outcome = eval(tree, &ctx).await;
    assert!(outcome.matched);
    assert_eq!(outcome.bindings["client"], json!("io"));
    assert_eq!(outcome.bindings["error_message"], json!("gripper jam"));
}

#[test]
fn registry_replaces_duplicate_tags_keeping_one_entry() {
    struct AlwaysTrue;
    #[async_trait]
    impl ConditionKind for AlwaysTrue {
        async fn evaluate(
            &self,
            _config: &Value,
            _ctx: &ScenarioContext,
        ) -> Result<ConditionOutcome, ConditionError> {
            Ok(ConditionOutcome::yes())
        }
    }

    let mut registry = ConditionRegistry::with_builtins();
    let before = registry.len();
    registry.register("client_state", Arc::new(AlwaysTrue));
    assert_eq!(registry.len(), before);
    assert!(registry.contains("client_state"));
}
