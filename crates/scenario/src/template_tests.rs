// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn root() -> Value {
    json!({
        "trigger": {
            "timeout_s": 30,
            "device": {"id": 7, "name": "gripper"},
            "orders": [{"id": "A-1"}, {"id": "A-2"}],
            "note": "belt jam"
        },
        "scenario_name": "restart"
    })
}

#[test]
fn single_placeholder_preserves_integer_type() {
    let resolved = resolve_config(&json!("{{ trigger.timeout_s }}"), &root());
    assert_eq!(resolved, json!(30));
}

#[test]
fn single_placeholder_preserves_object_type() {
    let resolved = resolve_config(&json!("{{ trigger.device }}"), &root());
    assert_eq!(resolved, json!({"id": 7, "name": "gripper"}));
}

#[test]
fn mixed_text_renders_as_string() {
    let resolved = resolve_config(&json!("error: {{ trigger.timeout_s }}s"), &root());
    assert_eq!(resolved, json!("error: 30s"));
}

#[test]
fn multiple_placeholders_render_as_string() {
    let resolved =
        resolve_config(&json!("{{ scenario_name }}: {{ trigger.note }}"), &root());
    assert_eq!(resolved, json!("restart: belt jam"));
}

#[test]
fn dotted_navigation_reaches_nested_values() {
    let resolved = resolve_config(&json!("{{ trigger.device.name }}"), &root());
    assert_eq!(resolved, json!("gripper"));
}

#[test]
fn array_index_navigation() {
    let resolved = resolve_config(&json!("{{ trigger.orders.1.id }}"), &root());
    assert_eq!(resolved, json!("A-2"));
}

#[test]
fn missing_variable_leaves_literal_text() {
    let resolved = resolve_config(&json!("{{ undefined }}"), &root());
    assert_eq!(resolved, json!("{{ undefined }}"));
}

#[test]
fn missing_variable_in_mixed_text_leaves_placeholder() {
    let resolved = resolve_config(&json!("x={{ undefined }} y={{ trigger.timeout_s }}"), &root());
    assert_eq!(resolved, json!("x={{ undefined }} y=30"));
}

#[test]
fn structural_recursion_reaches_nested_strings() {
    let config = json!({
        "type": "send_custom_command",
        "client": "io",
        "data": {
            "timeout": "{{ trigger.timeout_s }}",
            "devices": ["{{ trigger.device.id }}", "static"]
        }
    });
    let resolved = resolve_config(&config, &root());
    assert_eq!(resolved["data"]["timeout"], json!(30));
    assert_eq!(resolved["data"]["devices"], json!([7, "static"]));
}

#[test]
fn non_string_leaves_pass_through_untouched() {
    let config = json!({"count": 3, "flag": true, "nothing": null});
    assert_eq!(resolve_config(&config, &root()), config);
}

#[test]
fn whitespace_inside_braces_is_tolerated() {
    assert_eq!(resolve_config(&json!("{{trigger.timeout_s}}"), &root()), json!(30));
    assert_eq!(resolve_config(&json!("{{   trigger.timeout_s   }}"), &root()), json!(30));
}

#[test]
fn lookup_path_rejects_traversal_through_scalars() {
    assert!(lookup_path(&root(), "trigger.note.deeper").is_none());
    assert!(lookup_path(&root(), "trigger.orders.x").is_none());
}
