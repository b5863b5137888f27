// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template substitution for action configs.
//!
//! `{{ var }}` and `{{ foo.bar.baz }}` resolve against the scenario
//! context's template root. A string that is exactly one placeholder
//! returns the bound value unchanged, preserving its type; anything
//! else renders to a string. Lists and maps are traversed; only string
//! leaves are candidates. Unknown variables leave the template text in
//! place and are reported once per resolution.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::warn;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_-]*(?:\.[A-Za-z0-9_-]+)*)\s*\}\}")
        .expect("constant regex pattern is valid")
});

/// Navigate a dotted path through objects (and array indices).
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Substitute placeholders in one string. Returns the resolved value
/// and collects unresolved variable names.
fn render_string(template: &str, root: &Value, missing: &mut BTreeSet<String>) -> Value {
    // Single-placeholder form: the bound value passes through with its
    // type intact.
    if let Some(captures) = VAR_PATTERN.captures(template) {
        if let Some(full) = captures.get(0) {
            if full.start() == 0 && full.end() == template.len() {
                let path = &captures[1];
                return match lookup_path(root, path) {
                    Some(value) => value.clone(),
                    None => {
                        missing.insert(path.to_string());
                        Value::String(template.to_string())
                    }
                };
            }
        }
    }

    let rendered = VAR_PATTERN.replace_all(template, |captures: &regex::Captures| {
        let path = &captures[1];
        match lookup_path(root, path) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) => String::new(),
            Some(value) => value.to_string(),
            None => {
                missing.insert(path.to_string());
                captures[0].to_string()
            }
        }
    });
    Value::String(rendered.into_owned())
}

/// Structural template resolution over an action config.
///
/// Logs one WARN per unresolved variable per invocation.
pub fn resolve_config(config: &Value, root: &Value) -> Value {
    let mut missing = BTreeSet::new();
    let resolved = resolve_inner(config, root, &mut missing);
    for path in missing {
        warn!(variable = %path, "template variable is not bound; leaving text intact");
    }
    resolved
}

fn resolve_inner(value: &Value, root: &Value, missing: &mut BTreeSet<String>) -> Value {
    match value {
        Value::String(template) => render_string(template, root, missing),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| resolve_inner(v, root, missing)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_inner(v, root, missing)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
