// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition tree: logical nodes over registry-resolved leaf kinds.
//!
//! A condition node is a JSON mapping with exactly one top-level key.
//! Logical tags (`and`, `or`, `not`, `xor`, `nand`, `nor`) wrap child
//! conditions; any other tag is a leaf resolved through the
//! [`ConditionRegistry`] at evaluation time. Evaluation failures count
//! as "condition is false" and are logged.

pub mod builtin;

use async_trait::async_trait;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::context::ScenarioContext;

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("invalid {tag} condition: {message}")]
    Config { tag: String, message: String },

    #[error("{0}")]
    Evaluation(String),
}

impl From<fm_adapters::ComponentError> for ConditionError {
    fn from(e: fm_adapters::ComponentError) -> Self {
        ConditionError::Evaluation(e.to_string())
    }
}

/// Result of evaluating one node: the verdict plus any bindings the
/// node contributes to the trigger context.
#[derive(Debug, Clone, Default)]
pub struct ConditionOutcome {
    pub matched: bool,
    pub bindings: Map<String, Value>,
}

impl ConditionOutcome {
    pub fn no() -> Self {
        Self { matched: false, bindings: Map::new() }
    }

    pub fn yes() -> Self {
        Self { matched: true, bindings: Map::new() }
    }

    pub fn yes_with(bindings: Map<String, Value>) -> Self {
        Self { matched: true, bindings }
    }
}

/// A leaf condition implementation, registered by tag.
#[async_trait]
pub trait ConditionKind: Send + Sync + 'static {
    async fn evaluate(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<ConditionOutcome, ConditionError>;
}

/// Tag → implementation lookup. Registration is explicit at startup;
/// a duplicate tag replaces the earlier entry with a WARN, so kinds
/// registered later (user-supplied) deterministically win.
#[derive(Default)]
pub struct ConditionRegistry {
    kinds: HashMap<String, Arc<dyn ConditionKind>>,
}

impl ConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, tag: impl Into<String>, kind: Arc<dyn ConditionKind>) {
        let tag = tag.into();
        if self.kinds.insert(tag.clone(), kind).is_some() {
            warn!(tag = %tag, "condition tag re-registered; later registration wins");
        }
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn ConditionKind>> {
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

/// Parsed condition tree.
#[derive(Debug, Clone)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Xor(Vec<Condition>),
    Nand(Vec<Condition>),
    Nor(Vec<Condition>),
    Leaf { tag: String, config: Value },
}

impl Condition {
    /// Parse a node: a mapping with exactly one top-level key.
    pub fn parse(value: &Value) -> Result<Condition, String> {
        let Some(object) = value.as_object() else {
            return Err("condition node must be an object".to_string());
        };
        if object.len() != 1 {
            return Err(format!(
                "condition node must have exactly one top-level key, found {}",
                object.len()
            ));
        }
        // Single-entry map checked above.
        let Some((tag, body)) = object.iter().next() else {
            return Err("condition node is empty".to_string());
        };
        match tag.as_str() {
            "and" => Ok(Condition::And(Self::parse_children(body)?)),
            "or" => Ok(Condition::Or(Self::parse_children(body)?)),
            "xor" => Ok(Condition::Xor(Self::parse_children(body)?)),
            "nand" => Ok(Condition::Nand(Self::parse_children(body)?)),
            "nor" => Ok(Condition::Nor(Self::parse_children(body)?)),
            "not" => {
                let mut children = Self::parse_children(body)?;
                if children.len() != 1 {
                    return Err(format!("not takes exactly one child, found {}", children.len()));
                }
                // Length checked above.
                match children.pop() {
                    Some(child) => Ok(Condition::Not(Box::new(child))),
                    None => Err("not takes exactly one child".to_string()),
                }
            }
            _ => Ok(Condition::Leaf { tag: tag.clone(), config: body.clone() }),
        }
    }

    /// Children come as a list, a `{ conditions: [...] }` wrapper, or a
    /// single condition object.
    fn parse_children(body: &Value) -> Result<Vec<Condition>, String> {
        let items: Vec<&Value> = match body {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => match map.get("conditions") {
                Some(Value::Array(items)) => items.iter().collect(),
                Some(other) => vec![other],
                None => vec![body],
            },
            other => {
                return Err(format!("logical node expects conditions, found {other}"));
            }
        };
        items.into_iter().map(Condition::parse).collect()
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Condition::parse(&value).map_err(D::Error::custom)
    }
}

type OutcomeFuture<'a> = Pin<Box<dyn Future<Output = ConditionOutcome> + Send + 'a>>;

/// Evaluate a condition tree. Leaf errors and unknown tags are logged
/// and count as false.
pub fn evaluate_tree<'a>(
    condition: &'a Condition,
    registry: &'a ConditionRegistry,
    ctx: &'a ScenarioContext,
) -> OutcomeFuture<'a> {
    Box::pin(async move {
        match condition {
            Condition::And(children) => {
                let mut bindings = Map::new();
                for child in children {
                    let outcome = evaluate_tree(child, registry, ctx).await;
                    if !outcome.matched {
                        return ConditionOutcome::no();
                    }
                    bindings.extend(outcome.bindings);
                }
                ConditionOutcome::yes_with(bindings)
            }
            Condition::Or(children) => {
                for child in children {
                    let outcome = evaluate_tree(child, registry, ctx).await;
                    if outcome.matched {
                        return outcome;
                    }
                }
                ConditionOutcome::no()
            }
            Condition::Not(child) => {
                let outcome = evaluate_tree(child, registry, ctx).await;
                if outcome.matched {
                    ConditionOutcome::no()
                } else {
                    ConditionOutcome::yes()
                }
            }
            Condition::Xor(children) => {
                let mut matched = None;
                for child in children {
                    let outcome = evaluate_tree(child, registry, ctx).await;
                    if outcome.matched {
                        if matched.is_some() {
                            return ConditionOutcome::no();
                        }
                        matched = Some(outcome);
                    }
                }
                matched.unwrap_or_else(ConditionOutcome::no)
            }
            Condition::Nand(children) => {
                let all = evaluate_tree_all(children, registry, ctx).await;
                if all { ConditionOutcome::no() } else { ConditionOutcome::yes() }
            }
            Condition::Nor(children) => {
                for child in children {
                    if evaluate_tree(child, registry, ctx).await.matched {
                        return ConditionOutcome::no();
                    }
                }
                ConditionOutcome::yes()
            }
            Condition::Leaf { tag, config } => {
                let Some(kind) = registry.get(tag) else {
                    warn!(tag = %tag, "unknown condition tag treated as false");
                    return ConditionOutcome::no();
                };
                match kind.evaluate(config, ctx).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(
                            tag = %tag,
                            scenario = %ctx.scenario_name,
                            error = %e,
                            "condition evaluation failed; treated as false"
                        );
                        ConditionOutcome::no()
                    }
                }
            }
        }
    })
}

async fn evaluate_tree_all(
    children: &[Condition],
    registry: &ConditionRegistry,
    ctx: &ScenarioContext,
) -> bool {
    for child in children {
        if !evaluate_tree(child, registry, ctx).await.matched {
            return false;
        }
    }
    true
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
