// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Selector sub-language for addressing components.
//!
//! Action configs carry one of `client`, `group`, `groups`, or
//! `target: "@all"`. Resolution expands to concrete client names against
//! the registry at dispatch time.

use serde::Deserialize;
use std::collections::HashMap;

use crate::client::ClientRecord;

/// A resolved-at-dispatch set of components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Client(String),
    Group(String),
    Groups(Vec<String>),
    All,
}

/// Raw selector keys as they appear inside an action config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorSpec {
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub groups: Option<Vec<String>>,
    #[serde(default)]
    pub target: Option<String>,
}

impl SelectorSpec {
    /// Collapse the raw keys into a selector. Exactly one of the four
    /// keys must be present; `target` only accepts `"@all"`.
    pub fn into_selector(self) -> Result<Selector, SelectorError> {
        let mut found = Vec::new();
        if let Some(client) = self.client {
            found.push(Selector::Client(client));
        }
        if let Some(group) = self.group {
            found.push(Selector::Group(group));
        }
        if let Some(groups) = self.groups {
            found.push(Selector::Groups(groups));
        }
        if let Some(target) = self.target {
            if target != "@all" {
                return Err(SelectorError::UnknownTarget(target));
            }
            found.push(Selector::All);
        }
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(SelectorError::Missing),
            _ => Err(SelectorError::Ambiguous),
        }
    }
}

impl Selector {
    /// Parse a selector from an action config value.
    pub fn from_config(config: &serde_json::Value) -> Result<Selector, SelectorError> {
        let spec: SelectorSpec =
            serde_json::from_value(config.clone()).map_err(|_| SelectorError::Missing)?;
        spec.into_selector()
    }

    /// Expand to concrete client names. Order follows the registry map
    /// iteration for group/all selectors; single-client selectors pass
    /// the name through even when unregistered (the send will fail and
    /// surface there).
    pub fn resolve(&self, clients: &HashMap<String, ClientRecord>) -> Vec<String> {
        match self {
            Selector::Client(name) => vec![name.clone()],
            Selector::Group(group) => {
                let mut names: Vec<String> = clients
                    .iter()
                    .filter(|(_, rec)| rec.groups.iter().any(|g| g == group))
                    .map(|(name, _)| name.clone())
                    .collect();
                names.sort();
                names
            }
            Selector::Groups(groups) => {
                let mut names: Vec<String> = clients
                    .iter()
                    .filter(|(_, rec)| rec.groups.iter().any(|g| groups.contains(g)))
                    .map(|(name, _)| name.clone())
                    .collect();
                names.sort();
                names
            }
            Selector::All => {
                let mut names: Vec<String> = clients.keys().cloned().collect();
                names.sort();
                names
            }
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("selector requires one of: client, group, groups, target")]
    Missing,
    #[error("selector carries more than one of: client, group, groups, target")]
    Ambiguous,
    #[error("unknown target {0:?} (only \"@all\" is supported)")]
    UnknownTarget(String),
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
