// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario file loading and validation.
//!
//! Files load from the builtin directory first, then the user
//! directory. Invalid files are logged and skipped; a duplicate name
//! is replaced by the later file with a WARN, so user scenarios
//! deterministically override builtins.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::Scenario;

#[derive(Debug, Error)]
pub enum ScenarioValidationError {
    #[error("unreadable file: {0}")]
    Io(String),

    #[error("invalid JSON: {0}")]
    Parse(String),

    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// Result of one loading pass.
#[derive(Default)]
pub struct LoadReport {
    /// Valid scenarios in priority order.
    pub scenarios: Vec<Scenario>,
    /// Files that failed to load, with their reasons.
    pub skipped: Vec<(PathBuf, ScenarioValidationError)>,
}

/// Parse one scenario document.
pub fn parse_scenario(text: &str) -> Result<Scenario, ScenarioValidationError> {
    let scenario: Scenario =
        serde_json::from_str(text).map_err(|e| ScenarioValidationError::Parse(e.to_string()))?;
    validate(&scenario)?;
    Ok(scenario)
}

fn validate(scenario: &Scenario) -> Result<(), ScenarioValidationError> {
    if scenario.name.trim().is_empty() {
        return Err(ScenarioValidationError::Invalid("name is empty".to_string()));
    }
    if scenario.cooldown < 0.0 {
        return Err(ScenarioValidationError::Invalid(format!(
            "cooldown {} is negative",
            scenario.cooldown
        )));
    }
    if scenario.max_concurrent_executions == 0 {
        return Err(ScenarioValidationError::Invalid(
            "max_concurrent_executions must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Load every `*.json` scenario under the given directories, in order.
pub fn load_scenario_dirs(dirs: &[&Path]) -> LoadReport {
    let mut report = LoadReport::default();
    let mut by_name: IndexMap<String, Scenario> = IndexMap::new();

    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }
        for path in scenario_files(dir) {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable scenario file");
                    report.skipped.push((path, ScenarioValidationError::Io(e.to_string())));
                    continue;
                }
            };
            let scenario = match parse_scenario(&text) {
                Ok(scenario) => scenario,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping invalid scenario file");
                    report.skipped.push((path, e));
                    continue;
                }
            };
            if by_name.contains_key(&scenario.name) {
                warn!(
                    name = %scenario.name,
                    path = %path.display(),
                    "duplicate scenario name; later file wins"
                );
            }
            by_name.insert(scenario.name.clone(), scenario);
        }
    }

    let mut scenarios: Vec<Scenario> = by_name.into_values().collect();
    // stable: equal priorities keep load order
    scenarios.sort_by_key(|s| s.priority);
    info!(count = scenarios.len(), skipped = report.skipped.len(), "scenarios loaded");
    report.scenarios = scenarios;
    report
}

fn scenario_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read scenario directory");
            Vec::new()
        }
    };
    files.sort();
    files
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
