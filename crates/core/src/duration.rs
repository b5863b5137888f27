// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing of human duration strings from scenario files.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("empty duration string")]
    Empty,
    #[error("invalid duration {0:?} (expected forms: \"250ms\", \"30s\", \"5m\", \"1h\")")]
    Invalid(String),
}

/// Parse `"250ms"`, `"30s"`, `"5m"`, `"1h"`, or a bare number of
/// seconds (`"60"`).
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(split) => s.split_at(split),
        None => (s, ""),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| DurationParseError::Invalid(s.to_string()))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" | "" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        _ => Err(DurationParseError::Invalid(s.to_string())),
    }
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
