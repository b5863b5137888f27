// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution governance: cooldowns, concurrency caps, lifetime limits,
//! and manual-run flags.
//!
//! The tracker owns every scenario's runtime counters. `screen` applies
//! the tick admission checks in order; `begin`/`finish` bracket one
//! execution. Counters are not persisted across restarts.

use fm_core::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::model::Scenario;

/// Why a scenario was (not) admitted this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOutcome {
    Runnable,
    /// Lifetime cap reached; cleared by CMD_ACK.
    Blocked,
    Cooldown,
    /// Per-scenario concurrency cap reached.
    Busy,
    /// Global concurrency cap reached; the tick stops here.
    GlobalSaturated,
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioRunState {
    pub last_execution_at: Option<Instant>,
    pub execution_count: u64,
    pub in_flight: u32,
    pub manual_requested: bool,
}

#[derive(Default)]
struct TrackerInner {
    scenarios: HashMap<String, ScenarioRunState>,
    global_in_flight: u32,
}

pub struct ExecutionTracker<C: Clock> {
    clock: C,
    inner: Mutex<TrackerInner>,
    /// Signaled whenever the last in-flight run finishes.
    idle: tokio::sync::Notify,
}

impl<C: Clock> ExecutionTracker<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, inner: Mutex::new(TrackerInner::default()), idle: tokio::sync::Notify::new() }
    }

    /// Admission checks in tick order: blocked, cooldown, global cap,
    /// per-scenario cap.
    pub fn screen(&self, scenario: &Scenario, max_concurrent_scenarios: u32) -> ScreenOutcome {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        let state = inner.scenarios.entry(scenario.name.clone()).or_default();

        if let Some(max) = scenario.max_executions {
            if state.execution_count >= max {
                return ScreenOutcome::Blocked;
            }
        }
        if scenario.cooldown > 0.0 {
            if let Some(last) = state.last_execution_at {
                if now.duration_since(last) < Duration::from_secs_f64(scenario.cooldown) {
                    return ScreenOutcome::Cooldown;
                }
            }
        }
        if inner.global_in_flight >= max_concurrent_scenarios {
            return ScreenOutcome::GlobalSaturated;
        }
        let state = inner.scenarios.entry(scenario.name.clone()).or_default();
        if state.in_flight >= scenario.max_concurrent_executions {
            return ScreenOutcome::Busy;
        }
        ScreenOutcome::Runnable
    }

    /// Mark one execution in flight.
    pub fn begin(&self, name: &str) {
        let mut inner = self.inner.lock();
        inner.global_in_flight += 1;
        inner.scenarios.entry(name.to_string()).or_default().in_flight += 1;
    }

    /// Record the end of one execution. The cooldown stamp applies to
    /// failures too; the lifetime counter only moves on success.
    pub fn finish(&self, name: &str, success: bool) {
        let drained = {
            let mut inner = self.inner.lock();
            inner.global_in_flight = inner.global_in_flight.saturating_sub(1);
            let now = self.clock.now();
            let state = inner.scenarios.entry(name.to_string()).or_default();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.last_execution_at = Some(now);
            if success {
                state.execution_count += 1;
            }
            inner.global_in_flight == 0
        };
        if drained {
            self.idle.notify_waiters();
        }
    }

    /// Resolve once no run is in flight. Returns immediately when
    /// already idle.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.inner.lock().global_in_flight == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn request_manual_run(&self, name: &str) {
        let mut inner = self.inner.lock();
        inner.scenarios.entry(name.to_string()).or_default().manual_requested = true;
    }

    /// Consume a pending manual-run request.
    pub fn take_manual_request(&self, name: &str) -> bool {
        let mut inner = self.inner.lock();
        let state = inner.scenarios.entry(name.to_string()).or_default();
        std::mem::take(&mut state.manual_requested)
    }

    /// CMD_ACK semantics: zero every lifetime counter, unblocking
    /// capped scenarios.
    pub fn ack_reset(&self) {
        let mut inner = self.inner.lock();
        for state in inner.scenarios.values_mut() {
            state.execution_count = 0;
        }
    }

    pub fn state(&self, name: &str) -> ScenarioRunState {
        self.inner.lock().scenarios.get(name).cloned().unwrap_or_default()
    }

    pub fn global_in_flight(&self) -> u32 {
        self.inner.lock().global_in_flight
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
