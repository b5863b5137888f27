// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scenario engine: tick admission, trigger evaluation, and
//! sequential action execution.
//!
//! The structural action kinds live here because they recurse into the
//! engine: `evaluate_condition` (inline if/then/else over the condition
//! registry), `wait_for_state` (poll-with-timeout plus `on_failure`
//! actions), and `execute_scenario` (nested invocation through the
//! port).

use fm_adapters::Components;
use fm_core::{ClientRecord, Clock, Selector};
use nanoid::nanoid;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::{ActionError, ActionRegistry};
use crate::condition::builtin::state_matches;
use crate::condition::{evaluate_tree, Condition, ConditionRegistry};
use crate::context::{CommandPort, ErrorCounters, PortError, ScenarioContext};
use crate::loader::{load_scenario_dirs, LoadReport};
use crate::model::{ActionSpec, Scenario, TriggerType};
use crate::template::resolve_config;
use crate::tracker::{ExecutionTracker, ScreenOutcome};

/// Maximum `execute_scenario` nesting depth.
const MAX_NESTING_DEPTH: u32 = 8;

/// How long [`ScenarioEngine::drain_runs`] waits for cancelled runs to
/// settle their bookkeeping.
const CANCEL_SETTLE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_concurrent_scenarios: u32,
    pub builtin_scenarios_dir: Option<PathBuf>,
    pub scenarios_dir: Option<PathBuf>,
    /// Poll interval for `wait_for_state`.
    pub wait_poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scenarios: 4,
            builtin_scenarios_dir: None,
            scenarios_dir: None,
            wait_poll_interval: Duration::from_millis(250),
        }
    }
}

/// What one tick did, for logs and tests.
#[derive(Debug, Default, Clone)]
pub struct TickReport {
    pub dispatched: Vec<String>,
    pub skipped: Vec<(String, ScreenOutcome)>,
    /// The global cap stopped the tick before every scenario was seen.
    pub saturated: bool,
}

pub struct ScenarioEngine<C: Clock> {
    config: EngineConfig,
    scenarios: Mutex<Vec<Arc<Scenario>>>,
    conditions: ConditionRegistry,
    actions: ActionRegistry,
    tracker: ExecutionTracker<C>,
    counters: Arc<ErrorCounters>,
    clock: C,
    /// Fires when the orchestrator shuts down; every dispatched run
    /// races against it.
    cancel: CancellationToken,
}

impl<C: Clock> ScenarioEngine<C> {
    pub fn new(
        config: EngineConfig,
        conditions: ConditionRegistry,
        actions: ActionRegistry,
        counters: Arc<ErrorCounters>,
        clock: C,
    ) -> Self {
        Self {
            config,
            scenarios: Mutex::new(Vec::new()),
            conditions,
            actions,
            tracker: ExecutionTracker::new(clock.clone()),
            counters,
            clock,
            cancel: CancellationToken::new(),
        }
    }

    /// Let in-flight runs finish within `window`; cancel any that
    /// outlive it and wait briefly for their bookkeeping to settle.
    /// Returns true when everything drained without cancellation.
    pub async fn drain_runs(&self, window: Duration) -> bool {
        if tokio::time::timeout(window, self.tracker.wait_idle()).await.is_ok() {
            return true;
        }
        warn!(
            in_flight = self.tracker.global_in_flight(),
            "drain window elapsed; cancelling scenario runs"
        );
        self.cancel.cancel();
        let _ = tokio::time::timeout(CANCEL_SETTLE, self.tracker.wait_idle()).await;
        false
    }

    /// (Re)load scenario files from the configured directories.
    pub fn load_scenarios(&self) -> LoadReport {
        let mut dirs = Vec::new();
        if let Some(dir) = &self.config.builtin_scenarios_dir {
            dirs.push(dir.as_path());
        }
        if let Some(dir) = &self.config.scenarios_dir {
            dirs.push(dir.as_path());
        }
        let report = load_scenario_dirs(&dirs);
        *self.scenarios.lock() =
            report.scenarios.iter().cloned().map(Arc::new).collect();
        report
    }

    /// Install one scenario directly, keeping priority order.
    pub fn install_scenario(&self, scenario: Scenario) {
        let mut scenarios = self.scenarios.lock();
        scenarios.retain(|s| s.name != scenario.name);
        scenarios.push(Arc::new(scenario));
        scenarios.sort_by_key(|s| s.priority);
    }

    pub fn scenario_names(&self) -> Vec<String> {
        self.scenarios.lock().iter().map(|s| s.name.clone()).collect()
    }

    /// Flag a manual scenario for the next tick. Returns false for an
    /// unknown name.
    pub fn request_manual_run(&self, name: &str) -> bool {
        let known = self.scenarios.lock().iter().any(|s| s.name == name);
        if known {
            self.tracker.request_manual_run(name);
        }
        known
    }

    /// CMD_ACK: reset lifetime execution counters and the outbound
    /// action error counters.
    pub fn ack_reset(&self) {
        info!("resetting scenario execution counters and action error counters");
        self.tracker.ack_reset();
        self.counters.reset_all();
    }

    pub fn tracker(&self) -> &ExecutionTracker<C> {
        &self.tracker
    }

    pub fn counters(&self) -> &Arc<ErrorCounters> {
        &self.counters
    }

    fn build_context(
        &self,
        scenario_name: &str,
        clients: HashMap<String, ClientRecord>,
        components: Arc<Components>,
        port: Arc<dyn CommandPort>,
        depth: u32,
    ) -> ScenarioContext {
        ScenarioContext {
            scenario_name: scenario_name.to_string(),
            run_id: nanoid!(10),
            clients,
            components,
            trigger_data: Map::new(),
            port,
            counters: Arc::clone(&self.counters),
            now: self.clock.utc(),
            depth,
        }
    }

    /// One scheduler tick: evaluate every scenario's trigger against
    /// the given client-state snapshot in priority order, dispatching
    /// admitted runs onto background tasks.
    pub async fn tick(
        self: &Arc<Self>,
        clients: HashMap<String, ClientRecord>,
        components: Arc<Components>,
        port: Arc<dyn CommandPort>,
    ) -> TickReport {
        let scenarios = self.scenarios.lock().clone();
        let mut report = TickReport::default();

        for scenario in scenarios {
            match self.tracker.screen(&scenario, self.config.max_concurrent_scenarios) {
                ScreenOutcome::GlobalSaturated => {
                    report.saturated = true;
                    break;
                }
                ScreenOutcome::Runnable => {}
                outcome => {
                    report.skipped.push((scenario.name.clone(), outcome));
                    continue;
                }
            }

            let mut ctx = self.build_context(
                &scenario.name,
                clients.clone(),
                Arc::clone(&components),
                Arc::clone(&port),
                0,
            );
            let fired = match scenario.trigger.trigger_type {
                TriggerType::Automatic => match &scenario.trigger.conditions {
                    // no conditions: an automatic trigger never fires
                    None => false,
                    Some(conditions) => {
                        let outcome = evaluate_tree(conditions, &self.conditions, &ctx).await;
                        if outcome.matched {
                            ctx.trigger_data = outcome.bindings;
                        }
                        outcome.matched
                    }
                },
                TriggerType::Manual => self.tracker.take_manual_request(&scenario.name),
            };
            if !fired {
                continue;
            }

            self.tracker.begin(&scenario.name);
            report.dispatched.push(scenario.name.clone());
            let engine = Arc::clone(self);
            let scenario = Arc::clone(&scenario);
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = engine.run_instance(&scenario, ctx) => {}
                    _ = cancel.cancelled() => {
                        warn!(scenario = %scenario.name, "scenario run cancelled at shutdown");
                        engine.tracker.finish(&scenario.name, false);
                    }
                }
            });
        }
        report
    }

    /// Execute one scenario instance: actions strictly in order, abort
    /// on the first failure. Returns whether the run succeeded.
    pub async fn run_instance(&self, scenario: &Scenario, ctx: ScenarioContext) -> bool {
        info!(
            scenario = %scenario.name,
            run_id = %ctx.run_id,
            actions = scenario.actions.len(),
            "scenario started"
        );
        let mut success = true;
        for (index, spec) in scenario.actions.iter().enumerate() {
            match self.run_action(spec, &ctx).await {
                Ok(result) => {
                    debug!(
                        scenario = %scenario.name,
                        run_id = %ctx.run_id,
                        action = %spec.kind,
                        index,
                        result = %result,
                        "action completed"
                    );
                }
                Err(e) => {
                    warn!(
                        scenario = %scenario.name,
                        run_id = %ctx.run_id,
                        action = %spec.kind,
                        index,
                        error = %e,
                        "scenario aborted"
                    );
                    success = false;
                    break;
                }
            }
        }
        self.tracker.finish(&scenario.name, success);
        info!(scenario = %scenario.name, run_id = %ctx.run_id, success, "scenario finished");
        success
    }

    /// Nested invocation used by `execute_scenario` (through the port).
    ///
    /// Runs inline in the caller's task: a nested run reached from a
    /// dispatched scenario is cancelled together with its parent, while
    /// a direct call (the shutdown scenario) survives `drain_runs`.
    pub async fn run_named(
        self: &Arc<Self>,
        name: &str,
        clients: HashMap<String, ClientRecord>,
        components: Arc<Components>,
        port: Arc<dyn CommandPort>,
        depth: u32,
    ) -> Result<Value, PortError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(PortError::Other(format!(
                "scenario nesting exceeds {MAX_NESTING_DEPTH}"
            )));
        }
        let scenario = self
            .scenarios
            .lock()
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| PortError::UnknownScenario(name.to_string()))?;

        let ctx = self.build_context(name, clients, components, port, depth);
        self.tracker.begin(name);
        let success = self.run_instance(&scenario, ctx).await;
        Ok(json!({"executed": name, "success": success}))
    }

    /// Resolve templates, then dispatch: structural kinds inline,
    /// everything else through the registry.
    fn run_action<'a>(
        &'a self,
        spec: &'a ActionSpec,
        ctx: &'a ScenarioContext,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ActionError>> + Send + 'a>> {
        Box::pin(async move {
            let resolved = resolve_config(&spec.config, &ctx.template_root());
            match spec.kind.as_str() {
                "evaluate_condition" => self.run_evaluate_condition(&resolved, ctx).await,
                "execute_scenario" => self.run_execute_scenario(&resolved, ctx).await,
                "wait_for_state" => self.run_wait_for_state(&resolved, ctx).await,
                tag => {
                    let kind = self.actions.get(tag).ok_or_else(|| {
                        ActionError::new(tag, "unknown action kind")
                    })?;
                    kind.execute(&resolved, ctx).await
                }
            }
        })
    }

    async fn run_evaluate_condition(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<Value, ActionError> {
        #[derive(Deserialize)]
        struct EvaluateConditionConfig {
            conditions: Value,
            #[serde(default)]
            true_actions: Vec<ActionSpec>,
            #[serde(default)]
            false_actions: Vec<ActionSpec>,
        }
        let config: EvaluateConditionConfig = serde_json::from_value(config.clone())
            .map_err(|e| ActionError::new("evaluate_condition", format!("invalid config: {e}")))?;

        // a list of conditions is AND-reduced
        let condition = match &config.conditions {
            Value::Array(items) => {
                let children: Result<Vec<Condition>, String> =
                    items.iter().map(Condition::parse).collect();
                Condition::And(children.map_err(|e| ActionError::new("evaluate_condition", e))?)
            }
            single => Condition::parse(single)
                .map_err(|e| ActionError::new("evaluate_condition", e))?,
        };

        let outcome = evaluate_tree(&condition, &self.conditions, ctx).await;
        let branch = if outcome.matched { &config.true_actions } else { &config.false_actions };
        let child_ctx = ctx.with_bindings(outcome.bindings);
        for spec in branch {
            self.run_action(spec, &child_ctx).await?;
        }
        Ok(json!({"matched": outcome.matched, "ran": branch.len()}))
    }

    async fn run_execute_scenario(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<Value, ActionError> {
        let name = config
            .get("scenario_name")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::new("execute_scenario", "scenario_name is required"))?;
        ctx.port
            .run_scenario(name, ctx.depth + 1)
            .await
            .map_err(|e| ActionError::new("execute_scenario", e))
    }

    async fn run_wait_for_state(
        &self,
        config: &Value,
        ctx: &ScenarioContext,
    ) -> Result<Value, ActionError> {
        #[derive(Deserialize)]
        struct WaitForStateConfig {
            #[serde(default = "default_wait_timeout")]
            timeout: String,
            #[serde(default)]
            target_state: Option<Value>,
            #[serde(default)]
            target_states: Option<Vec<Value>>,
            #[serde(default)]
            on_failure: Vec<ActionSpec>,
        }
        fn default_wait_timeout() -> String {
            "30s".to_string()
        }

        let parsed: WaitForStateConfig = serde_json::from_value(config.clone())
            .map_err(|e| ActionError::new("wait_for_state", format!("invalid config: {e}")))?;
        let wanted = match (parsed.target_state, parsed.target_states) {
            (Some(state), None) => state,
            (None, Some(states)) => Value::Array(states),
            _ => {
                return Err(ActionError::new(
                    "wait_for_state",
                    "exactly one of target_state/target_states is required",
                ));
            }
        };
        let timeout = fm_core::parse_duration(&parsed.timeout)
            .map_err(|e| ActionError::new("wait_for_state", e))?;
        let selector = Selector::from_config(config)
            .map_err(|e| ActionError::new("wait_for_state", e))?;

        let started = tokio::time::Instant::now();
        let deadline = started + timeout;
        loop {
            let clients = ctx.port.clients();
            let names = selector.resolve(&clients);
            let all_reached = !names.is_empty()
                && names.iter().all(|name| {
                    clients
                        .get(name)
                        .map(|record| state_matches(record.fsm_state.as_ref(), &wanted))
                        .unwrap_or(false)
                });
            if all_reached {
                return Ok(json!({
                    "reached": true,
                    "waited_ms": started.elapsed().as_millis() as u64,
                }));
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                break;
            }
            let remaining = deadline - now;
            tokio::time::sleep(remaining.min(self.config.wait_poll_interval)).await;
        }

        warn!(
            scenario = %ctx.scenario_name,
            timeout = %parsed.timeout,
            "wait_for_state timed out"
        );
        if parsed.on_failure.is_empty() {
            return Err(ActionError::new(
                "wait_for_state",
                format!("targets did not reach the requested state within {}", parsed.timeout),
            ));
        }
        for spec in &parsed.on_failure {
            self.run_action(spec, ctx).await?;
        }
        Ok(json!({"reached": false, "timed_out": true, "ran_on_failure": parsed.on_failure.len()}))
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
