// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator behavior and the assembled daemon.

use async_trait::async_trait;
use fm_adapters::{
    bring_up, Component, ComponentError, Components, DatabaseComponent, HttpSmsGateway,
    SmtpMailer,
};
use fm_core::{Endpoint, Event, EventResult, SystemClock};
use fm_listener::{
    AnalyzeOutcome, Behavior, EventListener, HookError, ListenerConfig, ListenerError,
    ListenerHandle,
};
use fm_scenario::action::OutboundPolicy;
use fm_scenario::{
    ActionRegistry, CommandPort, ConditionRegistry, EngineConfig, ErrorCounters, ScenarioEngine,
};
use serde_json::{json, Map, Value};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{ComponentConfig, ConfigError, OrchestratorConfig};
use crate::port::OrchestratorPort;
use crate::registry::ClientRegistry;

/// Event type accepted by the orchestrator to flag a manual scenario.
pub const CMD_RUN_SCENARIO: &str = "CMD_RUN_SCENARIO";

/// Name of the optional graceful-shutdown scenario.
const SHUTDOWN_SCENARIO: &str = "shutdown";

/// How long in-flight scenario runs get to finish at shutdown before
/// they are cancelled.
const SHUTDOWN_DRAIN_WINDOW: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// The supervising listener behavior: polls clients, merges replies,
/// and runs the scenario tick.
pub struct OrchestratorBehavior {
    config: OrchestratorConfig,
    registry: Arc<ClientRegistry>,
    engine: Arc<ScenarioEngine<SystemClock>>,
    components: Arc<Components>,
    /// Components driven through initialize/connect/health_check on
    /// `on_initialize`.
    lifecycle: Vec<Arc<dyn Component>>,
    port: OnceLock<Arc<OrchestratorPort>>,
}

impl OrchestratorBehavior {
    fn port(&self) -> Option<Arc<OrchestratorPort>> {
        self.port.get().cloned()
    }

    /// Poll every registered client with CMD_GET_STATE and merge the
    /// replies. Unreachable clients are marked UNKNOWN with the error.
    async fn poll_clients(&self, listener: &ListenerHandle) {
        let timeout = self.config.get_state_timeout;
        let mut polls = tokio::task::JoinSet::new();
        for name in self.registry.names() {
            let Some(endpoint) = self.registry.endpoint(&name) else {
                continue;
            };
            let listener = Arc::clone(listener);
            polls.spawn(async move {
                let reply = listener
                    .request(&endpoint, "CMD_GET_STATE", Map::new(), timeout)
                    .await;
                (name, reply)
            });
        }
        while let Some(joined) = polls.join_next().await {
            let Ok((name, outcome)) = joined else {
                continue;
            };
            match outcome {
                Ok(reply) => {
                    let Some(result) = reply.result else {
                        continue;
                    };
                    if !result.success {
                        self.registry.mark_unreachable(
                            &name,
                            result.message.as_deref().unwrap_or("negative state reply"),
                        );
                        continue;
                    }
                    if let Some(Value::Object(data)) = result.data {
                        self.registry.apply_state_reply(&name, &data);
                    }
                }
                Err(e) => {
                    self.registry.mark_unreachable(&name, &e.to_string());
                }
            }
        }
    }
}

#[async_trait]
impl Behavior for OrchestratorBehavior {
    async fn on_initialize(&self, _listener: &ListenerHandle) -> Result<(), HookError> {
        let report = self.engine.load_scenarios();
        for (path, error) in &report.skipped {
            warn!(path = %path.display(), error = %error, "scenario file skipped");
        }

        // Component failures mark the component unhealthy; scenarios
        // that depend on it are expected to check. Boot continues.
        for component in &self.lifecycle {
            if let Err(e) = bring_up(&self.components, component.as_ref()).await {
                warn!(component = component.name(), error = %e, "component is unhealthy");
            }
        }
        Ok(())
    }

    async fn on_ack(&self, _listener: &ListenerHandle) -> Result<(), HookError> {
        self.engine.ack_reset();
        Ok(())
    }

    /// The scenario tick: poll state, then evaluate triggers against
    /// the merged snapshot.
    async fn check_local_data(&self, listener: &ListenerHandle) -> Result<(), HookError> {
        self.poll_clients(listener).await;
        let Some(port) = self.port() else {
            return Ok(());
        };
        let report = self
            .engine
            .tick(
                self.registry.snapshot(),
                Arc::clone(&self.components),
                port as Arc<dyn CommandPort>,
            )
            .await;
        if !report.dispatched.is_empty() {
            info!(dispatched = ?report.dispatched, "tick dispatched scenarios");
        }
        Ok(())
    }

    async fn analyze_event(
        &self,
        listener: &ListenerHandle,
        event: &Event,
    ) -> Result<AnalyzeOutcome, HookError> {
        if event.event_type == CMD_RUN_SCENARIO {
            let name = event
                .data
                .get("scenario_name")
                .or_else(|| event.data.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if self.engine.request_manual_run(name) {
                info!(scenario = name, "manual run requested");
                listener.reply_to(event, EventResult::ok());
            } else {
                listener.reply_to(
                    event,
                    EventResult::failure(format!("unknown scenario {name:?}")),
                );
            }
            return Ok(AnalyzeOutcome::Handled);
        }
        listener.reply_to(
            event,
            EventResult::failure(format!("unsupported event type {}", event.event_type)),
        );
        Ok(AnalyzeOutcome::Handled)
    }

    fn state_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("clients".into(), self.registry.as_value());
        let scenarios: Map<String, Value> = self
            .engine
            .scenario_names()
            .into_iter()
            .map(|name| {
                let state = self.engine.tracker().state(&name);
                (
                    name,
                    json!({
                        "execution_count": state.execution_count,
                        "in_flight": state.in_flight,
                    }),
                )
            })
            .collect();
        fields.insert("scenarios".into(), Value::Object(scenarios));
        fields
    }
}

/// The assembled orchestrator daemon.
pub struct Orchestrator {
    listener: EventListener<OrchestratorBehavior>,
    registry: Arc<ClientRegistry>,
    engine: Arc<ScenarioEngine<SystemClock>>,
    components: Arc<Components>,
    port: Arc<OrchestratorPort>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Result<Self, BootError> {
        let registry = Arc::new(ClientRegistry::from_config(&config.clients));

        let mut components = Components::new();
        let mut lifecycle: Vec<Arc<dyn Component>> = Vec::new();
        for (name, component) in &config.components {
            match component {
                ComponentConfig::Postgres(db_config) => {
                    let database = Arc::new(DatabaseComponent::new(name.clone(), db_config.clone()));
                    components.insert_database(name.clone(), database.clone());
                    lifecycle.push(database);
                }
            }
        }
        let mut policy = OutboundPolicy::default();
        if let Some(smtp) = &config.smtp {
            policy.email_max_error_attempts = smtp.max_error_attempts;
            let mailer = Arc::new(SmtpMailer::new(smtp.clone())?);
            components.set_mailer(mailer.clone());
            lifecycle.push(mailer);
        }
        if let Some(sms) = &config.sms {
            policy.sms_max_error_attempts = sms.max_error_attempts;
            let gateway = Arc::new(HttpSmsGateway::new(sms.clone()));
            components.set_sms_gateway(gateway.clone());
            lifecycle.push(gateway);
        }
        let components = Arc::new(components);

        let engine = Arc::new(ScenarioEngine::new(
            EngineConfig {
                max_concurrent_scenarios: config.max_concurrent_scenarios,
                builtin_scenarios_dir: config.builtin_scenarios_directory.clone(),
                scenarios_dir: config.scenarios_directory.clone(),
                ..EngineConfig::default()
            },
            ConditionRegistry::with_builtins(),
            ActionRegistry::with_builtins(policy),
            Arc::new(ErrorCounters::new()),
            SystemClock,
        ));

        let mut listener_config =
            ListenerConfig::new(config.name.clone(), config.address.clone(), config.port);
        listener_config.local_check_interval = Duration::from_secs_f64(config.tick_interval);
        listener_config.state_update_interval =
            Duration::from_secs_f64(config.state_update_interval);
        listener_config.snapshot_path = config.snapshot_path.clone();

        let behavior = OrchestratorBehavior {
            config,
            registry: Arc::clone(&registry),
            engine: Arc::clone(&engine),
            components: Arc::clone(&components),
            lifecycle,
            port: OnceLock::new(),
        };
        let listener = EventListener::new(listener_config, behavior);

        let port = OrchestratorPort::new(
            listener.handle(),
            Arc::clone(&registry),
            Arc::clone(&engine),
            Arc::clone(&components),
            fm_core::event::DEFAULT_MAX_PROCESSING_TIME,
        );
        let _ = listener.behavior().port.set(Arc::clone(&port));

        Ok(Self { listener, registry, engine, components, port })
    }

    /// Bind the ingress and start the worker loops.
    pub async fn start(&self) -> Result<(), BootError> {
        self.listener.start().await?;
        Ok(())
    }

    /// Own coordinates (reflects the bound port).
    pub fn endpoint(&self) -> Endpoint {
        self.listener.handle().endpoint()
    }

    pub fn handle(&self) -> ListenerHandle {
        self.listener.handle()
    }

    pub fn listener(&self) -> &EventListener<OrchestratorBehavior> {
        &self.listener
    }

    pub fn engine(&self) -> &Arc<ScenarioEngine<SystemClock>> {
        &self.engine
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn components(&self) -> &Arc<Components> {
        &self.components
    }

    /// Inject the lifecycle commands that drive this orchestrator from
    /// STOPPED into RUN, as an operator console would.
    pub async fn bootstrap(&self) {
        let core = self.listener.handle();
        let own = core.endpoint();
        let operator = Endpoint::new("bootstrap", own.address.clone(), own.port);
        for (id, command) in [(1u64, "CMD_INITIALIZED"), (2, "CMD_RUN")] {
            let event = Event::new(id, &operator, &own, command, Map::new(), 5.0);
            self.listener.handle_event(event).await;
        }
    }

    /// Graceful shutdown: run the `shutdown` scenario if one is
    /// loaded, drain in-flight scenario runs within a bounded window
    /// (cancelling stragglers), then stop the listener loops.
    pub async fn shutdown(&self) {
        if self.engine.scenario_names().iter().any(|name| name == SHUTDOWN_SCENARIO) {
            info!("running shutdown scenario");
            let outcome = self
                .engine
                .run_named(
                    SHUTDOWN_SCENARIO,
                    self.registry.snapshot(),
                    Arc::clone(&self.components),
                    Arc::clone(&self.port) as Arc<dyn CommandPort>,
                    0,
                )
                .await;
            if let Err(e) = outcome {
                warn!(error = %e, "shutdown scenario failed");
            }
        }
        if !self.engine.drain_runs(SHUTDOWN_DRAIN_WINDOW).await {
            warn!("in-flight scenario runs were cancelled at shutdown");
        }
        self.listener.shutdown();
    }
}

#[cfg(test)]
#[path = "behavior_tests.rs"]
mod tests;
