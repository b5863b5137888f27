// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The listener runtime: shared core, command handling, and startup.
//!
//! [`ListenerCore`] owns everything the worker loops share: the state
//! machine, the queues, the reply table, and the outbound client.
//! [`EventListener`] pairs a core with its [`Behavior`] and drives the
//! lifecycle command handlers.

use fm_core::{Command, Endpoint, Event, EventResult, FsmState};
use fm_transport::{DedupWindow, EventClient, EventSink, PendingReplies, TransportError};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use smol_str::SmolStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::behavior::{AnalyzeOutcome, Behavior};
use crate::config::ListenerConfig;
use crate::queues::QueueStore;
use crate::state::{ListenerState, StateReport};
use crate::workers;
use crate::ListenerError;

/// Shared listener internals, one `Arc` handed to every loop and hook.
pub struct ListenerCore {
    pub(crate) config: ListenerConfig,
    endpoint: Mutex<Endpoint>,
    state: Mutex<ListenerState>,
    pub queues: QueueStore,
    pub(crate) pending: PendingReplies,
    pub(crate) dedup: Arc<DedupWindow>,
    next_id: AtomicU64,
    pub(crate) client: EventClient,
    pub(crate) cancel: CancellationToken,
    pub(crate) local_check: Mutex<Option<CancellationToken>>,
    command_lock: tokio::sync::Mutex<()>,
    started_at: Instant,
}

pub type ListenerHandle = Arc<ListenerCore>;

impl ListenerCore {
    fn new(config: ListenerConfig) -> Self {
        let endpoint = config.endpoint();
        let queues = QueueStore::new(config.snapshot_path.clone());
        let client = EventClient::new(config.send_options.clone());
        Self {
            config,
            endpoint: Mutex::new(endpoint),
            state: Mutex::new(ListenerState::default()),
            queues,
            pending: PendingReplies::new(),
            dedup: Arc::new(DedupWindow::new()),
            next_id: AtomicU64::new(0),
            client,
            cancel: CancellationToken::new(),
            local_check: Mutex::new(None),
            command_lock: tokio::sync::Mutex::new(()),
            started_at: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Own coordinates; the port reflects the actual bind when the
    /// config asked for an ephemeral one.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.lock().clone()
    }

    pub(crate) fn set_bound_port(&self, port: u16) {
        self.endpoint.lock().port = port;
    }

    pub fn fsm_state(&self) -> FsmState {
        self.state.lock().fsm
    }

    /// Move to a new FSM state and snapshot the queues.
    pub(crate) fn transition_to(&self, target: FsmState) {
        {
            let mut state = self.state.lock();
            debug!(from = %state.fsm, to = %target, "fsm transition");
            state.fsm = target;
        }
        self.queues.snapshot();
    }

    /// Drive ON_ERROR → FAULT, recording the failure. Tears down the
    /// local check loop.
    pub fn set_fault(&self, message: &str) {
        {
            let mut state = self.state.lock();
            state.fsm = FsmState::Fault;
            state.error = true;
            state.error_message = Some(message.to_string());
        }
        error!(listener = %self.config.name, message, "listener faulted");
        workers::stop_local_check(self);
        self.queues.snapshot();
    }

    pub(crate) fn clear_error(&self) {
        let mut state = self.state.lock();
        state.error = false;
        state.error_message = None;
    }

    pub(crate) fn bump_metrics(&self, f: impl FnOnce(&mut crate::state::Metrics)) {
        f(&mut self.state.lock().metrics);
    }

    fn next_event_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Emit an event and register for its reply. The event lands in
    /// `to_be_sent` and `processing`; the caller awaits the receiver.
    pub fn emit(
        &self,
        destination: &Endpoint,
        event_type: impl Into<SmolStr>,
        data: Map<String, Value>,
        maximum_processing_time: f64,
    ) -> (u64, oneshot::Receiver<Event>) {
        let id = self.next_event_id();
        let event = Event::new(
            id,
            &self.endpoint(),
            destination,
            event_type,
            data,
            maximum_processing_time,
        );
        let rx = self.pending.register(&destination.name, id);
        self.queues.push_processing(event.clone());
        self.queues.push_outgoing(event);
        (id, rx)
    }

    /// Emit an event without expecting a reply.
    pub fn notify_event(
        &self,
        destination: &Endpoint,
        event_type: impl Into<SmolStr>,
        data: Map<String, Value>,
        maximum_processing_time: f64,
    ) -> u64 {
        let id = self.next_event_id();
        let event = Event::new(
            id,
            &self.endpoint(),
            destination,
            event_type,
            data,
            maximum_processing_time,
        );
        self.queues.push_outgoing(event);
        id
    }

    /// Emit and await the reply, bounded by `maximum_processing_time`.
    pub async fn request(
        &self,
        destination: &Endpoint,
        event_type: impl Into<SmolStr>,
        data: Map<String, Value>,
        maximum_processing_time: f64,
    ) -> Result<Event, TransportError> {
        let (id, rx) = self.emit(destination, event_type, data, maximum_processing_time);
        let reply = self
            .pending
            .await_reply(&destination.name, id, rx, maximum_processing_time)
            .await;
        if reply.is_err() {
            // The reply will never be correlated; drop the tracker.
            self.queues.take_processing(&destination.name, id);
        }
        reply
    }

    /// Queue the reply to an inbound event.
    pub fn reply_to(&self, event: &Event, result: EventResult) {
        self.queues.push_outgoing(event.reply(result));
    }

    /// One consistent snapshot of the exported state.
    pub fn state_report(&self, extra: Map<String, Value>) -> StateReport {
        let state = self.state.lock();
        let uptime_ms = self.started_at.elapsed().as_millis() as u64;
        StateReport::new(&state, uptime_ms, self.queues.depths(), extra)
    }

    fn health_value(&self) -> Value {
        json!({
            "uptime_ms": self.started_at.elapsed().as_millis() as u64,
            "queues": self.queues.depths(),
        })
    }
}

impl EventSink for ListenerCore {
    fn accept(&self, event: Event) {
        self.bump_metrics(|m| m.received += 1);
        self.queues.push_incoming(event);
    }
}

/// A running listener: shared core plus the domain behavior.
pub struct EventListener<B: Behavior> {
    core: ListenerHandle,
    behavior: Arc<B>,
}

impl<B: Behavior> Clone for EventListener<B> {
    fn clone(&self) -> Self {
        Self { core: Arc::clone(&self.core), behavior: Arc::clone(&self.behavior) }
    }
}

impl<B: Behavior> EventListener<B> {
    pub fn new(config: ListenerConfig, behavior: B) -> Self {
        Self { core: Arc::new(ListenerCore::new(config)), behavior: Arc::new(behavior) }
    }

    pub fn handle(&self) -> ListenerHandle {
        Arc::clone(&self.core)
    }

    pub fn behavior(&self) -> &Arc<B> {
        &self.behavior
    }

    /// Bind the ingress and start the worker loops. Returns once the
    /// listener is accepting events.
    pub async fn start(&self) -> Result<(), ListenerError> {
        let socket =
            fm_transport::bind(&self.core.config.address, self.core.config.port).await?;
        if let Ok(addr) = socket.local_addr() {
            self.core.set_bound_port(addr.port());
        }
        let router = fm_transport::event_router(
            Arc::clone(&self.core) as Arc<dyn EventSink>,
            Arc::clone(&self.core.dedup),
        );
        tokio::spawn(fm_transport::serve(socket, router, self.core.cancel.child_token()));
        workers::spawn_all(self.clone());
        info!(listener = %self.core.config.name, endpoint = %self.core.endpoint().url(), "listener started");
        Ok(())
    }

    /// Stop all loops and persist a final queue snapshot.
    pub fn shutdown(&self) {
        info!(listener = %self.core.config.name, "listener shutting down");
        self.core.cancel.cancel();
        self.core.queues.snapshot();
    }

    /// Classify and process one inbound event. This is the body of the
    /// analysis loop, exposed for direct use in tests.
    pub async fn handle_event(&self, event: Event) {
        if event.is_reply() {
            let completed = self.core.pending.complete(event.clone());
            let tracked = self.core.queues.take_processing(&event.source, event.id);
            if !completed && tracked.is_none() {
                debug!(id = event.id, source = %event.source, "unmatched reply dropped");
            }
            self.core.bump_metrics(|m| m.processed += 1);
            return;
        }

        if let Some(command) = event.command() {
            self.handle_command(command, event).await;
            return;
        }

        match self.core.fsm_state() {
            FsmState::Run => match self.behavior.analyze_event(&self.core, &event).await {
                Ok(AnalyzeOutcome::Handled) => {
                    self.core.bump_metrics(|m| m.processed += 1);
                }
                Ok(AnalyzeOutcome::Defer) => self.core.queues.push_processing(event),
                Err(e) => {
                    self.core
                        .reply_to(&event, EventResult::failure(format!("analyze failed: {e}")));
                    self.core.set_fault(&e.0);
                }
            },
            FsmState::Pause => self.core.queues.buffer_paused(event),
            FsmState::Stopped => {
                self.core.reply_to(&event, EventResult::failure("service stopped"));
            }
            FsmState::Fault | FsmState::OnError => {
                self.core.reply_to(&event, EventResult::failure("system in fault state"));
            }
            _ => {
                self.core.reply_to(&event, EventResult::failure("system in transition"));
            }
        }
    }

    /// Lifecycle command handling per the transition table. Serialized
    /// by the command lock so observers only ever see planned states.
    async fn handle_command(&self, command: Command, event: Event) {
        if command.is_query() {
            let result = match command {
                Command::GetState => {
                    let report = self.core.state_report(self.behavior.state_fields());
                    EventResult::ok_with(Value::Object(report.into_data()))
                }
                _ => EventResult::ok_with(self.core.health_value()),
            };
            self.core.reply_to(&event, result);
            self.core.bump_metrics(|m| m.processed += 1);
            return;
        }

        let _guard = self.core.command_lock.lock().await;
        let from = self.core.fsm_state();
        let Some(plan) = command.plan(from) else {
            warn!(
                listener = %self.core.config.name,
                command = %command,
                state = %from,
                "invalid transition refused"
            );
            self.core.reply_to(&event, EventResult::failure("Invalid transition"));
            return;
        };

        for via in plan.via {
            self.core.transition_to(*via);
        }

        // local_check runs exactly while in RUN: stopped on the way out,
        // started before on_run on the way in.
        if from == FsmState::Run {
            workers::stop_local_check(&self.core);
        }
        if command == Command::Run {
            workers::start_local_check(self.clone());
        }

        let hook_result = match command {
            Command::Initialized => self.behavior.on_initialize(&self.core).await,
            Command::Run => self.behavior.on_run(&self.core).await,
            Command::Pause => self.behavior.on_pause(&self.core).await,
            Command::Stopped => self.behavior.on_stop(&self.core).await,
            Command::Ack => self.behavior.on_ack(&self.core).await,
            Command::GetState | Command::HealthCheck => Ok(()),
        };

        match hook_result {
            Ok(()) => {
                if command == Command::Ack {
                    self.core.clear_error();
                }
                self.core.transition_to(plan.target);
                if from == FsmState::Pause && plan.target == FsmState::Run {
                    self.core.queues.reinject_paused();
                }
                self.core.bump_metrics(|m| m.processed += 1);
                self.core.reply_to(
                    &event,
                    EventResult::ok_with(json!({"fsm_state": plan.target})),
                );
            }
            Err(e) => {
                let hook = hook_name(command);
                error!(
                    listener = %self.core.config.name,
                    hook,
                    error = %e,
                    "lifecycle hook failed"
                );
                if command == Command::Run {
                    workers::stop_local_check(&self.core);
                }
                self.core.set_fault(&e.0);
                self.core
                    .reply_to(&event, EventResult::failure(format!("hook {hook} failed: {e}")));
            }
        }
    }
}

fn hook_name(command: Command) -> &'static str {
    match command {
        Command::Initialized => "on_initialize",
        Command::Run => "on_run",
        Command::Pause => "on_pause",
        Command::Stopped => "on_stop",
        Command::Ack => "on_ack",
        Command::GetState | Command::HealthCheck => "query",
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
