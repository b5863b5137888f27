// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker loops: analysis, send, state_update, and the RUN-scoped
//! local check.
//!
//! Loops run until the listener's cancellation token fires. A loop
//! that exits any other way (including a panic) is restarted once;
//! a second failure drives the listener to FAULT.

use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::behavior::Behavior;
use crate::runtime::{EventListener, ListenerHandle};

pub(crate) fn spawn_all<B: Behavior>(listener: EventListener<B>) {
    let core = listener.handle();
    {
        let listener = listener.clone();
        spawn_supervised("analysis", core.clone(), move || analysis_loop(listener.clone()));
    }
    {
        let core_for_loop = core.clone();
        spawn_supervised("send", core.clone(), move || send_loop(core_for_loop.clone()));
    }
    {
        let core_for_loop = core.clone();
        spawn_supervised("state_update", core, move || state_update_loop(core_for_loop.clone()));
    }
}

/// Run `make()` to completion, restarting once on unexpected exit.
fn spawn_supervised<F, Fut>(name: &'static str, core: ListenerHandle, make: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        for attempt in 0u32..2 {
            let outcome = tokio::spawn(make()).await;
            if core.cancel.is_cancelled() {
                return;
            }
            match outcome {
                Ok(()) => warn!(worker = name, attempt, "worker loop exited; restarting"),
                Err(e) => warn!(worker = name, attempt, error = %e, "worker loop panicked; restarting"),
            }
        }
        core.set_fault(&format!("worker {name} failed repeatedly"));
    });
}

async fn analysis_loop<B: Behavior>(listener: EventListener<B>) {
    let core = listener.handle();
    loop {
        tokio::select! {
            _ = core.cancel.cancelled() => return,
            event = core.queues.next_incoming() => listener.handle_event(event).await,
        }
    }
}

async fn send_loop(core: ListenerHandle) {
    loop {
        let event = tokio::select! {
            _ = core.cancel.cancelled() => return,
            event = core.queues.next_outgoing() => event,
        };
        match core.client.send(&event).await {
            Ok(()) => core.bump_metrics(|m| m.sent += 1),
            Err(e) => {
                warn!(
                    id = event.id,
                    destination = %event.destination,
                    error = %e,
                    "outbound event dropped"
                );
                core.bump_metrics(|m| m.send_failures += 1);
                // Unblock any waiter and stop tracking the reply.
                core.pending.abandon(&event.destination, event.id);
                core.queues.take_processing(&event.destination, event.id);
            }
        }
    }
}

async fn state_update_loop(core: ListenerHandle) {
    let mut interval = tokio::time::interval(core.config.state_update_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = core.cancel.cancelled() => return,
            _ = interval.tick() => {
                let depths = core.queues.depths();
                debug!(
                    listener = %core.name(),
                    state = %core.fsm_state(),
                    incoming = depths.incoming,
                    processing = depths.processing,
                    to_be_sent = depths.to_be_sent,
                    "state refresh"
                );
                core.queues.snapshot();
            }
        }
    }
}

/// Start the local check loop if not already running. Called before
/// `on_run` so the first tick can observe hook side effects no later
/// than one interval after RUN entry.
pub(crate) fn start_local_check<B: Behavior>(listener: EventListener<B>) {
    let core = listener.handle();
    let mut guard = core.local_check.lock();
    if guard.is_some() {
        return;
    }
    let token = core.cancel.child_token();
    *guard = Some(token.clone());
    drop(guard);
    tokio::spawn(local_check_loop(listener, token));
}

/// Cancel the local check loop if running.
pub(crate) fn stop_local_check(core: &crate::runtime::ListenerCore) {
    if let Some(token) = core.local_check.lock().take() {
        token.cancel();
    }
}

async fn local_check_loop<B: Behavior>(listener: EventListener<B>, token: CancellationToken) {
    let core = listener.handle();
    // First tick lands one interval after RUN entry, not immediately:
    // the on_run hook may still be finishing when this loop starts.
    let period = core.config.local_check_interval;
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = interval.tick() => {
                if let Err(e) = listener.behavior().check_local_data(&core).await {
                    core.set_fault(&e.0);
                    return;
                }
            }
        }
    }
}
