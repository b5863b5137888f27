// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures: loopback listeners and a reply-collecting ingress.

use fm_core::{Endpoint, Event, FsmState};
use fm_listener::{EventListener, ListenerConfig, NullBehavior};
use fm_transport::{bind, event_router, serve, DedupWindow, EventSink};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Start a plain component listener on an ephemeral loopback port.
pub async fn spawn_client(name: &str) -> (EventListener<NullBehavior>, Endpoint) {
    let listener = EventListener::new(ListenerConfig::new(name, "127.0.0.1", 0), NullBehavior);
    listener.start().await.expect("client listener binds");
    let endpoint = listener.handle().endpoint();
    (listener, endpoint)
}

/// Ingress that records everything posted to it; used by tests acting
/// as an event sender awaiting replies.
#[derive(Default)]
pub struct Inbox {
    events: Mutex<Vec<Event>>,
}

impl Inbox {
    pub fn received(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Wait until a reply with the given id arrives.
    pub async fn wait_for_reply(&self, id: u64) -> Event {
        for _ in 0..400 {
            if let Some(event) = self
                .events
                .lock()
                .iter()
                .find(|e| e.id == id && e.is_reply())
                .cloned()
            {
                return event;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no reply for event {id}");
    }
}

impl EventSink for Inbox {
    fn accept(&self, event: Event) {
        self.events.lock().push(event);
    }
}

/// Spin an [`Inbox`] ingress; returns its endpoint for use as an event
/// source.
pub async fn spawn_inbox(name: &str) -> (Arc<Inbox>, Endpoint, CancellationToken) {
    let inbox = Arc::new(Inbox::default());
    let router = event_router(inbox.clone() as Arc<dyn EventSink>, Arc::new(DedupWindow::new()));
    let socket = bind("127.0.0.1", 0).await.expect("inbox binds");
    let addr = socket.local_addr().expect("inbox has a local addr");
    let cancel = CancellationToken::new();
    tokio::spawn(serve(socket, router, cancel.clone()));
    (inbox, Endpoint::new(name, "127.0.0.1", addr.port()), cancel)
}

/// Poll until `listener` reports `state` or the deadline passes.
pub async fn wait_for_state(
    listener: &EventListener<NullBehavior>,
    state: FsmState,
    deadline: Duration,
) -> bool {
    let started = tokio::time::Instant::now();
    while started.elapsed() < deadline {
        if listener.handle().fsm_state() == state {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    listener.handle().fsm_state() == state
}
