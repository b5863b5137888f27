// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::server::{bind, event_router, serve, EventSink};
use crate::DedupWindow;
use fm_core::{Endpoint, Event};
use parking_lot::Mutex;
use serde_json::Map;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<Event>>,
}

impl EventSink for CollectingSink {
    fn accept(&self, event: Event) {
        self.events.lock().push(event);
    }
}

fn event_to(address: &str, port: u16, id: u64) -> Event {
    let src = Endpoint::new("orchestrator", "127.0.0.1", 8000);
    let dst = Endpoint::new("io", address, port);
    Event::new(id, &src, &dst, "CMD_RUN", Map::new(), 5.0)
}

#[tokio::test]
async fn delivers_through_real_ingress() {
    let sink = Arc::new(CollectingSink::default());
    let router = event_router(sink.clone(), Arc::new(DedupWindow::new()));
    let listener = bind("127.0.0.1", 0).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    tokio::spawn(serve(listener, router, cancel.clone()));

    let event = event_to(&addr.ip().to_string(), addr.port(), 21);
    EventClient::default().send(&event).await.unwrap();

    let events = sink.events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, 21);
    cancel.cancel();
}

#[tokio::test]
async fn dead_destination_exhausts_retry_budget() {
    // bind then drop to get a port with nothing listening
    let listener = bind("127.0.0.1", 0).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = EventClient::new(SendOptions {
        attempts: 2,
        base_backoff: std::time::Duration::from_millis(10),
    });
    let err = client.send(&event_to("127.0.0.1", port, 1)).await.unwrap_err();
    match err {
        TransportError::Exhausted { attempts, destination, .. } => {
            assert_eq!(attempts, 2);
            assert_eq!(destination, "io");
        }
        other => panic!("unexpected error: {other}"),
    }
}
