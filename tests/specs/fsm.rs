// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FSM contract over the wire: refusal replies, ingress idempotency,
//! and state queries.

use crate::support::{spawn_client, spawn_inbox};
use fm_core::{Event, FsmState};
use fm_transport::EventClient;
use serde_json::{json, Map};
use std::time::Duration;

#[tokio::test]
async fn invalid_transition_is_refused_over_the_wire() {
    let (io, io_endpoint) = spawn_client("io").await;
    let (inbox, operator, _cancel) = spawn_inbox("operator").await;

    let event = Event::new(1, &operator, &io_endpoint, "CMD_RUN", Map::new(), 5.0);
    EventClient::default().send(&event).await.expect("delivery");

    let reply = inbox.wait_for_reply(1).await;
    let result = reply.result.expect("reply has a result");
    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some("Invalid transition"));
    assert_eq!(io.handle().fsm_state(), FsmState::Stopped);
    io.shutdown();
}

#[tokio::test]
async fn duplicate_delivery_produces_single_side_effect() {
    let (io, io_endpoint) = spawn_client("io").await;
    let (inbox, operator, _cancel) = spawn_inbox("operator").await;

    let event = Event::new(7, &operator, &io_endpoint, "CMD_INITIALIZED", Map::new(), 5.0);
    let client = EventClient::default();
    client.send(&event).await.expect("first delivery");
    client.send(&event).await.expect("second delivery acked");

    let reply = inbox.wait_for_reply(7).await;
    assert!(reply.result.expect("result").success);
    assert_eq!(io.handle().fsm_state(), FsmState::Initialized);

    // grace period: no second reply shows up for the duplicate
    tokio::time::sleep(Duration::from_millis(300)).await;
    let replies = inbox
        .received()
        .into_iter()
        .filter(|e| e.id == 7 && e.is_reply())
        .count();
    assert_eq!(replies, 1);
    io.shutdown();
}

#[tokio::test]
async fn get_state_reports_the_state_blob_over_the_wire() {
    let (io, io_endpoint) = spawn_client("io").await;
    let (inbox, operator, _cancel) = spawn_inbox("operator").await;

    let event = Event::new(3, &operator, &io_endpoint, "CMD_GET_STATE", Map::new(), 5.0);
    EventClient::default().send(&event).await.expect("delivery");

    let reply = inbox.wait_for_reply(3).await;
    let result = reply.result.expect("result");
    assert!(result.success);
    let data = result.data.expect("state blob");
    assert_eq!(data["fsm_state"], json!(0));
    assert_eq!(data["error"], json!(false));
    assert!(data["health_check"]["queues"].is_object());
    io.shutdown();
}

#[tokio::test]
async fn full_lifecycle_round_trip_over_the_wire() {
    let (io, io_endpoint) = spawn_client("io").await;
    let (inbox, operator, _cancel) = spawn_inbox("operator").await;
    let client = EventClient::default();

    let commands = [
        (1u64, "CMD_INITIALIZED", FsmState::Initialized),
        (2, "CMD_RUN", FsmState::Run),
        (3, "CMD_PAUSE", FsmState::Pause),
        (4, "CMD_STOPPED", FsmState::Stopped),
    ];
    for (id, tag, expected) in commands {
        let event = Event::new(id, &operator, &io_endpoint, tag, Map::new(), 5.0);
        client.send(&event).await.expect("delivery");
        let reply = inbox.wait_for_reply(id).await;
        assert!(reply.result.expect("result").success, "{tag} refused");
        assert_eq!(io.handle().fsm_state(), expected, "after {tag}");
    }
    io.shutdown();
}
