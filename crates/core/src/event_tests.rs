// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn endpoints() -> (Endpoint, Endpoint) {
    (
        Endpoint::new("orchestrator", "127.0.0.1", 8000),
        Endpoint::new("io", "127.0.0.1", 8001),
    )
}

#[test]
fn new_event_carries_source_and_destination_coordinates() {
    let (src, dst) = endpoints();
    let event = Event::new(7, &src, &dst, "CMD_RUN", Map::new(), 5.0);
    assert_eq!(event.id, 7);
    assert_eq!(event.source, "orchestrator");
    assert_eq!(event.source_port, 8000);
    assert_eq!(event.destination, "io");
    assert_eq!(event.destination_address, "127.0.0.1");
    assert_eq!(event.destination_port, 8001);
    assert!(event.result.is_none());
}

#[test]
fn reply_swaps_endpoints_and_keeps_id() {
    let (src, dst) = endpoints();
    let event = Event::new(42, &src, &dst, "CMD_GET_STATE", Map::new(), 5.0);
    let reply = event.reply(EventResult::ok());
    assert_eq!(reply.id, 42);
    assert_eq!(reply.source, "io");
    assert_eq!(reply.destination, "orchestrator");
    assert_eq!(reply.destination_address, "127.0.0.1");
    assert_eq!(reply.destination_port, 8000);
    assert_eq!(reply.event_type, "CMD_GET_STATE");
    assert!(reply.is_reply());
}

#[test]
fn reply_failure_carries_message() {
    let (src, dst) = endpoints();
    let event = Event::new(1, &src, &dst, "CMD_RUN", Map::new(), 5.0);
    let reply = event.reply(EventResult::failure("Invalid transition"));
    let result = reply.result.unwrap();
    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some("Invalid transition"));
}

#[test]
fn serde_round_trip_preserves_fields() {
    let (src, dst) = endpoints();
    let mut data = Map::new();
    data.insert("timeout".into(), json!(30));
    let event = Event::new(3, &src, &dst, "SET", data, 12.5);
    let encoded = serde_json::to_string(&event).unwrap();
    let decoded: Event = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, event);
}

#[test]
fn deserialize_fills_defaults() {
    let raw = json!({
        "id": 9,
        "source": "io",
        "source_address": "127.0.0.1",
        "source_port": 8001,
        "destination": "orchestrator",
        "destination_address": "127.0.0.1",
        "destination_port": 8000,
        "event_type": "CMD_ACK"
    });
    let event: Event = serde_json::from_value(raw).unwrap();
    assert!(event.data.is_empty());
    assert!(event.result.is_none());
    assert_eq!(event.maximum_processing_time, DEFAULT_MAX_PROCESSING_TIME);
}

#[test]
fn command_parses_from_event_type() {
    let (src, dst) = endpoints();
    let event = Event::new(1, &src, &dst, "CMD_PAUSE", Map::new(), 5.0);
    assert_eq!(event.command(), Some(Command::Pause));

    let domain = Event::new(2, &src, &dst, "IO_SET_OUTPUT", Map::new(), 5.0);
    assert_eq!(domain.command(), None);
}

#[test]
fn endpoint_url_formats_ingress_address() {
    let endpoint = Endpoint::new("io", "10.0.0.4", 8001);
    assert_eq!(endpoint.url(), "http://10.0.0.4:8001/event");
}
