// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario-engine seeds: template type preservation, lifetime caps
//! with ACK reset, outbound error cooldown, and condition branching.

use fm_adapters::fake::{FakeDatabase, FakeMailer};
use fm_adapters::Components;
use fm_core::FakeClock;
use fm_scenario::action::OutboundPolicy;
use fm_scenario::test_support::{client_in_state, FakePort};
use fm_scenario::{
    ActionRegistry, CommandPort, ConditionRegistry, EngineConfig, ErrorCounters, Scenario,
    ScenarioEngine,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct Rig {
    engine: Arc<ScenarioEngine<FakeClock>>,
    port: Arc<FakePort>,
    components: Arc<Components>,
}

fn rig(components: Components, policy: OutboundPolicy) -> Rig {
    let engine = Arc::new(ScenarioEngine::new(
        EngineConfig::default(),
        ConditionRegistry::with_builtins(),
        ActionRegistry::with_builtins(policy),
        Arc::new(ErrorCounters::new()),
        FakeClock::new(),
    ));
    let port = Arc::new(FakePort::new());
    port.insert_client("io", client_in_state(json!(0)));
    Rig { engine, port, components: Arc::new(components) }
}

impl Rig {
    fn install(&self, body: Value) {
        let scenario: Scenario = serde_json::from_value(body).expect("scenario parses");
        self.engine.install_scenario(scenario);
    }

    async fn tick(&self) -> Vec<String> {
        let report = self
            .engine
            .tick(
                self.port.clients(),
                Arc::clone(&self.components),
                self.port.clone() as Arc<dyn CommandPort>,
            )
            .await;
        report.dispatched
    }

    async fn settle(&self) {
        for _ in 0..500 {
            if self.engine.tracker().global_in_flight() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("scenario runs never settled");
    }
}

/// Trigger that fires as long as `io` reports STOPPED.
fn io_stopped_trigger() -> Value {
    json!({
        "type": "automatic",
        "conditions": {"client_state": {"client": "io", "state": "STOPPED"}}
    })
}

#[tokio::test]
async fn template_substitution_preserves_integer_types() {
    let db = Arc::new(FakeDatabase::new());
    db.stub_value("SELECT timeout_s FROM settings", json!(30));
    let mut components = Components::new();
    components.insert_database("settings", db);
    let rig = rig(components, OutboundPolicy::default());

    rig.install(json!({
        "name": "apply-timeout",
        "trigger": {
            "type": "automatic",
            "conditions": {"database": {
                "component": "settings",
                "query": "SELECT timeout_s FROM settings",
                "expected": 30,
                "bind": "timeout_s"
            }}
        },
        "actions": [{
            "type": "send_custom_command",
            "client": "io",
            "command": "SET",
            "data": {"timeout": "{{ trigger.timeout_s }}"}
        }]
    }));

    assert_eq!(rig.tick().await, vec!["apply-timeout".to_string()]);
    rig.settle().await;

    let sent = rig.port.sent_events();
    assert_eq!(sent.len(), 1);
    // integer in, integer out: not the string "30"
    assert_eq!(sent[0].data["timeout"], json!(30));
}

#[tokio::test]
async fn max_executions_blocks_then_ack_unblocks() {
    let rig = rig(Components::new(), OutboundPolicy::default());
    rig.install(json!({
        "name": "s",
        "max_executions": 2,
        "trigger": io_stopped_trigger(),
        "actions": []
    }));

    for round in 1..=2u64 {
        assert_eq!(rig.tick().await.len(), 1, "round {round}");
        rig.settle().await;
        assert_eq!(rig.engine.tracker().state("s").execution_count, round);
    }

    // third tick: blocked
    assert!(rig.tick().await.is_empty());

    rig.engine.ack_reset();
    assert_eq!(rig.tick().await.len(), 1);
    rig.settle().await;
    assert_eq!(rig.engine.tracker().state("s").execution_count, 1);
}

#[tokio::test]
async fn send_email_cooldown_after_repeated_failures() {
    let mailer = Arc::new(FakeMailer::new());
    mailer.set_failing(true);
    let mut components = Components::new();
    components.set_mailer(mailer.clone());
    let rig = rig(
        components,
        OutboundPolicy { email_max_error_attempts: 3, sms_max_error_attempts: 3 },
    );

    rig.install(json!({
        "name": "alert",
        "trigger": io_stopped_trigger(),
        "actions": [{
            "type": "send_email",
            "to": "ops@example.com",
            "subject": "cell fault",
            "body": "io is down"
        }]
    }));

    // three failing runs feed the counter; none counts as a success
    for _ in 0..3 {
        assert_eq!(rig.tick().await.len(), 1);
        rig.settle().await;
    }
    assert_eq!(rig.engine.counters().count("send_email"), 3);
    assert_eq!(rig.engine.tracker().state("alert").execution_count, 0);

    // fourth run skips the delivery attempt entirely
    mailer.set_failing(false);
    assert_eq!(rig.tick().await.len(), 1);
    rig.settle().await;
    assert!(mailer.sent().is_empty());
    assert_eq!(rig.engine.tracker().state("alert").execution_count, 1);

    // operator ACK resets the counter; delivery flows again
    rig.engine.ack_reset();
    assert_eq!(rig.tick().await.len(), 1);
    rig.settle().await;
    assert_eq!(mailer.sent().len(), 1);
    assert_eq!(rig.engine.counters().count("send_email"), 0);
}

#[tokio::test]
async fn evaluate_condition_runs_exactly_one_branch() {
    let rig = rig(Components::new(), OutboundPolicy::default());
    rig.port.insert_client("db", client_in_state(json!("READY")));
    rig.install(json!({
        "name": "check-db",
        "trigger": io_stopped_trigger(),
        "actions": [{
            "type": "evaluate_condition",
            "conditions": [{"client_state": {"client": "db", "state": "READY"}}],
            "true_actions": [
                {"type": "send_custom_command", "client": "io", "command": "DB_READY"}
            ],
            "false_actions": [
                {"type": "send_custom_command", "client": "io", "command": "DB_NOT_READY"}
            ]
        }]
    }));

    assert_eq!(rig.tick().await.len(), 1);
    rig.settle().await;
    let commands: Vec<String> =
        rig.port.sent_events().iter().map(|e| e.event_type.clone()).collect();
    assert_eq!(commands, vec!["DB_READY".to_string()]);

    // flip the client into FAULT: only the false branch runs
    rig.port.set_client_state("db", json!("FAULT"));
    rig.port.sent.lock().clear();
    assert_eq!(rig.tick().await.len(), 1);
    rig.settle().await;
    let commands: Vec<String> =
        rig.port.sent_events().iter().map(|e| e.event_type.clone()).collect();
    assert_eq!(commands, vec!["DB_NOT_READY".to_string()]);
}
