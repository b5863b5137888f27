// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Happy-path fleet startup: a real orchestrator drives two real
//! listeners from STOPPED to RUN through a startup scenario.

use crate::support::{spawn_client, wait_for_state};
use fm_core::FsmState;
use fm_orchestrator::{Orchestrator, OrchestratorConfig};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn startup_scenario_drives_fleet_to_run() {
    let (io, io_endpoint) = spawn_client("io").await;
    let (algo, algo_endpoint) = spawn_client("algo").await;

    let scenarios = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        scenarios.path().join("startup.json"),
        serde_json::to_vec_pretty(&json!({
            "name": "startup",
            "priority": 1,
            "max_executions": 1,
            "trigger": {
                "type": "automatic",
                "conditions": {"and": [
                    {"client_state": {"client": "io", "state": "STOPPED"}},
                    {"client_state": {"client": "algo", "state": "STOPPED"}}
                ]}
            },
            "actions": [
                {"type": "send_command", "groups": ["base_io"], "command": "CMD_INITIALIZED"},
                {"type": "wait_for_state", "groups": ["base_io"], "target_state": "INITIALIZED", "timeout": "10s"},
                {"type": "send_command", "target": "@all", "command": "CMD_RUN"},
                {"type": "wait_for_state", "target": "@all", "target_state": "RUN", "timeout": "10s"}
            ]
        }))
        .expect("encode scenario"),
    )
    .expect("write scenario");

    let config = OrchestratorConfig::parse(
        &json!({
            "name": "orchestrator",
            "port": 0,
            "tick_interval": 0.1,
            "get_state_timeout": 2.0,
            "scenarios_directory": scenarios.path(),
            "clients": {
                "io": {"address": "127.0.0.1", "port": io_endpoint.port, "groups": ["base_io"]},
                "algo": {"address": "127.0.0.1", "port": algo_endpoint.port, "groups": ["base_io"], "depends_on": ["io"]}
            }
        })
        .to_string(),
    )
    .expect("config parses");

    let orchestrator = Orchestrator::new(config).expect("orchestrator builds");
    orchestrator.start().await.expect("orchestrator binds");
    orchestrator.bootstrap().await;
    assert_eq!(orchestrator.handle().fsm_state(), FsmState::Run);

    assert!(
        wait_for_state(&io, FsmState::Run, Duration::from_secs(15)).await,
        "io never reached RUN (state: {})",
        io.handle().fsm_state()
    );
    assert!(
        wait_for_state(&algo, FsmState::Run, Duration::from_secs(15)).await,
        "algo never reached RUN (state: {})",
        algo.handle().fsm_state()
    );

    // exactly one successful execution recorded
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let state = orchestrator.engine().tracker().state("startup");
        if state.execution_count == 1 && state.in_flight == 0 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "startup run never finished");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    orchestrator.shutdown().await;
    io.shutdown();
    algo.shutdown();
}
