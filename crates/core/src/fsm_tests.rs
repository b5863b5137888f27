// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    unknown = { FsmState::Unknown, -1 },
    stopped = { FsmState::Stopped, 0 },
    initializing = { FsmState::Initializing, 1 },
    initialized = { FsmState::Initialized, 2 },
    starting = { FsmState::Starting, 3 },
    run = { FsmState::Run, 4 },
    soft_stopping = { FsmState::SoftStopping, 5 },
    pausing = { FsmState::Pausing, 6 },
    resuming = { FsmState::Resuming, 7 },
    pause = { FsmState::Pause, 8 },
    hard_stopping = { FsmState::HardStopping, 9 },
    fault = { FsmState::Fault, 10 },
    on_error = { FsmState::OnError, 11 },
)]
fn wire_codes_are_fixed(state: FsmState, code: i8) {
    assert_eq!(state.code(), code);
    assert_eq!(FsmState::try_from(code).unwrap(), state);
}

#[test]
fn state_serializes_as_integer_code() {
    let encoded = serde_json::to_string(&FsmState::Run).unwrap();
    assert_eq!(encoded, "4");
    let decoded: FsmState = serde_json::from_str("10").unwrap();
    assert_eq!(decoded, FsmState::Fault);
}

#[test]
fn unknown_code_fails_to_deserialize() {
    let result: Result<FsmState, _> = serde_json::from_str("42");
    assert!(result.is_err());
}

#[test]
fn name_round_trips() {
    assert_eq!(FsmState::from_name("SOFT_STOPPING"), Some(FsmState::SoftStopping));
    assert_eq!(FsmState::from_name("READY"), None);
}

#[parameterized(
    initialized_from_stopped = { Command::Initialized, FsmState::Stopped, &[FsmState::Initializing][..], FsmState::Initialized },
    initialized_from_run = { Command::Initialized, FsmState::Run, &[FsmState::SoftStopping][..], FsmState::Initialized },
    run_from_initialized = { Command::Run, FsmState::Initialized, &[FsmState::Starting][..], FsmState::Run },
    run_from_pause = { Command::Run, FsmState::Pause, &[FsmState::Resuming][..], FsmState::Run },
    pause_from_run = { Command::Pause, FsmState::Run, &[FsmState::Pausing][..], FsmState::Pause },
    stopped_from_pause = { Command::Stopped, FsmState::Pause, &[FsmState::HardStopping][..], FsmState::Stopped },
    stopped_from_run = { Command::Stopped, FsmState::Run, &[FsmState::Pausing, FsmState::HardStopping][..], FsmState::Stopped },
    ack_from_fault = { Command::Ack, FsmState::Fault, &[][..], FsmState::Stopped },
)]
fn legal_transitions(command: Command, from: FsmState, via: &[FsmState], target: FsmState) {
    let plan = command.plan(from).unwrap();
    assert_eq!(plan.via, via);
    assert_eq!(plan.target, target);
}

#[parameterized(
    run_from_stopped = { Command::Run, FsmState::Stopped },
    run_from_fault = { Command::Run, FsmState::Fault },
    pause_from_stopped = { Command::Pause, FsmState::Stopped },
    pause_from_initialized = { Command::Pause, FsmState::Initialized },
    stopped_from_stopped = { Command::Stopped, FsmState::Stopped },
    stopped_from_initialized = { Command::Stopped, FsmState::Initialized },
    ack_from_run = { Command::Ack, FsmState::Run },
    initialized_from_pause = { Command::Initialized, FsmState::Pause },
    initialized_from_fault = { Command::Initialized, FsmState::Fault },
)]
fn illegal_transitions_have_no_plan(command: Command, from: FsmState) {
    assert!(command.plan(from).is_none());
}

#[test]
fn query_commands_never_transition() {
    assert!(Command::GetState.is_query());
    assert!(Command::HealthCheck.is_query());
    for state in [FsmState::Stopped, FsmState::Run, FsmState::Fault] {
        assert!(Command::GetState.plan(state).is_none());
        assert!(Command::HealthCheck.plan(state).is_none());
    }
}

#[test]
fn command_tags_round_trip() {
    for command in [
        Command::Initialized,
        Command::Run,
        Command::Pause,
        Command::Stopped,
        Command::Ack,
        Command::GetState,
        Command::HealthCheck,
    ] {
        assert_eq!(Command::from_tag(command.tag()), Some(command));
    }
    assert_eq!(Command::from_tag("CMD_REBOOT"), None);
}
