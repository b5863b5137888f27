// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener state machine: states, lifecycle commands, and the
//! transition table.
//!
//! The integer state codes are part of the wire contract and never
//! change. The transition table is data: a command either yields a
//! [`TransitionPlan`] (transitional states to pass through plus the
//! steady target) or is illegal from the current state.

use serde::{Deserialize, Serialize};

/// Listener lifecycle states with their fixed wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum FsmState {
    Unknown,
    Stopped,
    Initializing,
    Initialized,
    Starting,
    Run,
    SoftStopping,
    Pausing,
    Resuming,
    Pause,
    HardStopping,
    Fault,
    OnError,
}

impl FsmState {
    /// Wire code for this state.
    pub fn code(self) -> i8 {
        match self {
            FsmState::Unknown => -1,
            FsmState::Stopped => 0,
            FsmState::Initializing => 1,
            FsmState::Initialized => 2,
            FsmState::Starting => 3,
            FsmState::Run => 4,
            FsmState::SoftStopping => 5,
            FsmState::Pausing => 6,
            FsmState::Resuming => 7,
            FsmState::Pause => 8,
            FsmState::HardStopping => 9,
            FsmState::Fault => 10,
            FsmState::OnError => 11,
        }
    }

    /// Canonical upper-case name, as used in scenario conditions.
    pub fn name(self) -> &'static str {
        match self {
            FsmState::Unknown => "UNKNOWN",
            FsmState::Stopped => "STOPPED",
            FsmState::Initializing => "INITIALIZING",
            FsmState::Initialized => "INITIALIZED",
            FsmState::Starting => "STARTING",
            FsmState::Run => "RUN",
            FsmState::SoftStopping => "SOFT_STOPPING",
            FsmState::Pausing => "PAUSING",
            FsmState::Resuming => "RESUMING",
            FsmState::Pause => "PAUSE",
            FsmState::HardStopping => "HARD_STOPPING",
            FsmState::Fault => "FAULT",
            FsmState::OnError => "ON_ERROR",
        }
    }

    /// Parse a canonical state name.
    pub fn from_name(name: &str) -> Option<FsmState> {
        ALL_STATES.iter().copied().find(|s| s.name() == name)
    }
}

const ALL_STATES: [FsmState; 13] = [
    FsmState::Unknown,
    FsmState::Stopped,
    FsmState::Initializing,
    FsmState::Initialized,
    FsmState::Starting,
    FsmState::Run,
    FsmState::SoftStopping,
    FsmState::Pausing,
    FsmState::Resuming,
    FsmState::Pause,
    FsmState::HardStopping,
    FsmState::Fault,
    FsmState::OnError,
];

impl From<FsmState> for i8 {
    fn from(state: FsmState) -> i8 {
        state.code()
    }
}

impl TryFrom<i8> for FsmState {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        ALL_STATES
            .iter()
            .copied()
            .find(|s| s.code() == code)
            .ok_or_else(|| format!("unknown fsm state code {code}"))
    }
}

impl std::fmt::Display for FsmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle commands delivered as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Initialized,
    Run,
    Pause,
    Stopped,
    Ack,
    GetState,
    HealthCheck,
}

impl Command {
    /// Wire tag carried in `event_type`.
    pub fn tag(self) -> &'static str {
        match self {
            Command::Initialized => "CMD_INITIALIZED",
            Command::Run => "CMD_RUN",
            Command::Pause => "CMD_PAUSE",
            Command::Stopped => "CMD_STOPPED",
            Command::Ack => "CMD_ACK",
            Command::GetState => "CMD_GET_STATE",
            Command::HealthCheck => "CMD_HEALTH_CHECK",
        }
    }

    /// Parse an `event_type` tag into a lifecycle command.
    pub fn from_tag(tag: &str) -> Option<Command> {
        match tag {
            "CMD_INITIALIZED" => Some(Command::Initialized),
            "CMD_RUN" => Some(Command::Run),
            "CMD_PAUSE" => Some(Command::Pause),
            "CMD_STOPPED" => Some(Command::Stopped),
            "CMD_ACK" => Some(Command::Ack),
            "CMD_GET_STATE" => Some(Command::GetState),
            "CMD_HEALTH_CHECK" => Some(Command::HealthCheck),
            _ => None,
        }
    }

    /// True for commands that never change state (`CMD_GET_STATE`,
    /// `CMD_HEALTH_CHECK`).
    pub fn is_query(self) -> bool {
        matches!(self, Command::GetState | Command::HealthCheck)
    }

    /// Transition plan for this command from `from`, or `None` when the
    /// command is illegal in that state. Query commands always return
    /// `None`; callers check [`Command::is_query`] first.
    pub fn plan(self, from: FsmState) -> Option<TransitionPlan> {
        use FsmState::*;
        let (via, target): (&'static [FsmState], FsmState) = match (self, from) {
            (Command::Initialized, Stopped) => (&[Initializing], Initialized),
            (Command::Initialized, Run) => (&[SoftStopping], Initialized),
            (Command::Run, Initialized) => (&[Starting], Run),
            (Command::Run, Pause) => (&[Resuming], Run),
            (Command::Pause, Run) => (&[Pausing], Pause),
            (Command::Stopped, Pause) => (&[HardStopping], Stopped),
            (Command::Stopped, Run) => (&[Pausing, HardStopping], Stopped),
            (Command::Ack, Fault) => (&[], Stopped),
            _ => return None,
        };
        Some(TransitionPlan { via, target })
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// The path a legal command takes: transitional states in order, then
/// the steady target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub via: &'static [FsmState],
    pub target: FsmState,
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;
