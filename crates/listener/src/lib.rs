// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-listener: the reusable event-listener runtime.
//!
//! Every component in the fleet is an [`EventListener`] parameterized by
//! a [`Behavior`]: the state machine, queues, HTTP ingress/egress, and
//! worker loops live here; domain logic lives in the behavior's hooks.

pub mod behavior;
pub mod config;
pub mod queues;
pub mod runtime;
pub mod state;
mod workers;

pub use behavior::{AnalyzeOutcome, Behavior, HookError, NullBehavior};
pub use config::ListenerConfig;
pub use queues::{QueueDepths, QueueStore, Queues};
pub use runtime::{EventListener, ListenerCore, ListenerHandle};
pub use state::{ListenerState, Metrics, StateReport};

use fm_core::{Command, FsmState};
use thiserror::Error;

/// Listener-level failures.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid transition: {command} from {state}")]
    InvalidTransition { command: Command, state: FsmState },

    #[error("hook {hook} failed: {message}")]
    HookFailure { hook: &'static str, message: String },

    #[error(transparent)]
    Transport(#[from] fm_transport::TransportError),
}
