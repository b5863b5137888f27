// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-transport: HTTP event transport.
//!
//! Ingress is a single `POST /event` route that validates, deduplicates,
//! and hands events to an [`EventSink`]. Egress is [`EventClient`], a
//! reqwest wrapper with exponential backoff. Reply correlation lives in
//! [`PendingReplies`].

mod client;
mod dedup;
mod pending;
mod server;

pub use client::{EventClient, SendOptions};
pub use dedup::DedupWindow;
pub use pending::PendingReplies;
pub use server::{bind, event_router, serve, EventSink};

use thiserror::Error;

/// Transport failures surfaced to callers after local recovery
/// (retries, timeouts) is exhausted.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send to {destination} failed after {attempts} attempts: {last_error}")]
    Exhausted { destination: String, attempts: u32, last_error: String },

    #[error("{destination} rejected event {id}: http {status}")]
    Rejected { destination: String, id: u64, status: u16 },

    #[error("no reply from {destination} to event {id} within {seconds}s")]
    ReplyTimeout { destination: String, id: u64, seconds: f64 },

    #[error("delivery of event {id} to {destination} was abandoned")]
    Abandoned { destination: String, id: u64 },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
