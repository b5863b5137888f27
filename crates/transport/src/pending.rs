// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reply correlation.
//!
//! When a listener emits an event and wants the reply, it registers the
//! `(destination, id)` pair here. The analysis loop completes the entry
//! when a reply with the matching source and id arrives.

use fm_core::Event;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::TransportError;

#[derive(Default)]
pub struct PendingReplies {
    waiters: Mutex<HashMap<(String, u64), oneshot::Sender<Event>>>,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the reply to event `id` sent to
    /// `destination`.
    pub fn register(&self, destination: &str, id: u64) -> oneshot::Receiver<Event> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert((destination.to_string(), id), tx);
        rx
    }

    /// Complete the waiter matching this reply, if any. Returns true
    /// when a waiter was unblocked.
    pub fn complete(&self, reply: Event) -> bool {
        let key = (reply.source.clone(), reply.id);
        let Some(tx) = self.waiters.lock().remove(&key) else {
            return false;
        };
        // A dropped receiver means the waiter already timed out.
        tx.send(reply).is_ok()
    }

    /// Drop a registration without completing it (send failed, caller
    /// gave up).
    pub fn abandon(&self, destination: &str, id: u64) {
        self.waiters.lock().remove(&(destination.to_string(), id));
    }

    /// Number of in-flight registrations.
    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }

    /// Await a registered reply, bounded by `maximum_processing_time`.
    /// Always unblocks within the timeout plus scheduling noise; the
    /// registration is cleaned up on expiry.
    pub async fn await_reply(
        &self,
        destination: &str,
        id: u64,
        rx: oneshot::Receiver<Event>,
        maximum_processing_time: f64,
    ) -> Result<Event, TransportError> {
        let timeout = Duration::from_secs_f64(maximum_processing_time.max(0.0));
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            // Sender dropped: transport gave up on the event.
            Ok(Err(_)) => {
                self.abandon(destination, id);
                Err(TransportError::Abandoned { destination: destination.to_string(), id })
            }
            Err(_) => {
                self.abandon(destination, id);
                Err(TransportError::ReplyTimeout {
                    destination: destination.to_string(),
                    id,
                    seconds: maximum_processing_time,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
