// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The three listener queues plus the PAUSE buffer.
//!
//! `incoming` holds freshly arrived events awaiting classification,
//! `processing` holds emitted events awaiting their reply, `to_be_sent`
//! is the outbound queue. `paused` buffers non-lifecycle traffic while
//! the listener is in PAUSE and is re-injected on resume.
//!
//! Snapshots are best-effort: written to a temp file and renamed into
//! place on FSM transitions, loaded at startup, loss tolerated.

use fm_core::Event;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::sync::Notify;
use tracing::warn;

/// Plain queue contents, the unit of snapshot persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Queues {
    pub incoming: VecDeque<Event>,
    pub processing: Vec<Event>,
    pub to_be_sent: VecDeque<Event>,
    pub paused: VecDeque<Event>,
}

/// Queue depths exported in the health blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDepths {
    pub incoming: usize,
    pub processing: usize,
    pub to_be_sent: usize,
    pub paused: usize,
}

/// Shared queue store with wakeups for the analysis and send loops.
pub struct QueueStore {
    inner: Mutex<Queues>,
    incoming_ready: Notify,
    outgoing_ready: Notify,
    snapshot_path: Option<PathBuf>,
}

impl QueueStore {
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        let inner = snapshot_path
            .as_deref()
            .and_then(load_snapshot)
            .unwrap_or_default();
        Self {
            inner: Mutex::new(inner),
            incoming_ready: Notify::new(),
            outgoing_ready: Notify::new(),
            snapshot_path,
        }
    }

    pub fn depths(&self) -> QueueDepths {
        let queues = self.inner.lock();
        QueueDepths {
            incoming: queues.incoming.len(),
            processing: queues.processing.len(),
            to_be_sent: queues.to_be_sent.len(),
            paused: queues.paused.len(),
        }
    }

    pub fn push_incoming(&self, event: Event) {
        self.inner.lock().incoming.push_back(event);
        self.incoming_ready.notify_one();
    }

    /// Pop the next incoming event, waiting until one arrives.
    pub async fn next_incoming(&self) -> Event {
        loop {
            let notified = self.incoming_ready.notified();
            if let Some(event) = self.inner.lock().incoming.pop_front() {
                return event;
            }
            notified.await;
        }
    }

    pub fn push_outgoing(&self, event: Event) {
        self.inner.lock().to_be_sent.push_back(event);
        self.outgoing_ready.notify_one();
    }

    /// Pop the next outbound event, waiting until one arrives.
    pub async fn next_outgoing(&self) -> Event {
        loop {
            let notified = self.outgoing_ready.notified();
            if let Some(event) = self.inner.lock().to_be_sent.pop_front() {
                return event;
            }
            notified.await;
        }
    }

    /// Track an emitted event whose reply is expected.
    pub fn push_processing(&self, event: Event) {
        self.inner.lock().processing.push(event);
    }

    /// Remove the processing entry matching a reply from `source` with
    /// event id `id`.
    pub fn take_processing(&self, source: &str, id: u64) -> Option<Event> {
        let mut queues = self.inner.lock();
        let index = queues
            .processing
            .iter()
            .position(|e| e.destination == source && e.id == id)?;
        Some(queues.processing.remove(index))
    }

    /// Buffer an event while in PAUSE.
    pub fn buffer_paused(&self, event: Event) {
        self.inner.lock().paused.push_back(event);
    }

    /// Re-inject buffered events ahead of anything that arrived since,
    /// preserving their original order.
    pub fn reinject_paused(&self) {
        let mut queues = self.inner.lock();
        while let Some(event) = queues.paused.pop_back() {
            queues.incoming.push_front(event);
        }
        drop(queues);
        self.incoming_ready.notify_one();
    }

    /// Write the snapshot if persistence is configured. Best effort:
    /// failures log WARN and the listener continues.
    pub fn snapshot(&self) {
        let Some(path) = self.snapshot_path.as_deref() else {
            return;
        };
        let queues = self.inner.lock().clone();
        if let Err(e) = write_snapshot(path, &queues) {
            warn!(path = %path.display(), error = %e, "queue snapshot failed");
        }
    }
}

fn write_snapshot(path: &Path, queues: &Queues) -> std::io::Result<()> {
    let encoded = serde_json::to_vec_pretty(queues)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, encoded)?;
    std::fs::rename(&tmp, path)
}

fn load_snapshot(path: &Path) -> Option<Queues> {
    let bytes = std::fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(queues) => Some(queues),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "discarding unreadable queue snapshot");
            None
        }
    }
}

#[cfg(test)]
#[path = "queues_tests.rs"]
mod tests;
