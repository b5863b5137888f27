// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound event delivery with retry.

use fm_core::Event;
use std::time::Duration;
use tracing::{debug, warn};

use crate::TransportError;

/// Retry policy for one send.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub attempts: u32,
    pub base_backoff: Duration,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { attempts: 3, base_backoff: Duration::from_millis(250) }
    }
}

/// HTTP client posting events to their destination's `/event` ingress.
///
/// Retries transient failures with exponential backoff. A non-success
/// HTTP status is terminal: the destination saw the request and refused
/// it, so retrying cannot help.
#[derive(Clone)]
pub struct EventClient {
    http: reqwest::Client,
    options: SendOptions,
}

impl Default for EventClient {
    fn default() -> Self {
        Self::new(SendOptions::default())
    }
}

impl EventClient {
    pub fn new(options: SendOptions) -> Self {
        Self { http: reqwest::Client::new(), options }
    }

    /// Post `event` to its destination. Returns only after delivery or
    /// after the retry budget is exhausted.
    pub async fn send(&self, event: &Event) -> Result<(), TransportError> {
        let url = format!(
            "http://{}:{}/event",
            event.destination_address, event.destination_port
        );
        let mut last_error = String::new();

        for attempt in 0..self.options.attempts {
            if attempt > 0 {
                let backoff = self.options.base_backoff * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }
            match self.http.post(&url).json(event).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(
                        id = event.id,
                        destination = %event.destination,
                        event_type = %event.event_type,
                        attempt,
                        "event delivered"
                    );
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    warn!(
                        id = event.id,
                        destination = %event.destination,
                        status,
                        "event rejected"
                    );
                    return Err(TransportError::Rejected {
                        destination: event.destination.clone(),
                        id: event.id,
                        status,
                    });
                }
                Err(e) => {
                    last_error = e.to_string();
                    debug!(
                        id = event.id,
                        destination = %event.destination,
                        attempt,
                        error = %last_error,
                        "send attempt failed"
                    );
                }
            }
        }

        warn!(
            id = event.id,
            destination = %event.destination,
            attempts = self.options.attempts,
            error = %last_error,
            "event dropped after retry exhaustion"
        );
        Err(TransportError::Exhausted {
            destination: event.destination.clone(),
            attempts: self.options.attempts,
            last_error,
        })
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
