// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event ingress: `POST /event`.
//!
//! The route acks synchronously with `{"id": n, "received": true}`;
//! semantic replies travel back through the sender's own ingress.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use fm_core::Event;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dedup::DedupWindow;
use crate::TransportError;

/// Where validated inbound events land (the listener's incoming queue).
pub trait EventSink: Send + Sync + 'static {
    fn accept(&self, event: Event);
}

#[derive(Clone)]
struct IngressState {
    sink: Arc<dyn EventSink>,
    dedup: Arc<DedupWindow>,
}

/// Build the ingress router for one listener.
pub fn event_router(sink: Arc<dyn EventSink>, dedup: Arc<DedupWindow>) -> Router {
    Router::new()
        .route("/event", post(receive_event))
        .with_state(IngressState { sink, dedup })
}

async fn receive_event(State(state): State<IngressState>, body: String) -> Response {
    let event: Event = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "dropping malformed event payload");
            return (StatusCode::BAD_REQUEST, Json(json!({"received": false}))).into_response();
        }
    };

    let ack = Json(json!({"id": event.id, "received": true}));
    if !state.dedup.observe(&event.source, event.id) {
        // Retried delivery of an event we already accepted: idempotent.
        warn!(id = event.id, source = %event.source, "duplicate event suppressed");
        return (StatusCode::OK, ack).into_response();
    }

    state.sink.accept(event);
    (StatusCode::OK, ack).into_response()
}

/// Bind the ingress socket.
pub async fn bind(address: &str, port: u16) -> Result<TcpListener, TransportError> {
    let addr = format!("{address}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })
}

/// Serve the router until `cancel` fires.
pub async fn serve(listener: TcpListener, router: Router, cancel: CancellationToken) {
    let local = listener.local_addr().ok();
    if let Some(addr) = local {
        info!(%addr, "event ingress listening");
    }
    let shutdown = cancel.cancelled_owned();
    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
    {
        warn!(error = %e, "event ingress terminated");
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
