//! Health and real-time stream endpoints.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use crate::app::services::AppServices;

/// Name of the SSE event carrying ticket updates.
pub const UPDATE_EVENT: &str = "ticket:update";

/// GET /health: liveness probe.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /stream: server-sent ticket updates.
///
/// Lossy by contract: a lagging client drops the oldest buffered events
/// and the stream keeps going. The dashboard re-fetches on reconnect.
pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(UPDATE_EVENT).data(data)))
        }
        // Lagged receiver: skip the gap, stay subscribed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
