//! Triage worker bootstrap: the job handler, the worker pool, and the
//! queue-event → client-notification bridge.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use triagedesk_classifier::Classifier;
use triagedesk_core::TicketId;
use triagedesk_events::{Broadcaster, UpdateEvent, UpdateKind};
use triagedesk_jobs::{Job, JobExecutor, JobHandler, QueueEvent, WorkerConfig, WorkerHandle};
use triagedesk_store::TicketStore;

use crate::app::services::{AppServices, TRIAGE_QUEUE};

/// Payload of a triage job, keyed by ticket id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriagePayload {
    pub ticket_id: TicketId,
    pub content: String,
}

/// The per-job algorithm: classify, then overwrite the row.
///
/// Idempotent: the row update is a full overwrite of the classifier-owned
/// fields, so an at-least-once redelivery applies the same state again.
pub struct TriageHandler {
    tickets: Arc<dyn TicketStore>,
    classifier: Arc<dyn Classifier>,
}

impl TriageHandler {
    pub fn new(tickets: Arc<dyn TicketStore>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            tickets,
            classifier,
        }
    }
}

#[async_trait]
impl JobHandler for TriageHandler {
    async fn run(&self, job: &Job) -> Result<serde_json::Value, String> {
        let payload: TriagePayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| format!("bad triage payload: {e}"))?;

        tracing::info!(ticket_id = %payload.ticket_id, attempt = job.attempt, "processing ticket");

        let outcome = self
            .classifier
            .triage(&payload.content)
            .await
            .map_err(|e| e.to_string())?;

        // A store failure here fails the job and re-runs the classifier on
        // redelivery; accepted tradeoff given the idempotent overwrite.
        let ticket = self
            .tickets
            .apply_triage(payload.ticket_id, &outcome)
            .await
            .map_err(|e| e.to_string())?;

        tracing::info!(ticket_id = %ticket.id, "ticket processed");
        serde_json::to_value(&ticket).map_err(|e| format!("encode result: {e}"))
    }
}

/// Start the triage worker pool plus the notification bridge.
///
/// Returns the pool handle; callers own shutdown. The bridge task follows
/// the executor's event channel and exits when it closes.
pub fn spawn_triage_worker(
    services: &AppServices,
    classifier: Arc<dyn Classifier>,
    config: WorkerConfig,
) -> WorkerHandle {
    let mut executor = JobExecutor::new(services.queue.store());
    executor.register_handler(
        TRIAGE_QUEUE,
        Arc::new(TriageHandler::new(services.tickets.clone(), classifier)),
    );

    let events = executor.subscribe_events();
    tokio::spawn(bridge_queue_events(
        events,
        services.tickets.clone(),
        services.realtime.clone(),
    ));

    executor.spawn(config)
}

/// Relay queue outcomes to connected clients, and degrade the ticket row on
/// terminal failure.
async fn bridge_queue_events(
    mut events: tokio::sync::broadcast::Receiver<QueueEvent>,
    tickets: Arc<dyn TicketStore>,
    realtime: Broadcaster,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "notification bridge lagged; clients fall back to polling");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        match event {
            QueueEvent::Completed { queue, payload, .. } if queue == TRIAGE_QUEUE => {
                if let Some(ticket_id) = payload_ticket_id(&payload) {
                    realtime.publish(UpdateEvent::new(ticket_id, UpdateKind::Processed));
                }
            }
            QueueEvent::DeadLettered { queue, payload, reason, .. } if queue == TRIAGE_QUEUE => {
                let Some(ticket_id) = payload_ticket_id(&payload) else {
                    continue;
                };
                // Best-effort side update, distinct from the handler path:
                // logged, not retried.
                if let Err(e) = tickets.mark_failed(ticket_id).await {
                    tracing::error!(ticket_id = %ticket_id, error = %e, "failed to mark ticket FAILED");
                }
                realtime.publish(UpdateEvent::failed(ticket_id, reason));
            }
            _ => {}
        }
    }
}

fn payload_ticket_id(payload: &serde_json::Value) -> Option<TicketId> {
    serde_json::from_value::<TriagePayload>(payload.clone())
        .map(|p| p.ticket_id)
        .ok()
}
