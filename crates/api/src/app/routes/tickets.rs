//! Ticket endpoints: submission, listing, retrieval, manual updates.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use triagedesk_core::{DomainError, FieldError, TicketStatus, validate_new_ticket};
use triagedesk_events::{UpdateEvent, UpdateKind};
use triagedesk_store::{NewTicket, TicketPatch};

use crate::app::dto::{CreateTicketRequest, ListTicketsParams, UpdateTicketRequest};
use crate::app::errors::{json_error, store_error_to_response, validation_error};
use crate::app::services::{AppServices, TRIAGE_QUEUE};
use crate::app::worker::TriagePayload;

/// POST /tickets: accept a ticket, persist it, enqueue classification.
///
/// Validation runs before any write; a rejected request leaves no row and
/// no job behind. The response is the `PENDING` row: classification is
/// asynchronous and clients learn the outcome via `/stream` or polling.
pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CreateTicketRequest>,
) -> Response {
    if let Err(err) = validate_new_ticket(&body.content, body.customer_email.as_deref()) {
        return match err {
            DomainError::Validation(errors) => validation_error(&errors),
            other => json_error(StatusCode::BAD_REQUEST, other.to_string()),
        };
    }

    let ticket = match services
        .tickets
        .insert(NewTicket {
            content: body.content,
            customer_email: body.customer_email.filter(|e| !e.is_empty()),
        })
        .await
    {
        Ok(ticket) => ticket,
        Err(e) => return store_error_to_response(e),
    };

    let payload = TriagePayload {
        ticket_id: ticket.id,
        content: ticket.content.clone(),
    };
    // The row exists either way; a failed enqueue surfaces as a 500 and the
    // orphaned PENDING row shows up in the dashboard for manual retry.
    let payload = match serde_json::to_value(&payload) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode triage payload");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };
    if let Err(e) = services.queue.enqueue(TRIAGE_QUEUE, payload).await {
        tracing::error!(ticket_id = %ticket.id, error = %e, "failed to enqueue triage job");
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    }

    tracing::info!(ticket_id = %ticket.id, "ticket created");
    services
        .realtime
        .publish(UpdateEvent::new(ticket.id, UpdateKind::Created));

    (StatusCode::CREATED, Json(ticket)).into_response()
}

/// GET /tickets: filtered, sorted, paginated listing.
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<ListTicketsParams>,
) -> Response {
    let query = match params.into_query() {
        Ok(q) => q,
        Err(bad) => return json_error(StatusCode::BAD_REQUEST, bad.0),
    };

    match services.tickets.list(query).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => store_error_to_response(e),
    }
}

/// GET /tickets/:id
pub async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match id.parse() {
        Ok(id) => id,
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "Invalid ticket id"),
    };

    match services.tickets.get(id).await {
        Ok(Some(ticket)) => Json(ticket).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Ticket not found"),
        Err(e) => store_error_to_response(e),
    }
}

/// PATCH /tickets/:id: manual status and draft edits from the dashboard.
pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTicketRequest>,
) -> Response {
    let id = match id.parse() {
        Ok(id) => id,
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "Invalid ticket id"),
    };

    let status = match body.status.as_deref() {
        None => None,
        Some(raw) => match TicketStatus::parse(raw) {
            Some(s) => Some(s),
            None => {
                return validation_error(&[FieldError::new(
                    "status",
                    format!("unknown status: {raw}"),
                )]);
            }
        },
    };

    // An all-absent body is a valid no-op: the row comes back unchanged
    // apart from `updatedAt`.
    let patch = TicketPatch {
        status,
        ai_draft: body.ai_draft,
    };

    match services.tickets.update(id, patch).await {
        Ok(ticket) => {
            services
                .realtime
                .publish(UpdateEvent::new(ticket.id, UpdateKind::Updated));
            Json(ticket).into_response()
        }
        Err(e) => store_error_to_response(e),
    }
}
