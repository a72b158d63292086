//! Consistent JSON error responses.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use triagedesk_core::FieldError;
use triagedesk_store::StoreError;

/// Single-message error body.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({ "error": message.into() })),
    )
        .into_response()
}

/// Structured validation failure: `{"error": [{field, message}, …]}`,
/// the shape the dashboard's form code expects.
pub fn validation_error(errors: &[FieldError]) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, axum::Json(json!({ "error": errors }))).into_response()
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "Ticket not found"),
        StoreError::Database(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
