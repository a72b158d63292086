//! HTTP routes.

use axum::Router;
use axum::routing::get;

pub mod system;
pub mod tickets;

pub fn router() -> Router {
    Router::new()
        .route("/tickets", get(tickets::list).post(tickets::create))
        .route(
            "/tickets/:id",
            get(tickets::get_one).patch(tickets::update),
        )
        .route("/health", get(system::health))
        .route("/stream", get(system::stream))
}
