use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers;
use crate::services::AvailabilityService;

/// Provider-facing configuration routes, mounted under `/providers`.
pub fn provider_routes(service: Arc<AvailabilityService>) -> Router {
    Router::new()
        .route(
            "/{provider_id}/availability",
            put(handlers::set_weekly_schedule).get(handlers::get_weekly_schedule),
        )
        .route(
            "/{provider_id}/scheduling-policy",
            put(handlers::set_scheduling_policy).get(handlers::get_scheduling_policy),
        )
        .route(
            "/{provider_id}/closures/{date}",
            put(handlers::set_closure)
                .get(handlers::get_closure)
                .delete(handlers::remove_closure),
        )
        .with_state(service)
}
