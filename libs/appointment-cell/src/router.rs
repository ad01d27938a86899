// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};

use crate::handlers;
use crate::services::SchedulingCoordinator;

pub fn scheduling_routes(coordinator: Arc<SchedulingCoordinator>) -> Router {
    Router::new()
        // Patient-facing read path
        .route("/availability/{provider_id}/{date}", get(handlers::get_available_slots))
        // Booking ledger
        .route(
            "/appointments",
            get(handlers::list_appointments).post(handlers::book_appointment),
        )
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route(
            "/appointments/{appointment_id}/status",
            patch(handlers::update_appointment_status),
        )
        .route(
            "/appointments/{appointment_id}/history",
            get(handlers::get_appointment_history),
        )
        .with_state(coordinator)
}
