use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::scheduling_routes;
use appointment_cell::services::SchedulingCoordinator;
use availability_cell::router::provider_routes;
use availability_cell::services::AvailabilityService;

pub fn create_router(
    availability: Arc<AvailabilityService>,
    coordinator: Arc<SchedulingCoordinator>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Scheduling API is running!" }))
        .nest("/providers", provider_routes(availability))
        .merge(scheduling_routes(coordinator))
}
