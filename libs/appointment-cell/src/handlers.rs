// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::parse::{parse_date, parse_uuid};

use crate::models::{
    AppointmentStatus, BookAppointmentRequest, ListAppointmentsQuery, UpdateStatusRequest,
};
use crate::services::SchedulingCoordinator;

fn validation(message: String) -> AppError {
    AppError::ValidationError(message)
}

fn appointment_id_from(raw: &str) -> Result<Uuid, AppError> {
    parse_uuid(raw, "appointment_id").map_err(validation)
}

fn status_from(raw: &str, field: &str) -> Result<AppointmentStatus, AppError> {
    raw.parse::<AppointmentStatus>()
        .map_err(|e| validation(format!("{}: {}", field, e)))
}

// ==============================================================================
// AVAILABILITY (READ PATH)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(coordinator): State<Arc<SchedulingCoordinator>>,
    Path((provider_id, date)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let provider_id = parse_uuid(&provider_id, "provider_id").map_err(validation)?;
    let date = parse_date(&date, "date").map_err(validation)?;

    let availability = coordinator.available_slots(provider_id, date).await?;
    Ok(Json(json!(availability)))
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(coordinator): State<Arc<SchedulingCoordinator>>,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(request) = payload.map_err(|rejection| validation(rejection.body_text()))?;

    let appointment = coordinator.book_appointment(request).await?;
    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(coordinator): State<Arc<SchedulingCoordinator>>,
    Path(appointment_id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let appointment_id = appointment_id_from(&appointment_id)?;
    let Json(request) = payload.map_err(|rejection| validation(rejection.body_text()))?;

    let expected = status_from(&request.expected_status, "expected_status")?;
    let new_status = status_from(&request.new_status, "new_status")?;

    let appointment = coordinator
        .update_status(appointment_id, expected, new_status)
        .await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// LEDGER READS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(coordinator): State<Arc<SchedulingCoordinator>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment_id = appointment_id_from(&appointment_id)?;
    let appointment = coordinator.get_appointment(appointment_id).await?;
    let next = coordinator.valid_next_statuses(appointment.status);

    Ok(Json(json!({
        "appointment": appointment,
        "valid_next_statuses": next,
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_history(
    State(coordinator): State<Arc<SchedulingCoordinator>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment_id = appointment_id_from(&appointment_id)?;
    let history = coordinator.history(appointment_id).await?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "history": history,
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(coordinator): State<Arc<SchedulingCoordinator>>,
    query: Result<Query<ListAppointmentsQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query.map_err(|rejection| validation(rejection.body_text()))?;
    let provider_id = parse_uuid(&query.provider_id, "provider_id").map_err(validation)?;
    let date = parse_date(&query.date, "date").map_err(validation)?;

    let appointments = coordinator.list_appointments(provider_id, date).await?;

    Ok(Json(json!({
        "provider_id": provider_id,
        "date": date,
        "total": appointments.len(),
        "appointments": appointments,
    })))
}
