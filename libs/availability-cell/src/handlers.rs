use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::parse::{parse_date, parse_uuid};

use crate::models::{SetClosureRequest, SetSchedulingPolicyRequest, SetWeeklyScheduleRequest};
use crate::services::AvailabilityService;

fn provider_id_from(raw: &str) -> Result<Uuid, AppError> {
    parse_uuid(raw, "provider_id").map_err(AppError::ValidationError)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::ValidationError(rejection.body_text()))
}

// ==============================================================================
// WEEKLY TEMPLATE
// ==============================================================================

#[axum::debug_handler]
pub async fn set_weekly_schedule(
    State(service): State<Arc<AvailabilityService>>,
    Path(provider_id): Path<String>,
    payload: Result<Json<SetWeeklyScheduleRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let provider_id = provider_id_from(&provider_id)?;
    let request = json_body(payload)?;

    let week = service.set_weekly_schedule(provider_id, request).await?;

    Ok(Json(json!({
        "provider_id": week.provider_id,
        "days": week.days,
        "updated_at": week.updated_at,
    })))
}

#[axum::debug_handler]
pub async fn get_weekly_schedule(
    State(service): State<Arc<AvailabilityService>>,
    Path(provider_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let provider_id = provider_id_from(&provider_id)?;
    let week = service.get_weekly_schedule(provider_id).await?;

    Ok(Json(json!({
        "provider_id": week.provider_id,
        "days": week.days,
        "updated_at": week.updated_at,
    })))
}

// ==============================================================================
// SCHEDULING POLICY
// ==============================================================================

#[axum::debug_handler]
pub async fn set_scheduling_policy(
    State(service): State<Arc<AvailabilityService>>,
    Path(provider_id): Path<String>,
    payload: Result<Json<SetSchedulingPolicyRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let provider_id = provider_id_from(&provider_id)?;
    let request = json_body(payload)?;

    let policy = service.set_scheduling_policy(provider_id, request).await?;
    Ok(Json(json!(policy)))
}

#[axum::debug_handler]
pub async fn get_scheduling_policy(
    State(service): State<Arc<AvailabilityService>>,
    Path(provider_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let provider_id = provider_id_from(&provider_id)?;
    let policy = service.get_scheduling_policy(provider_id).await?;
    Ok(Json(json!(policy)))
}

// ==============================================================================
// CLOSURES
// ==============================================================================

#[axum::debug_handler]
pub async fn set_closure(
    State(service): State<Arc<AvailabilityService>>,
    Path((provider_id, date)): Path<(String, String)>,
    payload: Option<Json<SetClosureRequest>>,
) -> Result<Json<Value>, AppError> {
    let provider_id = provider_id_from(&provider_id)?;
    let date = parse_date(&date, "date").map_err(AppError::ValidationError)?;
    let request = payload.map(|Json(body)| body).unwrap_or_default();

    let closure = service.set_closure(provider_id, date, request).await?;
    Ok(Json(json!(closure)))
}

#[axum::debug_handler]
pub async fn get_closure(
    State(service): State<Arc<AvailabilityService>>,
    Path((provider_id, date)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let provider_id = provider_id_from(&provider_id)?;
    let date = parse_date(&date, "date").map_err(AppError::ValidationError)?;

    match service.get_closure(provider_id, date).await? {
        Some(closure) => Ok(Json(json!(closure))),
        None => Err(AppError::NotFound(format!(
            "provider {} has no closure on {}",
            provider_id, date
        ))),
    }
}

#[axum::debug_handler]
pub async fn remove_closure(
    State(service): State<Arc<AvailabilityService>>,
    Path((provider_id, date)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let provider_id = provider_id_from(&provider_id)?;
    let date = parse_date(&date, "date").map_err(AppError::ValidationError)?;

    service.remove_closure(provider_id, date).await?;
    debug!("Closure removed for provider {} on {}", provider_id, date);

    Ok(Json(json!({
        "provider_id": provider_id,
        "closure_date": date,
        "removed": true,
    })))
}
