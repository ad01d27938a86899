// libs/availability-cell/tests/handlers_test.rs
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use availability_cell::provider_routes;
use availability_cell::services::AvailabilityService;

fn app() -> Router {
    Router::new().nest("/providers", provider_routes(Arc::new(AvailabilityService::in_memory())))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn week_body(monday_end: &str) -> Value {
    let mut week = vec![json!({
        "day_of_week": "monday",
        "start_time": "09:00",
        "end_time": monday_end,
        "break_start": "13:00",
        "break_end": "14:00"
    })];
    for day in ["tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"] {
        week.push(json!({
            "day_of_week": day,
            "is_enabled": day != "saturday" && day != "sunday",
            "start_time": "09:00",
            "end_time": "17:00"
        }));
    }
    json!({ "week": week })
}

#[tokio::test]
async fn test_put_then_get_weekly_schedule() {
    let app = app();
    let provider_id = Uuid::new_v4();
    let uri = format!("/providers/{}/availability", provider_id);

    let (status, body) = send(&app, "PUT", &uri, Some(week_body("18:00"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"].as_array().unwrap().len(), 7);

    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"][0]["day_of_week"], "monday");
    assert_eq!(body["days"][0]["break_start"], "13:00:00");
}

#[tokio::test]
async fn test_invalid_week_is_a_400_with_validation_kind() {
    let app = app();
    let uri = format!("/providers/{}/availability", Uuid::new_v4());

    let (status, body) = send(&app, "PUT", &uri, Some(week_body("08:00"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].as_str().unwrap().contains("monday"));

    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "week": "nope" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_bad_provider_id_is_rejected() {
    let app = app();
    let (status, body) = send(&app, "GET", "/providers/not-a-uuid/scheduling-policy", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_scheduling_policy_endpoints() {
    let app = app();
    let uri = format!("/providers/{}/scheduling-policy", Uuid::new_v4());

    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "slot_duration_minutes": 30, "buffer_minutes": 10, "timezone": "America/New_York" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timezone"], "America/New_York");
    assert_eq!(body["auto_confirm"], false);

    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "slot_duration_minutes": 0, "buffer_minutes": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_closure_endpoints() {
    let app = app();
    let uri = format!("/providers/{}/closures/2025-12-24", Uuid::new_v4());

    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "reason": "Holiday" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["closure_date"], "2025-12-24");

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "PUT", "/providers/00000000-0000-0000-0000-000000000000/closures/24-12-2025", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
