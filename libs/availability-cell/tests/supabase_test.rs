// libs/availability-cell/tests/supabase_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use availability_cell::models::{
    AvailabilityClosure, AvailabilityError, DayOfWeek, ProviderSchedulingPolicy,
};
use availability_cell::services::{AvailabilityRepository, SupabaseAvailabilityRepository};
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn repository(server: &MockServer) -> SupabaseAvailabilityRepository {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    SupabaseAvailabilityRepository::new(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn test_get_week_assembles_rows_in_weekday_order() {
    let server = MockServer::start().await;
    let provider_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_availability"))
        .and(query_param("provider_id", format!("eq.{}", provider_id)))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::disabled_day_row(provider_id, "sunday"),
            MockSupabaseResponses::availability_row(
                provider_id,
                "wednesday",
                "09:00:00",
                "18:00:00",
                Some(("13:00:00", "14:00:00")),
            ),
            MockSupabaseResponses::availability_row(provider_id, "monday", "08:00:00", "12:00:00", None),
        ])))
        .mount(&server)
        .await;

    let week = repository(&server).get_week(provider_id).await.unwrap().unwrap();

    let order: Vec<DayOfWeek> = week.days.iter().map(|d| d.day_of_week).collect();
    assert_eq!(order, vec![DayOfWeek::Monday, DayOfWeek::Wednesday, DayOfWeek::Sunday]);
    assert!(week.day(DayOfWeek::Wednesday).unwrap().break_window().is_some());
    assert!(!week.day(DayOfWeek::Sunday).unwrap().is_enabled);
}

#[tokio::test]
async fn test_get_week_without_rows_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(repository(&server).get_week(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_policy_upsert_uses_conflict_target() {
    let server = MockServer::start().await;
    let provider_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/provider_scheduling_policies"))
        .and(query_param("on_conflict", "provider_id"))
        .and(header("Prefer", "resolution=merge-duplicates,return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::policy_row(provider_id, 30, 10, true)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let saved = repository(&server)
        .upsert_policy(ProviderSchedulingPolicy {
            provider_id,
            slot_duration_minutes: 30,
            buffer_minutes: 10,
            auto_confirm: true,
            timezone: "UTC".to_string(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    assert_eq!(saved.step_minutes(), 40);
    assert!(saved.auto_confirm);
}

#[tokio::test]
async fn test_closure_delete_reports_whether_a_row_went_away() {
    let server = MockServer::start().await;
    let provider_id = Uuid::new_v4();
    let date = NaiveDate::from_ymd_opt(2025, 12, 24).unwrap();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/provider_closures"))
        .and(query_param("closure_date", "eq.2025-12-24"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "provider_id": provider_id,
            "closure_date": "2025-12-24",
            "reason": null,
            "created_at": "2025-06-01T00:00:00Z"
        }])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/provider_closures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let repo = repository(&server);
    assert!(repo.delete_closure(provider_id, date).await.unwrap());
    assert!(!repo.delete_closure(provider_id, date).await.unwrap());
}

#[tokio::test]
async fn test_closure_upsert_round_trips_reason() {
    let server = MockServer::start().await;
    let provider_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/provider_closures"))
        .and(query_param("on_conflict", "provider_id,closure_date"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "provider_id": provider_id,
            "closure_date": "2025-12-24",
            "reason": "Holiday",
            "created_at": "2025-06-01T00:00:00Z"
        }])))
        .mount(&server)
        .await;

    let saved = repository(&server)
        .upsert_closure(AvailabilityClosure {
            provider_id,
            closure_date: NaiveDate::from_ymd_opt(2025, 12, 24).unwrap(),
            reason: Some("Holiday".to_string()),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    assert_eq!(saved.reason.as_deref(), Some("Holiday"));
}

#[tokio::test]
async fn test_server_errors_surface_as_database_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_scheduling_policies"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(MockSupabaseResponses::postgrest_error("XX000", "internal error")),
        )
        .mount(&server)
        .await;

    assert_matches!(
        repository(&server).get_policy(Uuid::new_v4()).await,
        Err(AvailabilityError::Database(_))
    );
}
