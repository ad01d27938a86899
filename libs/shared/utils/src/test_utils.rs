use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub booking_max_retries: u32,
    pub booking_retry_backoff_ms: u64,
    pub booking_transaction_timeout_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            booking_max_retries: 3,
            booking_retry_backoff_ms: 1,
            booking_transaction_timeout_ms: 500,
        }
    }
}

impl TestConfig {
    /// Config pointing the Supabase backend at a mock server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: String::new(),
            storage_backend: StorageBackend::Memory,
            bind_address: "127.0.0.1:0".to_string(),
            booking_max_retries: self.booking_max_retries,
            booking_retry_backoff_ms: self.booking_retry_backoff_ms,
            booking_transaction_timeout_ms: self.booking_transaction_timeout_ms,
            default_provider_timezone: "UTC".to_string(),
        }
    }
}

/// Row shapes as PostgREST returns them for the scheduling tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn availability_row(
        provider_id: Uuid,
        day_of_week: &str,
        start_time: &str,
        end_time: &str,
        break_window: Option<(&str, &str)>,
    ) -> serde_json::Value {
        json!({
            "provider_id": provider_id,
            "day_of_week": day_of_week,
            "is_enabled": true,
            "start_time": start_time,
            "end_time": end_time,
            "break_start": break_window.map(|(start, _)| start),
            "break_end": break_window.map(|(_, end)| end),
            "updated_at": "2025-06-01T00:00:00Z"
        })
    }

    pub fn disabled_day_row(provider_id: Uuid, day_of_week: &str) -> serde_json::Value {
        json!({
            "provider_id": provider_id,
            "day_of_week": day_of_week,
            "is_enabled": false,
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "break_start": null,
            "break_end": null,
            "updated_at": "2025-06-01T00:00:00Z"
        })
    }

    pub fn policy_row(
        provider_id: Uuid,
        slot_duration_minutes: u32,
        buffer_minutes: u32,
        auto_confirm: bool,
    ) -> serde_json::Value {
        json!({
            "provider_id": provider_id,
            "slot_duration_minutes": slot_duration_minutes,
            "buffer_minutes": buffer_minutes,
            "auto_confirm": auto_confirm,
            "timezone": "UTC",
            "updated_at": "2025-06-01T00:00:00Z"
        })
    }

    pub fn appointment_row(
        id: Uuid,
        provider_id: Uuid,
        patient_id: Uuid,
        scheduled_date: &str,
        start_time: &str,
        end_time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "provider_id": provider_id,
            "patient_id": patient_id,
            "scheduled_date": scheduled_date,
            "start_time": start_time,
            "end_time": end_time,
            "status": status,
            "created_at": "2025-06-13T08:00:00Z",
            "updated_at": "2025-06-13T08:00:00Z"
        })
    }

    pub fn postgrest_error(code: &str, message: &str) -> serde_json::Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}
