// libs/availability-cell/src/services/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{
    AvailabilityClosure, AvailabilityError, DaySchedule, ProviderDayRow, ProviderSchedulingPolicy,
    WeeklySchedule,
};
use crate::services::repository::AvailabilityRepository;

/// PostgREST-backed storage. Week replacement is a single bulk upsert statement, so
/// Postgres applies all seven rows or none.
pub struct SupabaseAvailabilityRepository {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAvailabilityRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn week_from_rows(provider_id: Uuid, rows: Vec<ProviderDayRow>) -> Option<WeeklySchedule> {
        let updated_at = rows.iter().map(|row| row.updated_at).max()?;
        let mut days: Vec<DaySchedule> = rows.into_iter().map(|row| row.schedule).collect();
        days.sort_by_key(|day| day.day_of_week);

        Some(WeeklySchedule {
            provider_id,
            days,
            updated_at,
        })
    }
}

#[async_trait]
impl AvailabilityRepository for SupabaseAvailabilityRepository {
    async fn replace_week(
        &self,
        provider_id: Uuid,
        days: Vec<DaySchedule>,
    ) -> Result<WeeklySchedule, AvailabilityError> {
        debug!("Replacing weekly schedule for provider {}", provider_id);

        let now = Utc::now();
        let rows: Vec<ProviderDayRow> = days
            .into_iter()
            .map(|schedule| ProviderDayRow {
                provider_id,
                schedule,
                updated_at: now,
            })
            .collect();

        let body = serde_json::to_value(&rows)
            .map_err(|e| AvailabilityError::Database(e.to_string()))?;

        let saved: Vec<ProviderDayRow> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/provider_availability?on_conflict=provider_id,day_of_week",
                Some(body),
                Some(SupabaseClient::upsert_representation()),
            )
            .await?;

        Self::week_from_rows(provider_id, saved)
            .ok_or_else(|| AvailabilityError::Database("weekly schedule upsert returned no rows".to_string()))
    }

    async fn get_week(&self, provider_id: Uuid) -> Result<Option<WeeklySchedule>, AvailabilityError> {
        let path = format!("/rest/v1/provider_availability?provider_id=eq.{}", provider_id);
        let rows: Vec<ProviderDayRow> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(Self::week_from_rows(provider_id, rows))
    }

    async fn upsert_policy(
        &self,
        policy: ProviderSchedulingPolicy,
    ) -> Result<ProviderSchedulingPolicy, AvailabilityError> {
        debug!("Saving scheduling policy for provider {}", policy.provider_id);

        let body = serde_json::to_value(&policy)
            .map_err(|e| AvailabilityError::Database(e.to_string()))?;

        let saved: Vec<ProviderSchedulingPolicy> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/provider_scheduling_policies?on_conflict=provider_id",
                Some(body),
                Some(SupabaseClient::upsert_representation()),
            )
            .await?;

        saved
            .into_iter()
            .next()
            .ok_or_else(|| AvailabilityError::Database("policy upsert returned no rows".to_string()))
    }

    async fn get_policy(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<ProviderSchedulingPolicy>, AvailabilityError> {
        let path = format!("/rest/v1/provider_scheduling_policies?provider_id=eq.{}", provider_id);
        let rows: Vec<ProviderSchedulingPolicy> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(rows.into_iter().next())
    }

    async fn upsert_closure(
        &self,
        closure: AvailabilityClosure,
    ) -> Result<AvailabilityClosure, AvailabilityError> {
        let body = json!({
            "provider_id": closure.provider_id,
            "closure_date": closure.closure_date,
            "reason": closure.reason,
            "created_at": closure.created_at.to_rfc3339(),
        });

        let saved: Vec<AvailabilityClosure> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/provider_closures?on_conflict=provider_id,closure_date",
                Some(body),
                Some(SupabaseClient::upsert_representation()),
            )
            .await?;

        saved
            .into_iter()
            .next()
            .ok_or_else(|| AvailabilityError::Database("closure upsert returned no rows".to_string()))
    }

    async fn delete_closure(&self, provider_id: Uuid, date: NaiveDate) -> Result<bool, AvailabilityError> {
        let path = format!(
            "/rest/v1/provider_closures?provider_id=eq.{}&closure_date=eq.{}",
            provider_id, date
        );

        let removed: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        Ok(!removed.is_empty())
    }

    async fn get_closure(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityClosure>, AvailabilityError> {
        let path = format!(
            "/rest/v1/provider_closures?provider_id=eq.{}&closure_date=eq.{}",
            provider_id, date
        );
        let rows: Vec<AvailabilityClosure> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(rows.into_iter().next())
    }
}
