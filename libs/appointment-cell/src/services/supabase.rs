// libs/appointment-cell/src/services/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use availability_cell::models::BusyInterval;
use shared_database::SupabaseClient;

use crate::models::{Appointment, AppointmentStatus, NewAppointment, StatusChange};
use crate::services::ledger::{LedgerError, LedgerRepository};

const ACTIVE_STATUS_FILTER: &str = "in.(pending,confirmed,checked_in,in_progress)";

/// Ledger stored in Postgres behind PostgREST.
///
/// Inserts go through the `book_appointment_slot` function, which takes a
/// per-partition advisory lock and re-checks overlap inside one transaction.
/// Status changes are conditional PATCHes filtered on the expected status.
pub struct SupabaseLedgerRepository {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseLedgerRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl LedgerRepository for SupabaseLedgerRepository {
    async fn insert_if_free(
        &self,
        booking: NewAppointment,
        _now: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError> {
        let params = json!({
            "p_id": Uuid::new_v4(),
            "p_provider_id": booking.provider_id,
            "p_patient_id": booking.patient_id,
            "p_scheduled_date": booking.scheduled_date,
            "p_start_time": booking.start_time,
            "p_end_time": booking.end_time,
            "p_status": booking.status,
        });

        let inserted: Vec<Appointment> = self.supabase.rpc("book_appointment_slot", params).await?;

        inserted
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::Database("book_appointment_slot returned no row".to_string()))
    }

    async fn transition_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment_id, expected
        );
        let body = json!({
            "status": new_status,
            "updated_at": now.to_rfc3339(),
        });

        let updated: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        if let Some(appointment) = updated.into_iter().next() {
            return Ok(appointment);
        }

        // Nothing matched: either the row is gone or its status moved on.
        debug!("Conditional update on {} matched no rows", appointment_id);
        match self.get(appointment_id).await? {
            Some(current) => Err(LedgerError::Stale {
                expected,
                actual: current.status,
            }),
            None => Err(LedgerError::NotFound(appointment_id)),
        }
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, LedgerError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn active_for_day(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<BusyInterval>, LedgerError> {
        let path = format!(
            "/rest/v1/appointments?provider_id=eq.{}&scheduled_date=eq.{}&status={}",
            provider_id, date, ACTIVE_STATUS_FILTER
        );
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.iter().map(Appointment::interval).collect())
    }

    async fn list_for_day(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, LedgerError> {
        let path = format!(
            "/rest/v1/appointments?provider_id=eq.{}&scheduled_date=eq.{}&order=start_time.asc,created_at.asc",
            provider_id, date
        );
        Ok(self.supabase.request(Method::GET, &path, None).await?)
    }

    async fn history(&self, appointment_id: Uuid) -> Result<Vec<StatusChange>, LedgerError> {
        let path = format!(
            "/rest/v1/appointment_status_history?appointment_id=eq.{}&order=changed_at.asc,id.asc",
            appointment_id
        );
        Ok(self.supabase.request(Method::GET, &path, None).await?)
    }
}
