// libs/appointment-cell/src/services/ledger.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use availability_cell::models::BusyInterval;
use availability_cell::services::intervals_overlap;
use shared_database::DatabaseError;
use shared_utils::Clock;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, NewAppointment, StatusChange};
use crate::services::lifecycle::AppointmentLifecycleService;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Interval overlaps an active appointment: {0}")]
    Overlap(String),

    #[error("Transient storage failure: {0}")]
    Transient(String),

    #[error("Appointment is {actual}, expected {expected}")]
    Stale {
        expected: AppointmentStatus,
        actual: AppointmentStatus,
    },

    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Database(String),
}

impl From<DatabaseError> for LedgerError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(msg) => LedgerError::Overlap(msg),
            DatabaseError::SerializationFailure(msg) => LedgerError::Transient(msg),
            other => LedgerError::Database(other.to_string()),
        }
    }
}

impl From<LedgerError> for AppointmentError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Overlap(msg) => AppointmentError::SlotUnavailable(msg),
            LedgerError::Transient(msg) => AppointmentError::Database(msg),
            LedgerError::Stale { expected, actual } => AppointmentError::StaleState { expected, actual },
            LedgerError::NotFound(id) => AppointmentError::NotFound(id.to_string()),
            LedgerError::Database(msg) => AppointmentError::Database(msg),
        }
    }
}

/// Durable record of appointments.
///
/// `insert_if_free` must check for overlap and insert as one atomic step per
/// `(provider_id, scheduled_date)`, recording the insert in the history within
/// the same step. `transition_status` is a compare-and-set on the
/// stored status and never checks transition legality itself.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn insert_if_free(
        &self,
        booking: NewAppointment,
        now: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError>;

    async fn transition_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError>;

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, LedgerError>;

    async fn active_for_day(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<BusyInterval>, LedgerError>;

    /// Every appointment of the day regardless of status, ordered by start time.
    async fn list_for_day(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, LedgerError>;

    async fn history(&self, appointment_id: Uuid) -> Result<Vec<StatusChange>, LedgerError>;
}

// ==============================================================================
// IN-MEMORY LEDGER
// ==============================================================================

/// Appointment rows and their audit trail share one lock, so a row is never
/// visible without its history entry. No `.await` happens while it is held for
/// writing, which keeps a cancelled caller from leaving half a write behind.
#[derive(Default)]
struct LedgerState {
    appointments: HashMap<Uuid, Appointment>,
    history: HashMap<Uuid, Vec<StatusChange>>,
}

impl LedgerState {
    fn record(&mut self, change: StatusChange) {
        self.history.entry(change.appointment_id).or_default().push(change);
    }
}

#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedger {
    async fn insert_if_free(
        &self,
        booking: NewAppointment,
        now: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError> {
        let mut state = self.state.write().await;

        let clash = state.appointments.values().any(|existing| {
            existing.provider_id == booking.provider_id
                && existing.scheduled_date == booking.scheduled_date
                && existing.status.is_active()
                && intervals_overlap(
                    existing.start_time,
                    existing.end_time,
                    booking.start_time,
                    booking.end_time,
                )
        });

        if clash {
            return Err(LedgerError::Overlap(format!(
                "{} {} {} already taken",
                booking.provider_id, booking.scheduled_date, booking.start_time
            )));
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            provider_id: booking.provider_id,
            patient_id: booking.patient_id,
            scheduled_date: booking.scheduled_date,
            start_time: booking.start_time,
            end_time: booking.end_time,
            status: booking.status,
            created_at: now,
            updated_at: now,
        };
        state.appointments.insert(appointment.id, appointment.clone());
        state.record(StatusChange {
            appointment_id: appointment.id,
            from_status: None,
            to_status: appointment.status,
            changed_at: now,
        });

        Ok(appointment)
    }

    async fn transition_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError> {
        let mut state = self.state.write().await;

        let appointment = state
            .appointments
            .get_mut(&appointment_id)
            .ok_or(LedgerError::NotFound(appointment_id))?;

        if appointment.status != expected {
            return Err(LedgerError::Stale {
                expected,
                actual: appointment.status,
            });
        }

        appointment.status = new_status;
        appointment.updated_at = now;
        let updated = appointment.clone();

        state.record(StatusChange {
            appointment_id,
            from_status: Some(expected),
            to_status: new_status,
            changed_at: now,
        });

        Ok(updated)
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, LedgerError> {
        Ok(self.state.read().await.appointments.get(&appointment_id).cloned())
    }

    async fn active_for_day(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<BusyInterval>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .appointments
            .values()
            .filter(|a| a.provider_id == provider_id && a.scheduled_date == date && a.status.is_active())
            .map(Appointment::interval)
            .collect())
    }

    async fn list_for_day(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, LedgerError> {
        let state = self.state.read().await;
        let mut day: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| a.provider_id == provider_id && a.scheduled_date == date)
            .cloned()
            .collect();
        day.sort_by_key(|a| (a.start_time, a.created_at));
        Ok(day)
    }

    async fn history(&self, appointment_id: Uuid) -> Result<Vec<StatusChange>, LedgerError> {
        Ok(self
            .state
            .read()
            .await
            .history
            .get(&appointment_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ==============================================================================
// BOOKING LEDGER
// ==============================================================================

/// The state machine in front of a [`LedgerRepository`].
pub struct BookingLedger {
    repository: Arc<dyn LedgerRepository>,
    lifecycle: AppointmentLifecycleService,
    clock: Arc<dyn Clock>,
}

impl BookingLedger {
    pub fn new(repository: Arc<dyn LedgerRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            lifecycle: AppointmentLifecycleService::new(),
            clock,
        }
    }

    pub fn lifecycle(&self) -> &AppointmentLifecycleService {
        &self.lifecycle
    }

    /// Raw atomic insert. Transient failures are surfaced for the caller to retry.
    pub async fn insert(&self, booking: NewAppointment) -> Result<Appointment, LedgerError> {
        self.repository.insert_if_free(booking, self.clock.now()).await
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        self.lifecycle.validate_status_transition(&expected, &new_status)?;

        match self
            .repository
            .transition_status(appointment_id, expected, new_status, self.clock.now())
            .await
        {
            Ok(appointment) => {
                info!("Appointment {} moved {} -> {}", appointment_id, expected, new_status);
                Ok(appointment)
            }
            Err(LedgerError::Stale { expected, actual }) => {
                warn!(
                    "Stale status update on {}: expected {}, found {}",
                    appointment_id, expected, actual
                );
                Err(AppointmentError::StaleState { expected, actual })
            }
            Err(other) => Err(other.into()),
        }
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.repository
            .get(appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))
    }

    pub async fn busy_intervals(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<BusyInterval>, AppointmentError> {
        let busy = self.repository.active_for_day(provider_id, date).await?;
        debug!("{} active appointments for {} on {}", busy.len(), provider_id, date);
        Ok(busy)
    }

    pub async fn list_for_day(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.repository.list_for_day(provider_id, date).await?)
    }

    pub async fn history(&self, appointment_id: Uuid) -> Result<Vec<StatusChange>, AppointmentError> {
        let history = self.repository.history(appointment_id).await?;
        if history.is_empty() {
            // Every stored appointment has at least its insert recorded.
            self.get(appointment_id).await?;
        }
        Ok(history)
    }

    pub fn valid_next_statuses(&self, status: AppointmentStatus) -> Vec<AppointmentStatus> {
        self.lifecycle.get_valid_transitions(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use chrono::{NaiveTime, TimeZone};
    use futures::future::join_all;

    fn booking(provider_id: Uuid, start: (u32, u32), end: (u32, u32)) -> NewAppointment {
        NewAppointment {
            provider_id,
            patient_id: Uuid::new_v4(),
            scheduled_date: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            status: AppointmentStatus::Pending,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 13, 8, 0, 0).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_inserts_into_one_partition_have_one_winner() {
        let ledger = Arc::new(InMemoryLedger::new());
        let provider_id = Uuid::new_v4();

        // Same slot plus intervals that only partially overlap it.
        let intervals = [((10, 0), (10, 30)), ((10, 15), (10, 45)), ((9, 50), (10, 20))];
        let racers = (0..16).map(|i| {
            let ledger = Arc::clone(&ledger);
            let (start, end) = intervals[i % intervals.len()];
            tokio::spawn(async move { ledger.insert_if_free(booking(provider_id, start, end), now()).await })
        });

        let results: Vec<Result<Appointment, LedgerError>> =
            join_all(racers).await.into_iter().map(|joined| joined.unwrap()).collect();

        let winners: Vec<&Appointment> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        for result in results.iter().filter(|r| r.is_err()) {
            assert_matches!(result, Err(LedgerError::Overlap(_)));
        }

        let date = winners[0].scheduled_date;
        assert_eq!(ledger.active_for_day(provider_id, date).await.unwrap().len(), 1);
        assert_eq!(ledger.history(winners[0].id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_adjacent_and_inactive_intervals_do_not_clash() {
        let ledger = InMemoryLedger::new();
        let provider_id = Uuid::new_v4();

        let first = ledger
            .insert_if_free(booking(provider_id, (10, 0), (10, 30)), now())
            .await
            .unwrap();
        ledger
            .insert_if_free(booking(provider_id, (10, 30), (11, 0)), now())
            .await
            .unwrap();
        assert_matches!(
            ledger.insert_if_free(booking(provider_id, (10, 0), (10, 30)), now()).await,
            Err(LedgerError::Overlap(_))
        );

        ledger
            .transition_status(first.id, AppointmentStatus::Pending, AppointmentStatus::Cancelled, now())
            .await
            .unwrap();
        assert!(ledger
            .insert_if_free(booking(provider_id, (10, 0), (10, 30)), now())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_abandoned_insert_leaves_no_partial_state() {
        let ledger = InMemoryLedger::new();
        let provider_id = Uuid::new_v4();

        let reader = ledger.state.read().await;
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            ledger.insert_if_free(booking(provider_id, (10, 0), (10, 30)), now()),
        )
        .await;
        assert!(abandoned.is_err());
        drop(reader);

        {
            let state = ledger.state.read().await;
            assert!(state.appointments.is_empty());
            assert!(state.history.is_empty());
        }

        let appointment = ledger
            .insert_if_free(booking(provider_id, (10, 0), (10, 30)), now())
            .await
            .unwrap();
        let history = ledger.history(appointment.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, None);
        assert_eq!(history[0].to_status, AppointmentStatus::Pending);
    }

    #[tokio::test]
    async fn test_every_stored_row_has_a_matching_history_tail() {
        let ledger = InMemoryLedger::new();
        let appointment = ledger
            .insert_if_free(booking(Uuid::new_v4(), (9, 0), (9, 30)), now())
            .await
            .unwrap();
        ledger
            .transition_status(appointment.id, AppointmentStatus::Pending, AppointmentStatus::Confirmed, now())
            .await
            .unwrap();
        assert_matches!(
            ledger
                .transition_status(appointment.id, AppointmentStatus::Pending, AppointmentStatus::Cancelled, now())
                .await,
            Err(LedgerError::Stale { actual: AppointmentStatus::Confirmed, .. })
        );

        let state = ledger.state.read().await;
        for (id, row) in &state.appointments {
            let trail = &state.history[id];
            assert_eq!(trail.last().map(|c| c.to_status), Some(row.status));
        }
        assert_eq!(state.history[&appointment.id].len(), 2);
    }
}
