// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use availability_cell::models::{DayOfWeek, DaySchedule, ProviderSchedulingPolicy, Slot};
use availability_cell::services::{AvailabilityService, SlotGenerator};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use shared_utils::parse::{parse_date, parse_time_of_day, parse_uuid};
use shared_utils::{Clock, SystemClock};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AvailabilityResponse, BookAppointmentRequest,
    NewAppointment, StatusChange,
};
use crate::services::ledger::{BookingLedger, InMemoryLedger, LedgerError, LedgerRepository};
use crate::services::supabase::SupabaseLedgerRepository;

/// Retry and timeout bounds for the atomic booking insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingSettings {
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub transaction_timeout: Duration,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
            transaction_timeout: Duration::from_millis(5_000),
        }
    }
}

impl BookingSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.booking_max_retries,
            retry_backoff: Duration::from_millis(config.booking_retry_backoff_ms),
            transaction_timeout: Duration::from_millis(config.booking_transaction_timeout_ms),
        }
    }
}

/// Everything needed to lay out one provider-day.
struct DayContext {
    policy: ProviderSchedulingPolicy,
    template: Option<DaySchedule>,
    closed: bool,
}

pub struct SchedulingCoordinator {
    availability: Arc<AvailabilityService>,
    ledger: BookingLedger,
    clock: Arc<dyn Clock>,
    settings: BookingSettings,
}

impl SchedulingCoordinator {
    pub fn new(
        availability: Arc<AvailabilityService>,
        ledger: Arc<dyn LedgerRepository>,
        clock: Arc<dyn Clock>,
        settings: BookingSettings,
    ) -> Self {
        Self {
            availability,
            ledger: BookingLedger::new(ledger, Arc::clone(&clock)),
            clock,
            settings,
        }
    }

    /// Build a coordinator on the storage backend named by the configuration.
    pub fn from_config(config: &AppConfig, availability: Arc<AvailabilityService>) -> Self {
        let ledger: Arc<dyn LedgerRepository> = match config.storage_backend {
            StorageBackend::Memory => Arc::new(InMemoryLedger::new()),
            StorageBackend::Supabase => Arc::new(SupabaseLedgerRepository::new(Arc::new(
                SupabaseClient::new(config),
            ))),
        };

        Self::new(
            availability,
            ledger,
            Arc::new(SystemClock),
            BookingSettings::from_config(config),
        )
    }

    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    /// Slots for `date` with live ledger state applied. A closed date has no slots.
    #[instrument(skip(self))]
    pub async fn available_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<AvailabilityResponse, AppointmentError> {
        let context = self.day_context(provider_id, date).await?;

        let slots = match (&context.template, context.closed) {
            (Some(template), false) => self.live_slots(provider_id, date, template, &context.policy).await?,
            _ => Vec::new(),
        };

        Ok(AvailabilityResponse {
            provider_id,
            date,
            timezone: context.policy.timezone,
            slot_duration_minutes: context.policy.slot_duration_minutes,
            buffer_minutes: context.policy.buffer_minutes,
            closed: context.closed,
            slots,
        })
    }

    /// Book the slot starting at `request.start_time`.
    ///
    /// The slot is re-derived against the live ledger before the atomic insert, so a
    /// stale availability view can never produce an off-grid or overlapping booking.
    #[instrument(skip(self, request), fields(provider_id = %request.provider_id, date = %request.date))]
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let provider_id =
            parse_uuid(&request.provider_id, "provider_id").map_err(AppointmentError::Validation)?;
        let patient_id =
            parse_uuid(&request.patient_id, "patient_id").map_err(AppointmentError::Validation)?;
        let date = parse_date(&request.date, "date").map_err(AppointmentError::Validation)?;
        let start_time =
            parse_time_of_day(&request.start_time, "start_time").map_err(AppointmentError::Validation)?;

        let context = self.day_context(provider_id, date).await?;

        let template = context.template.as_ref().ok_or_else(|| {
            AppointmentError::Configuration(format!("provider {} has no weekly schedule", provider_id))
        })?;
        if !template.is_enabled {
            return Err(AppointmentError::Configuration(format!(
                "provider {} does not work on {}",
                provider_id, template.day_of_week
            )));
        }
        if context.closed {
            return Err(AppointmentError::SlotUnavailable(format!(
                "provider {} is closed on {}",
                provider_id, date
            )));
        }

        let slots = self.live_slots(provider_id, date, template, &context.policy).await?;
        let slot = SlotGenerator::find(&slots, start_time).ok_or_else(|| {
            AppointmentError::SlotUnavailable(format!("{} is not a bookable slot start", start_time))
        })?;
        if !slot.available {
            info!("Requested slot {} {} is {:?}", date, start_time, slot.blocked_by);
            return Err(AppointmentError::SlotUnavailable(format!(
                "{} {} is no longer available",
                date, start_time
            )));
        }

        let booking = NewAppointment {
            provider_id,
            patient_id,
            scheduled_date: date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: self.ledger.lifecycle().initial_status(context.policy.auto_confirm),
        };

        let appointment = self.insert_with_retry(booking).await?;
        info!(
            "Booked appointment {} for provider {} on {} at {} ({})",
            appointment.id, provider_id, date, start_time, appointment.status
        );
        Ok(appointment)
    }

    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        self.ledger.update_status(appointment_id, expected, new_status).await
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.ledger.get(appointment_id).await
    }

    pub async fn list_appointments(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.ledger.list_for_day(provider_id, date).await
    }

    pub async fn history(&self, appointment_id: Uuid) -> Result<Vec<StatusChange>, AppointmentError> {
        self.ledger.history(appointment_id).await
    }

    pub fn valid_next_statuses(&self, status: AppointmentStatus) -> Vec<AppointmentStatus> {
        self.ledger.valid_next_statuses(status)
    }

    async fn day_context(&self, provider_id: Uuid, date: NaiveDate) -> Result<DayContext, AppointmentError> {
        let policy = self
            .availability
            .find_scheduling_policy(provider_id)
            .await?
            .ok_or_else(|| {
                AppointmentError::Configuration(format!("provider {} has no scheduling policy", provider_id))
            })?;

        let day_of_week = DayOfWeek::from(date.weekday());
        let template = self.availability.find_day_schedule(provider_id, day_of_week).await?;
        let closed = self.availability.get_closure(provider_id, date).await?.is_some();

        if template.is_none() && !closed {
            return Err(AppointmentError::Configuration(format!(
                "provider {} has no schedule for {}",
                provider_id, day_of_week
            )));
        }

        Ok(DayContext { policy, template, closed })
    }

    async fn live_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        template: &DaySchedule,
        policy: &ProviderSchedulingPolicy,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let tz = policy.tz()?;
        let local_now = self.clock.now().with_timezone(&tz).naive_local();
        let busy = self.ledger.busy_intervals(provider_id, date).await?;

        Ok(SlotGenerator::generate(template, policy, date, local_now, &busy)?)
    }

    async fn insert_with_retry(&self, booking: NewAppointment) -> Result<Appointment, AppointmentError> {
        let attempts = self.settings.max_retries + 1;

        for attempt in 1..=attempts {
            debug!(
                "Booking attempt {}/{} for {} at {}",
                attempt, attempts, booking.scheduled_date, booking.start_time
            );

            let outcome =
                tokio::time::timeout(self.settings.transaction_timeout, self.ledger.insert(booking.clone()))
                    .await;

            match outcome {
                Ok(Ok(appointment)) => return Ok(appointment),
                Ok(Err(LedgerError::Overlap(detail))) => {
                    info!("Lost booking race for {} at {}: {}", booking.scheduled_date, booking.start_time, detail);
                    return Err(AppointmentError::SlotUnavailable(detail));
                }
                Ok(Err(LedgerError::Transient(detail))) => {
                    warn!("Transient booking failure, attempt {}/{}: {}", attempt, attempts, detail);
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                    }
                }
                Ok(Err(other)) => return Err(other.into()),
                Err(_) => {
                    warn!(
                        "Booking for {} at {} timed out after {:?}",
                        booking.scheduled_date, booking.start_time, self.settings.transaction_timeout
                    );
                    return Err(AppointmentError::SlotUnavailable(
                        "booking transaction timed out".to_string(),
                    ));
                }
            }
        }

        Err(AppointmentError::SlotUnavailable(format!(
            "booking gave up after {} attempts",
            attempts
        )))
    }
}

