// libs/availability-cell/src/services/availability.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use shared_utils::parse::MINUTES_PER_DAY;

use crate::models::{
    AvailabilityClosure, AvailabilityError, DayOfWeek, DaySchedule, ProviderSchedulingPolicy,
    SetClosureRequest, SetSchedulingPolicyRequest, SetWeeklyScheduleRequest, WeeklySchedule,
};
use crate::services::repository::{AvailabilityRepository, InMemoryAvailabilityRepository};
use crate::services::supabase::SupabaseAvailabilityRepository;

pub struct AvailabilityService {
    repository: Arc<dyn AvailabilityRepository>,
    default_timezone: String,
}

impl AvailabilityService {
    pub fn new(repository: Arc<dyn AvailabilityRepository>, default_timezone: impl Into<String>) -> Self {
        Self {
            repository,
            default_timezone: default_timezone.into(),
        }
    }

    /// Pick the storage backend named by the configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let repository: Arc<dyn AvailabilityRepository> = match config.storage_backend {
            StorageBackend::Memory => Arc::new(InMemoryAvailabilityRepository::new()),
            StorageBackend::Supabase => Arc::new(SupabaseAvailabilityRepository::new(Arc::new(
                SupabaseClient::new(config),
            ))),
        };
        Self::new(repository, config.default_provider_timezone.clone())
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryAvailabilityRepository::new()), "UTC")
    }

    /// Validate and store a provider's full week. One bad day rejects the whole batch.
    #[instrument(skip(self, request))]
    pub async fn set_weekly_schedule(
        &self,
        provider_id: Uuid,
        request: SetWeeklyScheduleRequest,
    ) -> Result<WeeklySchedule, AvailabilityError> {
        debug!("Setting weekly schedule for provider {}", provider_id);

        let days = Self::validate_week(&request)?;
        let week = self.repository.replace_week(provider_id, days).await?;

        info!(
            "Weekly schedule saved for provider {} ({} enabled days)",
            provider_id,
            week.days.iter().filter(|d| d.is_enabled).count()
        );
        Ok(week)
    }

    pub async fn get_weekly_schedule(&self, provider_id: Uuid) -> Result<WeeklySchedule, AvailabilityError> {
        self.repository
            .get_week(provider_id)
            .await?
            .ok_or_else(|| AvailabilityError::NotFound(format!("no weekly schedule for provider {}", provider_id)))
    }

    pub async fn get_day_schedule(
        &self,
        provider_id: Uuid,
        day_of_week: DayOfWeek,
    ) -> Result<DaySchedule, AvailabilityError> {
        self.find_day_schedule(provider_id, day_of_week)
            .await?
            .ok_or_else(|| {
                AvailabilityError::NotFound(format!("no {} schedule for provider {}", day_of_week, provider_id))
            })
    }

    /// The template row for one weekday, or `None` when the provider never saved a week.
    pub async fn find_day_schedule(
        &self,
        provider_id: Uuid,
        day_of_week: DayOfWeek,
    ) -> Result<Option<DaySchedule>, AvailabilityError> {
        let week = self.repository.get_week(provider_id).await?;
        Ok(week.and_then(|week| week.day(day_of_week).cloned()))
    }

    #[instrument(skip(self, request))]
    pub async fn set_scheduling_policy(
        &self,
        provider_id: Uuid,
        request: SetSchedulingPolicyRequest,
    ) -> Result<ProviderSchedulingPolicy, AvailabilityError> {
        let existing = self.repository.get_policy(provider_id).await?;

        let slot_duration_minutes = Self::validate_minutes(
            "slot_duration_minutes",
            request.slot_duration_minutes,
            1,
        )?;
        let buffer_minutes = Self::validate_minutes("buffer_minutes", request.buffer_minutes, 0)?;

        let timezone = request
            .timezone
            .or_else(|| existing.as_ref().map(|p| p.timezone.clone()))
            .unwrap_or_else(|| self.default_timezone.clone());
        if timezone.parse::<Tz>().is_err() {
            return Err(AvailabilityError::Validation(format!("unknown timezone '{}'", timezone)));
        }

        let auto_confirm = request
            .auto_confirm
            .or_else(|| existing.as_ref().map(|p| p.auto_confirm))
            .unwrap_or(false);

        let policy = ProviderSchedulingPolicy {
            provider_id,
            slot_duration_minutes,
            buffer_minutes,
            auto_confirm,
            timezone,
            updated_at: Utc::now(),
        };

        let saved = self.repository.upsert_policy(policy).await?;
        info!(
            "Scheduling policy saved for provider {}: {}min slots, {}min buffer",
            provider_id, saved.slot_duration_minutes, saved.buffer_minutes
        );
        Ok(saved)
    }

    pub async fn get_scheduling_policy(
        &self,
        provider_id: Uuid,
    ) -> Result<ProviderSchedulingPolicy, AvailabilityError> {
        self.find_scheduling_policy(provider_id)
            .await?
            .ok_or_else(|| AvailabilityError::NotFound(format!("no scheduling policy for provider {}", provider_id)))
    }

    pub async fn find_scheduling_policy(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<ProviderSchedulingPolicy>, AvailabilityError> {
        self.repository.get_policy(provider_id).await
    }

    /// Close a single date (vacation, sick day). Existing bookings are left untouched.
    pub async fn set_closure(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        request: SetClosureRequest,
    ) -> Result<AvailabilityClosure, AvailabilityError> {
        let closure = AvailabilityClosure {
            provider_id,
            closure_date: date,
            reason: request.reason.filter(|r| !r.trim().is_empty()),
            created_at: Utc::now(),
        };

        let saved = self.repository.upsert_closure(closure).await?;
        info!("Provider {} closed on {}", provider_id, date);
        Ok(saved)
    }

    pub async fn remove_closure(&self, provider_id: Uuid, date: NaiveDate) -> Result<(), AvailabilityError> {
        if self.repository.delete_closure(provider_id, date).await? {
            info!("Provider {} reopened on {}", provider_id, date);
            Ok(())
        } else {
            Err(AvailabilityError::NotFound(format!("provider {} has no closure on {}", provider_id, date)))
        }
    }

    pub async fn get_closure(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityClosure>, AvailabilityError> {
        self.repository.get_closure(provider_id, date).await
    }

    fn validate_week(request: &SetWeeklyScheduleRequest) -> Result<Vec<DaySchedule>, AvailabilityError> {
        if request.week.len() != DayOfWeek::ALL.len() {
            return Err(AvailabilityError::Validation(format!(
                "week must contain exactly 7 day entries, got {}",
                request.week.len()
            )));
        }

        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        let mut days = Vec::with_capacity(request.week.len());

        for (index, input) in request.week.iter().enumerate() {
            let day = match input.parse() {
                Ok(day) => day,
                Err(reason) => {
                    problems.push(format!("entry {}: {}", index, reason));
                    continue;
                }
            };

            if !seen.insert(day.day_of_week) {
                problems.push(format!("{}: listed more than once", day.day_of_week));
                continue;
            }

            if let Err(reason) = day.validate() {
                problems.push(format!("{}: {}", day.day_of_week, reason));
                continue;
            }

            days.push(day);
        }

        if !problems.is_empty() {
            warn!("Rejected weekly schedule: {}", problems.join("; "));
            return Err(AvailabilityError::Validation(problems.join("; ")));
        }

        Ok(days)
    }

    fn validate_minutes(field: &str, value: i64, min: i64) -> Result<u32, AvailabilityError> {
        if value < min || value > MINUTES_PER_DAY as i64 {
            return Err(AvailabilityError::Validation(format!(
                "{} must be between {} and {}, got {}",
                field, min, MINUTES_PER_DAY, value
            )));
        }
        Ok(value as u32)
    }
}
