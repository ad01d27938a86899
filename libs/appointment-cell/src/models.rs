// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use availability_cell::models::{AvailabilityError, BusyInterval, Slot};
use shared_models::error::AppError;

// ==============================================================================
// APPOINTMENT STATUS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 7] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::CheckedIn,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::CheckedIn => "checked_in",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Active appointments occupy their interval on the provider's calendar.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending
                | AppointmentStatus::Confirmed
                | AppointmentStatus::CheckedIn
                | AppointmentStatus::InProgress
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| format!("unknown appointment status '{}'", value))
    }
}

// ==============================================================================
// APPOINTMENT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn interval(&self) -> BusyInterval {
        BusyInterval {
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// A booking that has passed slot validation and is ready for the atomic insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub provider_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
}

/// One entry of an appointment's audit trail. `from_status` is empty for the insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    pub appointment_id: Uuid,
    pub from_status: Option<AppointmentStatus>,
    pub to_status: AppointmentStatus,
    pub changed_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub provider_id: String,
    pub patient_id: String,
    pub date: String,
    pub start_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub expected_status: String,
    pub new_status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListAppointmentsQuery {
    pub provider_id: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityResponse {
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub timezone: String,
    pub slot_duration_minutes: u32,
    pub buffer_minutes: u32,
    pub closed: bool,
    pub slots: Vec<Slot>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scheduling configuration error: {0}")]
    Configuration(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment is {actual}, not {expected}")]
    StaleState {
        expected: AppointmentStatus,
        actual: AppointmentStatus,
    },

    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<AvailabilityError> for AppointmentError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::Validation(msg) => AppointmentError::Validation(msg),
            AvailabilityError::Configuration(msg) => AppointmentError::Configuration(msg),
            AvailabilityError::NotFound(msg) => AppointmentError::NotFound(msg),
            AvailabilityError::Database(msg) => AppointmentError::Database(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::Configuration(msg) => AppError::Configuration(msg),
            AppointmentError::SlotUnavailable(msg) => AppError::SlotUnavailable(msg),
            err @ AppointmentError::InvalidTransition { .. } => AppError::InvalidTransition(err.to_string()),
            err @ AppointmentError::StaleState { .. } => AppError::StaleState(err.to_string()),
            AppointmentError::NotFound(msg) => AppError::NotFound(msg),
            AppointmentError::Database(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_round_trip() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.as_str().parse::<AppointmentStatus>(), Ok(status));
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.to_string()));
        }
        assert!("done".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_active_and_terminal_partition_the_states() {
        for status in AppointmentStatus::ALL {
            assert_ne!(status.is_active(), status.is_terminal(), "{}", status);
        }
    }

    #[test]
    fn test_error_mapping_to_app_error() {
        let err: AppError = AppointmentError::StaleState {
            expected: AppointmentStatus::Pending,
            actual: AppointmentStatus::Cancelled,
        }
        .into();
        assert_eq!(err.kind(), "stale_state");
        assert!(err.to_string().contains("cancelled"));

        let err: AppError = AppointmentError::SlotUnavailable("taken".into()).into();
        assert_eq!(err.kind(), "slot_unavailable");
    }
}
