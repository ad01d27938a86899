// libs/availability-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::parse::parse_time_of_day;

// ==============================================================================
// WEEKLY TEMPLATE
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(DayOfWeek::Monday),
            "tuesday" | "tue" => Ok(DayOfWeek::Tuesday),
            "wednesday" | "wed" => Ok(DayOfWeek::Wednesday),
            "thursday" | "thu" => Ok(DayOfWeek::Thursday),
            "friday" | "fri" => Ok(DayOfWeek::Friday),
            "saturday" | "sat" => Ok(DayOfWeek::Saturday),
            "sunday" | "sun" => Ok(DayOfWeek::Sunday),
            other => Err(format!("unknown day_of_week '{}'", other)),
        }
    }
}

/// One day of a provider's recurring week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySchedule {
    pub day_of_week: DayOfWeek,
    pub is_enabled: bool,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
}

impl DaySchedule {
    /// Check the row invariants: minute precision, `start < end`, and a break that is
    /// either absent or fully inside the working window.
    pub fn validate(&self) -> Result<(), String> {
        let times = [Some(self.start_time), Some(self.end_time), self.break_start, self.break_end];
        if times.iter().flatten().any(|t| !is_minute_precise(*t)) {
            return Err("times must have minute precision".to_string());
        }

        if self.start_time >= self.end_time {
            return Err("start_time must be before end_time".to_string());
        }

        self.check_break()
    }

    /// Break bounds as `(start, end)` when both are set.
    pub fn break_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.break_start, self.break_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub(crate) fn check_break(&self) -> Result<(), String> {
        match (self.break_start, self.break_end) {
            (None, None) => Ok(()),
            (Some(start), Some(end)) => {
                if start >= end {
                    Err("break_start must be before break_end".to_string())
                } else if start < self.start_time || end > self.end_time {
                    Err("break must lie within working hours".to_string())
                } else {
                    Ok(())
                }
            }
            _ => Err("break_start and break_end must be set together".to_string()),
        }
    }
}

fn is_minute_precise(time: NaiveTime) -> bool {
    time.second() == 0 && time.nanosecond() == 0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub provider_id: Uuid,
    pub days: Vec<DaySchedule>,
    pub updated_at: DateTime<Utc>,
}

impl WeeklySchedule {
    pub fn day(&self, day_of_week: DayOfWeek) -> Option<&DaySchedule> {
        self.days.iter().find(|day| day.day_of_week == day_of_week)
    }
}

/// Storage shape: one row per (provider, day).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDayRow {
    pub provider_id: Uuid,
    #[serde(flatten)]
    pub schedule: DaySchedule,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// SCHEDULING POLICY
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSchedulingPolicy {
    pub provider_id: Uuid,
    pub slot_duration_minutes: u32,
    pub buffer_minutes: u32,
    pub auto_confirm: bool,
    pub timezone: String,
    pub updated_at: DateTime<Utc>,
}

impl ProviderSchedulingPolicy {
    /// Distance between the starts of two consecutive slots.
    pub fn step_minutes(&self) -> u32 {
        self.slot_duration_minutes + self.buffer_minutes
    }

    pub fn tz(&self) -> Result<Tz, AvailabilityError> {
        self.timezone.parse::<Tz>().map_err(|_| {
            AvailabilityError::Configuration(format!(
                "provider {} has unknown timezone '{}'",
                self.provider_id, self.timezone
            ))
        })
    }
}

// ==============================================================================
// CLOSURES
// ==============================================================================

/// A single date on which the provider takes no bookings (vacation, sick day).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityClosure {
    pub provider_id: Uuid,
    pub closure_date: NaiveDate,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// SLOTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotBlock {
    Elapsed,
    Booked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<SlotBlock>,
}

/// Half-open `[start, end)` interval already taken on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyInterval {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// A day entry as sent by provider-facing clients; parsed into [`DaySchedule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayScheduleInput {
    pub day_of_week: String,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    pub start_time: String,
    pub end_time: String,
    pub break_start: Option<String>,
    pub break_end: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl DayScheduleInput {
    pub fn parse(&self) -> Result<DaySchedule, String> {
        let day_of_week = self.day_of_week.parse::<DayOfWeek>()?;
        let optional_time = |value: &Option<String>, field: &str| {
            value.as_deref().map(|v| parse_time_of_day(v, field)).transpose()
        };

        Ok(DaySchedule {
            day_of_week,
            is_enabled: self.is_enabled,
            start_time: parse_time_of_day(&self.start_time, "start_time")?,
            end_time: parse_time_of_day(&self.end_time, "end_time")?,
            break_start: optional_time(&self.break_start, "break_start")?,
            break_end: optional_time(&self.break_end, "break_end")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetWeeklyScheduleRequest {
    pub week: Vec<DayScheduleInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSchedulingPolicyRequest {
    pub slot_duration_minutes: i64,
    pub buffer_minutes: i64,
    pub auto_confirm: Option<bool>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SetClosureRequest {
    pub reason: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scheduling configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DatabaseError> for AvailabilityError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => AvailabilityError::NotFound(msg),
            other => AvailabilityError::Database(other.to_string()),
        }
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::Validation(msg) => AppError::ValidationError(msg),
            AvailabilityError::Configuration(msg) => AppError::Configuration(msg),
            AvailabilityError::NotFound(msg) => AppError::NotFound(msg),
            AvailabilityError::Database(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day(start: NaiveTime, end: NaiveTime, brk: Option<(NaiveTime, NaiveTime)>) -> DaySchedule {
        DaySchedule {
            day_of_week: DayOfWeek::Monday,
            is_enabled: true,
            start_time: start,
            end_time: end,
            break_start: brk.map(|b| b.0),
            break_end: brk.map(|b| b.1),
        }
    }

    #[test]
    fn test_day_of_week_from_weekday_and_str() {
        assert_eq!(DayOfWeek::from(Weekday::Mon), DayOfWeek::Monday);
        assert_eq!(DayOfWeek::from(Weekday::Sun), DayOfWeek::Sunday);
        assert_eq!("Tue".parse::<DayOfWeek>(), Ok(DayOfWeek::Tuesday));
        assert!("funday".parse::<DayOfWeek>().is_err());
    }

    #[test]
    fn test_day_schedule_validation() {
        assert!(day(time(9, 0), time(18, 0), Some((time(13, 0), time(14, 0)))).validate().is_ok());
        assert!(day(time(9, 0), time(18, 0), Some((time(9, 0), time(18, 0)))).validate().is_ok());
        assert!(day(time(9, 0), time(9, 0), None).validate().is_err());
        assert!(day(time(10, 0), time(9, 0), None).validate().is_err());
        assert!(day(time(9, 0), time(18, 0), Some((time(8, 0), time(10, 0)))).validate().is_err());
        assert!(day(time(9, 0), time(18, 0), Some((time(14, 0), time(13, 0)))).validate().is_err());

        let mut half_break = day(time(9, 0), time(18, 0), None);
        half_break.break_start = Some(time(12, 0));
        assert!(half_break.validate().is_err());

        let seconds = day(NaiveTime::from_hms_opt(9, 0, 30).unwrap(), time(18, 0), None);
        assert!(seconds.validate().is_err());
    }

    #[test]
    fn test_day_schedule_input_parse() {
        let input = DayScheduleInput {
            day_of_week: "monday".to_string(),
            is_enabled: true,
            start_time: "09:00".to_string(),
            end_time: "18:00".to_string(),
            break_start: Some("13:00".to_string()),
            break_end: Some("14:00".to_string()),
        };
        let parsed = input.parse().unwrap();
        assert_eq!(parsed.break_window(), Some((time(13, 0), time(14, 0))));

        let bad = DayScheduleInput { start_time: "9am".to_string(), ..input };
        assert!(bad.parse().is_err());
    }

    #[test]
    fn test_policy_timezone() {
        let mut policy = ProviderSchedulingPolicy {
            provider_id: Uuid::new_v4(),
            slot_duration_minutes: 30,
            buffer_minutes: 10,
            auto_confirm: false,
            timezone: "America/New_York".to_string(),
            updated_at: Utc::now(),
        };
        assert_eq!(policy.step_minutes(), 40);
        assert!(policy.tz().is_ok());

        policy.timezone = "Mars/Olympus".to_string();
        assert!(matches!(policy.tz(), Err(AvailabilityError::Configuration(_))));
    }
}
