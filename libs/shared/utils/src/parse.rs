// Parsing of loosely typed request fields into the engine's strong types.
// Errors are plain strings; each cell wraps them in its own validation variant.
use chrono::{NaiveDate, NaiveTime, Timelike};
use uuid::Uuid;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

pub fn parse_uuid(value: &str, field: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value.trim())
        .map_err(|_| format!("{} must be a UUID, got '{}'", field, value))
}

/// Calendar date in `YYYY-MM-DD` form.
pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("{} must be a date in YYYY-MM-DD format, got '{}'", field, value))
}

/// Time of day at minute precision: `HH:MM`, or `HH:MM:SS` with zero seconds.
pub fn parse_time_of_day(value: &str, field: &str) -> Result<NaiveTime, String> {
    let trimmed = value.trim();
    if trimmed == "24:00" || trimmed == "24:00:00" {
        return Err(format!("{} cannot be 24:00; the latest time of day is 23:59", field));
    }

    let parsed = NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| format!("{} must be a time in HH:MM format, got '{}'", field, value))?;

    if parsed.second() != 0 || parsed.nanosecond() != 0 {
        return Err(format!("{} must have minute precision, got '{}'", field, value));
    }

    Ok(parsed)
}

pub fn minutes_since_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Inverse of [`minutes_since_midnight`]; `None` at or past midnight.
pub fn time_from_minutes(minutes: u32) -> Option<NaiveTime> {
    if minutes >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("09:30", "t"), Ok(NaiveTime::from_hms_opt(9, 30, 0).unwrap()));
        assert_eq!(parse_time_of_day("17:00:00", "t"), Ok(NaiveTime::from_hms_opt(17, 0, 0).unwrap()));
        assert!(parse_time_of_day("17:00:30", "t").is_err());
        assert!(parse_time_of_day("25:00", "t").is_err());
        assert!(parse_time_of_day("24:00", "end_time").unwrap_err().contains("23:59"));
        assert!(parse_time_of_day("nine", "t").is_err());
    }

    #[test]
    fn test_parse_date_and_uuid() {
        assert_eq!(parse_date("2025-06-16", "date"), Ok(NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()));
        assert!(parse_date("16/06/2025", "date").is_err());
        assert!(parse_uuid("not-a-uuid", "provider_id").is_err());
    }

    #[test]
    fn test_minute_conversions() {
        let t = NaiveTime::from_hms_opt(13, 45, 0).unwrap();
        assert_eq!(minutes_since_midnight(t), 825);
        assert_eq!(time_from_minutes(825), Some(t));
        assert_eq!(time_from_minutes(MINUTES_PER_DAY), None);
    }
}
