// libs/availability-cell/src/services/slots.rs
//
// Expansion of one day of a provider's template into its grid of slots.
// Everything here is pure: callers supply the template, the policy, the
// provider-local "now" and the busy intervals read from the ledger.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use shared_utils::parse::{minutes_since_midnight, time_from_minutes};

use crate::models::{
    AvailabilityError, BusyInterval, DaySchedule, ProviderSchedulingPolicy, Slot, SlotBlock,
};

/// Half-open interval overlap: `[a_start, a_end)` against `[b_start, b_end)`.
pub fn intervals_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

pub struct SlotGenerator;

impl SlotGenerator {
    /// Produce the ordered slot list for `date`.
    ///
    /// `local_now` is the current wall-clock time in the provider's time zone. Slots on
    /// that date starting at or before it are marked elapsed; every slot of an earlier
    /// date is elapsed. `booked` holds the active appointments of the same day.
    pub fn generate(
        day: &DaySchedule,
        policy: &ProviderSchedulingPolicy,
        date: NaiveDate,
        local_now: NaiveDateTime,
        booked: &[BusyInterval],
    ) -> Result<Vec<Slot>, AvailabilityError> {
        if !day.is_enabled {
            return Ok(Vec::new());
        }

        Self::check_template(day, policy)?;

        let window_start = minutes_since_midnight(day.start_time);
        let window_end = minutes_since_midnight(day.end_time);
        let duration = policy.slot_duration_minutes;
        let step = policy.step_minutes();

        let mut slots = Vec::new();
        let mut cursor = window_start;

        while cursor + duration <= window_end {
            let start_time = Self::to_time(cursor)?;
            let end_time = Self::to_time(cursor + duration)?;
            cursor += step;

            // Any overlap with the break voids the slot outright.
            if let Some((break_start, break_end)) = day.break_window() {
                if intervals_overlap(start_time, end_time, break_start, break_end) {
                    continue;
                }
            }

            let blocked_by = Self::block_reason(date, local_now, booked, start_time, end_time);

            slots.push(Slot {
                start_time,
                end_time,
                available: blocked_by.is_none(),
                blocked_by,
            });
        }

        debug!(
            "Generated {} slots for {} ({} available)",
            slots.len(),
            date,
            slots.iter().filter(|s| s.available).count()
        );

        Ok(slots)
    }

    /// Locate the slot starting exactly at `start_time`, if the grid has one.
    pub fn find(slots: &[Slot], start_time: NaiveTime) -> Option<&Slot> {
        slots.iter().find(|slot| slot.start_time == start_time)
    }

    fn block_reason(
        date: NaiveDate,
        local_now: NaiveDateTime,
        booked: &[BusyInterval],
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Option<SlotBlock> {
        if booked
            .iter()
            .any(|busy| intervals_overlap(start_time, end_time, busy.start_time, busy.end_time))
        {
            return Some(SlotBlock::Booked);
        }

        let today = local_now.date();
        if date < today || (date == today && start_time <= local_now.time()) {
            return Some(SlotBlock::Elapsed);
        }

        None
    }

    /// Templates are validated on write; anything malformed reaching this point is a
    /// broken contract and must not produce slots.
    fn check_template(
        day: &DaySchedule,
        policy: &ProviderSchedulingPolicy,
    ) -> Result<(), AvailabilityError> {
        if policy.slot_duration_minutes == 0 || policy.step_minutes() == 0 {
            return Err(AvailabilityError::Configuration(format!(
                "provider {} has a zero slot duration",
                policy.provider_id
            )));
        }

        if day.start_time > day.end_time {
            return Err(AvailabilityError::Configuration(format!(
                "{} template ends before it starts",
                day.day_of_week
            )));
        }

        day.check_break().map_err(|reason| {
            AvailabilityError::Configuration(format!("{} template: {}", day.day_of_week, reason))
        })
    }

    fn to_time(minutes: u32) -> Result<NaiveTime, AvailabilityError> {
        time_from_minutes(minutes).ok_or_else(|| {
            AvailabilityError::Configuration(format!("slot boundary {} is past midnight", minutes))
        })
    }
}
