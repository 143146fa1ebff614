use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::debug;

use crate::models::appointment::{Appointment, Slot};
use crate::models::schedule::{DaySchedule, RecurringBreak, TimeBlock, WeeklySchedule};
use crate::services::conflicts::{day_conflicts, format_hhmm, parse_hhmm, DayConflicts};

/// Candidate start times step forward by this many minutes.
pub const SLOT_GRANULARITY_MINUTES: u32 = 15;

/// Half-open interval overlap: `[a0,a1)` and `[b0,b1)` overlap iff
/// `a0 < b1 && b0 < a1`. Intervals that merely touch at an endpoint do not.
fn overlaps(a0: u32, a1: u32, b0: u32, b1: u32) -> bool {
    a0 < b1 && b0 < a1
}

/// Compute the bookable start times for one calendar day.
///
/// This is the read-side entry point of the scheduling core: it aggregates
/// the three conflict sources for the day and walks the working-hours window.
/// The caller must validate `duration_minutes > 0` before invoking; the
/// calculator never defaults a malformed duration.
pub fn compute_availability(
    date: NaiveDate,
    duration_minutes: u32,
    schedule: &WeeklySchedule,
    appointments: &[Appointment],
    time_blocks: &[TimeBlock],
    recurring_breaks: &[RecurringBreak],
    tz: Tz,
) -> Vec<Slot> {
    let conflicts = day_conflicts(date, tz, appointments, time_blocks, recurring_breaks);
    match schedule.entry_for(date) {
        Some(entry) => day_slots(date, duration_minutes, entry, &conflicts),
        None => Vec::new(),
    }
}

/// Walk one day's working-hours window and keep every conflict-free slot.
///
/// Output is ascending and duplicate-free by construction: candidates are
/// generated in increasing order, one per granularity step.
pub fn day_slots(
    date: NaiveDate,
    duration_minutes: u32,
    entry: &DaySchedule,
    conflicts: &DayConflicts,
) -> Vec<Slot> {
    if !entry.enabled {
        return Vec::new();
    }

    let (day_start, day_end) = match (parse_hhmm(&entry.start_time), parse_hhmm(&entry.end_time)) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            debug!(
                "Day schedule for {} has malformed window {}-{}, treating as closed",
                date, entry.start_time, entry.end_time
            );
            return Vec::new();
        }
    };

    let date_key = date.format("%Y-%m-%d").to_string();
    let mut slots = Vec::new();

    let mut candidate = day_start;
    while candidate + duration_minutes <= day_end {
        let candidate_end = candidate + duration_minutes;
        let blocked = conflicts
            .intervals()
            .any(|(start, end)| overlaps(candidate, candidate_end, start, end));

        if !blocked {
            slots.push(Slot {
                date: date_key.clone(),
                start_time: format_hhmm(candidate),
            });
        }

        candidate += SLOT_GRANULARITY_MINUTES;
    }

    debug!(
        "Computed {} available slots for {} (duration {} mins)",
        slots.len(),
        date,
        duration_minutes
    );

    slots
}
