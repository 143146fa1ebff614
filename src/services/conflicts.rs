use chrono::{NaiveDate, Timelike};
use chrono_tz::Tz;
use tracing::warn;

use crate::models::appointment::{Appointment, AppointmentStatus};
use crate::models::schedule::{RecurringBreak, TimeBlock};

pub use crate::models::schedule::{iso_weekday, iso_weekday_from_native};

/// Conflict intervals for one calendar day, split by source.
///
/// Each interval is `(start, end)` in minutes since local midnight and is
/// half-open: the end minute itself is free again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayConflicts {
    pub appointments: Vec<(u32, u32)>,
    pub time_blocks: Vec<(u32, u32)>,
    pub recurring_breaks: Vec<(u32, u32)>,
}

impl DayConflicts {
    /// Iterate every interval from every source.
    pub fn intervals(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.appointments
            .iter()
            .chain(self.time_blocks.iter())
            .chain(self.recurring_breaks.iter())
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
            && self.time_blocks.is_empty()
            && self.recurring_breaks.is_empty()
    }
}

/// Parse a 24h `HH:MM` string into minutes since midnight.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let (hours, minutes) = value.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Format minutes since midnight as 24h `HH:MM`.
pub fn format_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Normalize the three conflict sources into day-scoped minute intervals.
///
/// Appointment instants are rendered in the provider timezone before the day
/// comparison; a 23:30 UTC appointment belongs to the next local day in
/// UTC+2. Cancelled appointments never count. Pure function of its inputs.
pub fn day_conflicts(
    date: NaiveDate,
    tz: Tz,
    appointments: &[Appointment],
    time_blocks: &[TimeBlock],
    recurring_breaks: &[RecurringBreak],
) -> DayConflicts {
    let day_key = date.format("%Y-%m-%d").to_string();
    let weekday = iso_weekday(date);

    let mut conflicts = DayConflicts::default();

    for appointment in appointments {
        if appointment.status != AppointmentStatus::Confirmed {
            continue;
        }
        let local = appointment.start_time.with_timezone(&tz);
        if local.format("%Y-%m-%d").to_string() != day_key {
            continue;
        }
        let start = local.hour() * 60 + local.minute();
        conflicts
            .appointments
            .push((start, start + appointment.duration_minutes));
    }

    for block in time_blocks {
        if block.date != day_key {
            continue;
        }
        match (parse_hhmm(&block.start_time), parse_hhmm(&block.end_time)) {
            (Some(start), Some(end)) if start < end => {
                conflicts.time_blocks.push((start, end));
            }
            _ => {
                warn!(
                    "Skipping time block '{}' on {} with malformed window {}-{}",
                    block.title, block.date, block.start_time, block.end_time
                );
            }
        }
    }

    for recurring in recurring_breaks {
        if !recurring.days_of_week.contains(&weekday) {
            continue;
        }
        match (
            parse_hhmm(&recurring.start_time),
            parse_hhmm(&recurring.end_time),
        ) {
            (Some(start), Some(end)) if start < end => {
                conflicts.recurring_breaks.push((start, end));
            }
            _ => {
                warn!(
                    "Skipping recurring break with malformed window {}-{}",
                    recurring.start_time, recurring.end_time
                );
            }
        }
    }

    conflicts
}
