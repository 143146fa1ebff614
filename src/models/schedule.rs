use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Map a native weekday number (0=Sunday..6=Saturday) to ISO numbering
/// (1=Monday..7=Sunday). Every weekday-membership test goes through this.
pub fn iso_weekday_from_native(native: u32) -> u8 {
    (((native + 6) % 7) + 1) as u8
}

/// ISO weekday (1=Monday..7=Sunday) of a calendar date.
pub fn iso_weekday(date: NaiveDate) -> u8 {
    iso_weekday_from_native(date.weekday().num_days_from_sunday())
}

// A bookable service offered by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
    pub price: f64,
}

// Working hours for a single weekday
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub enabled: bool,
    pub start_time: String,
    pub end_time: String,
}

/// Weekly working-hours schedule, keyed by ISO weekday (1=Monday..7=Sunday).
///
/// Owned by the provider backend; this core only reads it. A weekday with no
/// entry is treated the same as a disabled one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub days: HashMap<u8, DaySchedule>,
}

impl WeeklySchedule {
    /// Look up the schedule entry for a calendar date.
    pub fn entry_for(&self, date: NaiveDate) -> Option<&DaySchedule> {
        self.days.get(&iso_weekday(date))
    }
}

// Weekly-repeating unavailable window (e.g. lunch break on Mon/Wed/Fri)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringBreak {
    pub days_of_week: Vec<u8>,
    pub start_time: String,
    pub end_time: String,
}

// One-off unavailable window on a specific calendar day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBlock {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub title: String,
}
