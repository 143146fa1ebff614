#[cfg(test)]
mod availability_tests {
    use std::collections::HashMap;

    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::models::appointment::{Appointment, AppointmentStatus};
    use crate::models::schedule::{DaySchedule, RecurringBreak, TimeBlock, WeeklySchedule};
    use crate::services::availability::compute_availability;

    // 2025-06-16 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    fn schedule_for(day: u8, enabled: bool, start: &str, end: &str) -> WeeklySchedule {
        let mut days = HashMap::new();
        days.insert(
            day,
            DaySchedule {
                enabled,
                start_time: start.to_string(),
                end_time: end.to_string(),
            },
        );
        WeeklySchedule { days }
    }

    fn booked(hour: u32, minute: u32, duration: u32) -> Appointment {
        let start = Utc
            .with_ymd_and_hms(2025, 6, 16, hour, minute, 0)
            .unwrap();
        Appointment {
            id: format!("apt-{:02}{:02}", hour, minute),
            provider_id: "prov-1".to_string(),
            service_id: "svc-1".to_string(),
            client_name: "Alice".to_string(),
            client_contact: "+15550001".to_string(),
            start_time: start,
            date: "2025-06-16".to_string(),
            time: format!("{:02}:{:02}", hour, minute),
            duration_minutes: duration,
            status: AppointmentStatus::Confirmed,
        }
    }

    fn starts(slots: &[crate::models::appointment::Slot]) -> Vec<String> {
        slots.iter().map(|s| s.start_time.clone()).collect()
    }

    #[test]
    fn test_morning_window_with_one_booked_hour() {
        // Working hours 09:00-12:00, 60-minute service, existing appointment
        // 10:00-11:00. Every candidate from 09:15 through 10:45 overlaps the
        // appointment; 09:00-10:00 touches it and 11:00-12:00 fits exactly.
        let schedule = schedule_for(1, true, "09:00", "12:00");
        let appointments = vec![booked(10, 0, 60)];

        let slots = compute_availability(
            monday(),
            60,
            &schedule,
            &appointments,
            &[],
            &[],
            chrono_tz::UTC,
        );

        assert_eq!(starts(&slots), vec!["09:00", "11:00"]);
        assert!(slots.iter().all(|s| s.date == "2025-06-16"));
    }

    #[test]
    fn test_shorter_service_fills_the_gaps() {
        // Same day, 15-minute service: everything except the booked hour.
        let schedule = schedule_for(1, true, "09:00", "12:00");
        let appointments = vec![booked(10, 0, 60)];

        let slots = compute_availability(
            monday(),
            15,
            &schedule,
            &appointments,
            &[],
            &[],
            chrono_tz::UTC,
        );

        assert_eq!(
            starts(&slots),
            vec![
                "09:00", "09:15", "09:30", "09:45", "11:00", "11:15", "11:30", "11:45"
            ]
        );
    }

    #[test]
    fn test_disabled_day_is_empty_regardless_of_conflicts() {
        let schedule = schedule_for(1, false, "09:00", "12:00");

        let slots = compute_availability(monday(), 30, &schedule, &[], &[], &[], chrono_tz::UTC);
        assert!(slots.is_empty());

        // Conflicts do not matter on a disabled day
        let appointments = vec![booked(10, 0, 60)];
        let slots = compute_availability(
            monday(),
            30,
            &schedule,
            &appointments,
            &[],
            &[],
            chrono_tz::UTC,
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn test_day_without_schedule_entry_is_empty() {
        // Entry exists only for Tuesday; Monday has none.
        let schedule = schedule_for(2, true, "09:00", "12:00");

        let slots = compute_availability(monday(), 30, &schedule, &[], &[], &[], chrono_tz::UTC);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_touching_block_does_not_conflict() {
        // A slot ending exactly when a block starts is bookable.
        let schedule = schedule_for(1, true, "09:00", "12:00");
        let blocks = vec![TimeBlock {
            date: "2025-06-16".to_string(),
            start_time: "10:00".to_string(),
            end_time: "11:00".to_string(),
            title: "Errand".to_string(),
        }];

        let slots =
            compute_availability(monday(), 60, &schedule, &[], &blocks, &[], chrono_tz::UTC);

        let starts = starts(&slots);
        assert!(starts.contains(&"09:00".to_string())); // ends 10:00, touches
        assert!(starts.contains(&"11:00".to_string())); // starts as block ends
        assert!(!starts.contains(&"09:15".to_string()));
        assert!(!starts.contains(&"10:45".to_string()));
    }

    #[test]
    fn test_duration_longer_than_window_is_empty() {
        let schedule = schedule_for(1, true, "09:00", "12:00");

        let slots = compute_availability(monday(), 240, &schedule, &[], &[], &[], chrono_tz::UTC);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_exact_fit_window() {
        let schedule = schedule_for(1, true, "09:00", "10:00");

        let slots = compute_availability(monday(), 60, &schedule, &[], &[], &[], chrono_tz::UTC);
        assert_eq!(starts(&slots), vec!["09:00"]);
    }

    #[test]
    fn test_output_is_strictly_ascending_and_unique() {
        let schedule = schedule_for(1, true, "08:00", "18:00");
        let appointments = vec![booked(9, 30, 45), booked(13, 0, 90)];
        let lunch = RecurringBreak {
            days_of_week: vec![1],
            start_time: "12:00".to_string(),
            end_time: "12:30".to_string(),
        };

        let slots = compute_availability(
            monday(),
            30,
            &schedule,
            &appointments,
            &[],
            std::slice::from_ref(&lunch),
            chrono_tz::UTC,
        );

        let starts = starts(&slots);
        for pair in starts.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_recurring_break_only_blocks_member_weekdays() {
        let lunch = RecurringBreak {
            days_of_week: vec![1],
            start_time: "12:00".to_string(),
            end_time: "13:00".to_string(),
        };

        // Monday: break applies
        let schedule = schedule_for(1, true, "09:00", "17:00");
        let slots = compute_availability(
            monday(),
            60,
            &schedule,
            &[],
            &[],
            std::slice::from_ref(&lunch),
            chrono_tz::UTC,
        );
        let monday_starts = starts(&slots);
        assert!(!monday_starts.contains(&"11:30".to_string()));
        assert!(!monday_starts.contains(&"12:00".to_string()));
        assert!(monday_starts.contains(&"11:00".to_string())); // ends at 12:00
        assert!(monday_starts.contains(&"13:00".to_string()));

        // Tuesday: same break is ignored
        let tuesday = NaiveDate::from_ymd_opt(2025, 6, 17).unwrap();
        let schedule = schedule_for(2, true, "09:00", "17:00");
        let slots = compute_availability(
            tuesday,
            60,
            &schedule,
            &[],
            &[],
            std::slice::from_ref(&lunch),
            chrono_tz::UTC,
        );
        assert!(starts(&slots).contains(&"12:00".to_string()));
    }

    #[test]
    fn test_malformed_schedule_window_is_treated_as_closed() {
        let schedule = schedule_for(1, true, "12:00", "09:00");

        let slots = compute_availability(monday(), 30, &schedule, &[], &[], &[], chrono_tz::UTC);
        assert!(slots.is_empty());
    }
}
