use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

/// When a job next fires: once a day at a fixed hour:minute (UTC), or once
/// an hour on the hour.
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    Daily { hour: u32, minute: u32 },
    Hourly,
}

/// Compute the next UTC execution time for `trigger` strictly after `from`.
pub fn compute_next_run(trigger: Trigger, from: DateTime<Utc>) -> DateTime<Utc> {
    match trigger {
        Trigger::Daily { hour, minute } => {
            let candidate = Utc
                .with_ymd_and_hms(from.year(), from.month(), from.day(), hour, minute, 0)
                .single()
                .expect("valid daily trigger time");
            if candidate > from {
                candidate
            } else {
                candidate + Duration::days(1)
            }
        }
        Trigger::Hourly => {
            let candidate = Utc
                .with_ymd_and_hms(from.year(), from.month(), from.day(), from.hour(), 0, 0)
                .single()
                .expect("valid hourly trigger time");
            if candidate > from {
                candidate
            } else {
                candidate + Duration::hours(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_advances_to_tomorrow_once_today_has_passed() {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let next = compute_next_run(Trigger::Daily { hour: 10, minute: 0 }, from);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 2, 10, 0, 0).unwrap());
    }

    #[test]
    fn daily_stays_today_when_time_has_not_passed() {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();
        let next = compute_next_run(Trigger::Daily { hour: 10, minute: 0 }, from);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn hourly_advances_to_next_hour_boundary() {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 8, 30, 0).unwrap();
        let next = compute_next_run(Trigger::Hourly, from);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap());
    }
}
