use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use salon_core::config::MIN_LEAD_DAYS;
use salon_core::domain::BusinessHours;

use crate::error::{Result, ValidateError};
use crate::result::ValidationResult;

pub struct SlotValidator {
    business_hours: Vec<BusinessHours>,
    holidays: Vec<NaiveDate>,
    tz: Tz,
}

impl SlotValidator {
    pub fn business_hours(&self) -> &[BusinessHours] {
        &self.business_hours
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn new(business_hours: Vec<BusinessHours>, holidays: Vec<NaiveDate>, timezone: &str) -> Result<Self> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| ValidateError::UnknownTimezone(timezone.to_string()))?;
        Ok(Self {
            business_hours,
            holidays,
            tz,
        })
    }

    /// Load business hours and the holiday calendar from the database and
    /// build a validator for `timezone` (normally `config.timezone`).
    pub async fn load(pool: &sqlx::SqlitePool, timezone: &str) -> Result<Self> {
        let business_hours = salon_db::business_hours::list_all(pool).await?;
        let holidays = crate::holidays::load(pool).await?;
        Self::new(business_hours, holidays, timezone)
    }

    /// Layer 1 (§4.4): is `start_time` a well-formed, non-date-only instant,
    /// and is `duration_minutes` (if given) sane? Does not touch the
    /// database or the clock.
    pub fn validate_structural(start_time: &str, duration_minutes: Option<i64>) -> ValidationResult {
        let Ok(parsed) = DateTime::parse_from_rfc3339(start_time) else {
            return ValidationResult::reject("start_time must be ISO-8601 with a UTC offset");
        };
        if parsed.time() == NaiveTime::from_hms_opt(0, 0, 0).unwrap() {
            return ValidationResult::reject(
                "start_time looks like a date-only extraction (exactly midnight)",
            );
        }
        if let Some(d) = duration_minutes {
            if d < 0 {
                return ValidationResult::reject("duration_minutes must not be negative");
            }
        }
        ValidationResult::ok()
    }

    /// Layer 2 (§4.4): is the salon open at `start_time`, and is it far
    /// enough in the future? The lead-time rule ties on calendar day in
    /// local time, not a rolling 72h duration (binding resolution for an
    /// ambiguity the distilled spec left open, matching the source system's
    /// `(slot_datetime - now).days` check).
    pub fn validate_policy(&self, start_time: DateTime<Utc>, now: DateTime<Utc>) -> ValidationResult {
        let local_start = start_time.with_timezone(&self.tz);
        let local_now = now.with_timezone(&self.tz);

        let lead_days = (local_start.date_naive() - local_now.date_naive()).num_days();
        if lead_days < MIN_LEAD_DAYS {
            return ValidationResult::reject(format!(
                "appointments must be booked at least {MIN_LEAD_DAYS} days in advance"
            ));
        }

        if self.holidays.contains(&local_start.date_naive()) {
            return ValidationResult::reject("the salon is closed that day");
        }

        let weekday = local_start.weekday().num_days_from_monday() as u8;
        let Some(hours) = self.business_hours.iter().find(|h| h.day_of_week == weekday) else {
            return ValidationResult::reject("no opening hours are configured for that day");
        };
        if hours.closed {
            return ValidationResult::reject("the salon is closed that day");
        }

        let local_time = local_start.time();
        if local_time < hours.start || local_time >= hours.end {
            return ValidationResult::reject("that time is outside business hours");
        }

        ValidationResult::ok()
    }

    /// Both layers, in order — the first rejection short-circuits.
    pub fn validate(
        &self,
        start_time: &str,
        duration_minutes: Option<i64>,
        now: DateTime<Utc>,
    ) -> ValidationResult {
        let structural = Self::validate_structural(start_time, duration_minutes);
        if !structural.valid {
            return structural;
        }
        let parsed = DateTime::parse_from_rfc3339(start_time)
            .expect("validate_structural already confirmed this parses")
            .with_timezone(&Utc);
        structural.and(self.validate_policy(parsed, now))
    }

    /// The slot-freshness check run on state load (§4.2.4): the 3-day rule
    /// only, no business-hours/holiday lookup.
    pub fn is_fresh(&self, start_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let local_start = start_time.with_timezone(&self.tz);
        let local_now = now.with_timezone(&self.tz);
        (local_start.date_naive() - local_now.date_naive()).num_days() >= MIN_LEAD_DAYS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hours_mon_to_fri() -> Vec<BusinessHours> {
        (0..7)
            .map(|d| BusinessHours {
                day_of_week: d,
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
                closed: d >= 5,
            })
            .collect()
    }

    #[test]
    fn rejects_midnight_exactly() {
        let r = SlotValidator::validate_structural("2026-08-10T00:00:00+02:00", None);
        assert!(!r.valid);
    }

    #[test]
    fn rejects_unparseable() {
        let r = SlotValidator::validate_structural("not-a-date", None);
        assert!(!r.valid);
    }

    #[test]
    fn rejects_negative_duration() {
        let r = SlotValidator::validate_structural("2026-08-10T10:00:00+02:00", Some(-5));
        assert!(!r.valid);
    }

    #[test]
    fn three_day_rule_ties_on_calendar_day_not_72h() {
        let validator = SlotValidator::new(hours_mon_to_fri(), vec![], "Europe/Madrid").unwrap();
        // Exactly 3 calendar days ahead at the same local hour — passes even
        // though it is exactly 72h, the boundary the duration-based reading
        // would also accept, so this doesn't yet distinguish the two rules.
        let now = Utc.with_ymd_and_hms(2026, 8, 10, 8, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2026, 8, 13, 8, 0, 0).unwrap();
        assert!(validator.validate_policy(start, now).valid);
    }

    #[test]
    fn three_day_rule_accepts_shorter_than_72h_elapsed_across_calendar_days() {
        // Local 18:00 on day 0 to local 10:00 on day 3 is only 64 elapsed
        // hours, but it is 3 calendar days ahead, so the calendar-day rule
        // accepts it where a strict 72h-duration rule would reject it.
        let validator = SlotValidator::new(hours_mon_to_fri(), vec![], "Europe/Madrid").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 10, 16, 0, 0).unwrap(); // 18:00 local
        let start = Utc.with_ymd_and_hms(2026, 8, 13, 8, 0, 0).unwrap(); // 10:00 local
        assert!(validator.validate_policy(start, now).valid);
    }

    #[test]
    fn rejects_closed_day() {
        let validator = SlotValidator::new(hours_mon_to_fri(), vec![], "Europe/Madrid").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 10, 8, 0, 0).unwrap();
        // 2026-08-16 is a Sunday.
        let start = Utc.with_ymd_and_hms(2026, 8, 16, 10, 0, 0).unwrap();
        assert!(!validator.validate_policy(start, now).valid);
    }

    #[test]
    fn rejects_holiday() {
        let holiday = NaiveDate::from_ymd_opt(2026, 8, 15).unwrap();
        let validator = SlotValidator::new(hours_mon_to_fri(), vec![holiday], "Europe/Madrid").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 10, 8, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2026, 8, 15, 10, 0, 0).unwrap();
        assert!(!validator.validate_policy(start, now).valid);
    }

    #[test]
    fn rejects_outside_business_hours() {
        let validator = SlotValidator::new(hours_mon_to_fri(), vec![], "Europe/Madrid").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 10, 8, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2026, 8, 13, 21, 0, 0).unwrap();
        assert!(!validator.validate_policy(start, now).valid);
    }
}
