//! `check_availability` / `find_next_available` (§4.6): candidate slots at
//! a fixed granularity, bounded by business hours, filtered against the
//! calendar's busy intervals. Same-day slots must start at least an hour
//! from now — walking in and booking the next five minutes isn't realistic
//! for a salon.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use chrono_tz::Tz;
use salon_channels::{BusyInterval, CalendarClient};
use salon_core::domain::BusinessHours;
use salon_core::types::StylistId;

const SLOT_GRANULARITY_MINUTES: i64 = 15;
const SAME_DAY_MIN_LEAD: ChronoDuration = ChronoDuration::hours(1);
const DEFAULT_SEARCH_DAYS: i64 = 14;

fn business_hours_for(business_hours: &[BusinessHours], date: NaiveDate) -> Option<&BusinessHours> {
    let weekday = date.weekday().num_days_from_monday() as u8;
    business_hours
        .iter()
        .find(|h| h.day_of_week == weekday)
        .filter(|h| !h.closed)
}

fn overlaps_busy(start: DateTime<Utc>, end: DateTime<Utc>, busy: &[BusyInterval]) -> bool {
    busy.iter().any(|b| start < b.end && end > b.start)
}

/// Every bookable slot on `date` (local calendar day) for `stylist_id`.
pub async fn slots_for_day(
    calendar: &dyn CalendarClient,
    calendar_id: &str,
    stylist_id: &StylistId,
    business_hours: &[BusinessHours],
    tz: Tz,
    date: NaiveDate,
    duration_minutes: i32,
    now: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, salon_channels::ChannelError> {
    let Some(hours) = business_hours_for(business_hours, date) else {
        return Ok(Vec::new());
    };

    // `.earliest()` rather than `.single()`: a DST fold can make the local
    // business-hours boundary ambiguous twice a year, and the earlier
    // instant is the conservative (wider) choice for an opening boundary.
    let Some(day_start_local) = date.and_time(hours.start).and_local_timezone(tz).earliest() else {
        return Ok(Vec::new());
    };
    let Some(day_end_local) = date.and_time(hours.end).and_local_timezone(tz).earliest() else {
        return Ok(Vec::new());
    };
    let day_start = day_start_local.with_timezone(&Utc);
    let day_end = day_end_local.with_timezone(&Utc);

    tracing::trace!(stylist_id = stylist_id.as_str(), %date, "computing availability for day");
    let busy = calendar.list_busy(calendar_id, day_start, day_end).await?;

    let duration = ChronoDuration::minutes(duration_minutes as i64);
    let step = ChronoDuration::minutes(SLOT_GRANULARITY_MINUTES);
    let is_today = date == now.with_timezone(&tz).date_naive();

    let mut slots = Vec::new();
    let mut candidate = day_start;
    while candidate + duration <= day_end {
        let passes_lead_time = !is_today || candidate - now >= SAME_DAY_MIN_LEAD;
        if passes_lead_time && !overlaps_busy(candidate, candidate + duration, &busy) {
            slots.push(candidate);
        }
        candidate += step;
    }
    Ok(slots)
}

/// Multi-day search (§4.6 `find_next_available`): the first `max_results`
/// slots across up to `max_days` days starting from `from_date`.
#[allow(clippy::too_many_arguments)]
pub async fn find_next_available(
    calendar: &dyn CalendarClient,
    calendar_id: &str,
    stylist_id: &StylistId,
    business_hours: &[BusinessHours],
    tz: Tz,
    from_date: NaiveDate,
    duration_minutes: i32,
    now: DateTime<Utc>,
    max_days: Option<i64>,
    max_results: usize,
) -> Result<Vec<DateTime<Utc>>, salon_channels::ChannelError> {
    let max_days = max_days.unwrap_or(DEFAULT_SEARCH_DAYS);
    let mut found = Vec::new();

    for offset in 0..max_days {
        let date = from_date + ChronoDuration::days(offset);
        let mut day_slots = slots_for_day(
            calendar,
            calendar_id,
            stylist_id,
            business_hours,
            tz,
            date,
            duration_minutes,
            now,
        )
        .await?;
        found.append(&mut day_slots);
        if found.len() >= max_results {
            break;
        }
    }

    found.truncate(max_results);
    Ok(found)
}
