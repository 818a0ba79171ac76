use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Weekday};

/// Weekly peak-traffic window the auction deadlines aim for.
pub const PEAK_HOUR: u32 = 15;
pub const PEAK_MINUTE: u32 = 45;
pub const DEFAULT_PUBLISH_LEAD_HOURS: i64 = 72;

/// Recommended auction deadlines: the next Saturday and Wednesday peak
/// slots after `now`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpirySlots<Tz: TimeZone> {
    pub saturday: DateTime<Tz>,
    pub wednesday: DateTime<Tz>,
}

/// Next occurrence of `target` weekday at the given wall-clock time,
/// strictly after `now`. Returns `None` only when the requested wall time
/// does not exist in the zone (DST gap) or is out of range.
pub fn next_weekday<Tz: TimeZone>(
    now: &DateTime<Tz>,
    target: Weekday,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Tz>> {
    let days_ahead = (target.num_days_from_monday() as i64
        - now.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    let candidate = at_time(now.clone() + Duration::days(days_ahead), hour, minute)?;
    if candidate <= *now {
        return at_time(candidate + Duration::days(7), hour, minute);
    }
    Some(candidate)
}

pub fn recommend_expiry_slots<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<ExpirySlots<Tz>> {
    Some(ExpirySlots {
        saturday: next_weekday(now, Weekday::Sat, PEAK_HOUR, PEAK_MINUTE)?,
        wednesday: next_weekday(now, Weekday::Wed, PEAK_HOUR, PEAK_MINUTE)?,
    })
}

/// When to publish the transfer so the auction runs its full course before
/// the chosen expiry.
pub fn publish_time<Tz: TimeZone>(expiry: &DateTime<Tz>, hours_before: i64) -> DateTime<Tz> {
    expiry.clone() - Duration::hours(hours_before)
}

fn at_time<Tz: TimeZone>(dt: DateTime<Tz>, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    dt.with_hour(hour)?
        .with_minute(minute)?
        .with_second(0)?
        .with_nanosecond(0)
}
