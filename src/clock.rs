use chrono::{DateTime, Local, NaiveDate, TimeZone, Timelike};

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Calendar day `now` falls on, in local time.
pub fn day_of(now: DateTime<Local>) -> NaiveDate {
    now.date_naive()
}

/// Millisecond timestamp of local midnight at the start of `day`.
///
/// Falls back to the earliest valid instant on DST transitions where
/// midnight does not exist.
pub fn midnight_millis(day: NaiveDate) -> i64 {
    let naive = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    match Local.from_local_datetime(&naive).earliest() {
        Some(at) => at.timestamp_millis(),
        None => naive.and_utc().timestamp_millis(),
    }
}

/// Inverse of [`midnight_millis`]: the local day a stored timestamp belongs to.
pub fn day_from_millis(millis: i64) -> Option<NaiveDate> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|at| at.date_naive())
}

pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub fn parse_day_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Whole calendar days from `from` to `to`; negative when `to` is earlier.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn minutes_since_midnight(now: DateTime<Local>) -> u16 {
    (now.hour() * 60 + now.minute()) as u16
}

/// Renders a minutes-since-midnight value as `9h05`.
pub fn format_minutes(minutes: u16) -> String {
    format!("{}h{:02}", minutes / 60, minutes % 60)
}

/// Parses a form time value (`HH:MM`) into minutes since midnight.
pub fn parse_time(raw: &str) -> Option<u16> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    let hours: u16 = hours.trim().parse().ok()?;
    let minutes: u16 = minutes.trim().parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}
