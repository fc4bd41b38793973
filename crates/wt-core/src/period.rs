//! Calendar period boundaries.
//!
//! Entries are stored in UTC but bucketed by the user's calendar, so every
//! function here takes the time zone that defines "a day". Weeks run Monday
//! 00:00 to the next Monday 00:00. All ranges are half-open.

use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc,
};
use thiserror::Error;

/// A period boundary fell outside the dates chrono can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("date {0} is outside the supported calendar range")]
pub struct DateOutOfRange(pub NaiveDate);

/// Converts midnight of `date` in `tz` to UTC.
///
/// Ambiguous midnights (DST fall-back) resolve to the earlier instant. When
/// midnight does not exist (DST spring-forward) the day starts at 01:00.
pub fn midnight_utc<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            let one_am = midnight + Duration::hours(1);
            tz.from_local_datetime(&one_am).earliest().map_or_else(
                || Utc.from_utc_datetime(&midnight),
                |dt| dt.with_timezone(&Utc),
            )
        }
    }
}

/// Calendar date of `timestamp` as seen in `tz`.
pub fn local_date<Tz: TimeZone>(timestamp: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    timestamp.with_timezone(tz).date_naive()
}

/// Monday of the week containing `date`.
pub fn start_of_week(date: NaiveDate) -> Result<NaiveDate, DateOutOfRange> {
    let days_since_monday = date.weekday().num_days_from_monday();
    date.checked_sub_days(Days::new(u64::from(days_since_monday)))
        .ok_or(DateOutOfRange(date))
}

/// Sunday of the week containing `date`.
pub fn end_of_week(date: NaiveDate) -> Result<NaiveDate, DateOutOfRange> {
    let days_until_sunday = 6 - date.weekday().num_days_from_monday();
    date.checked_add_days(Days::new(u64::from(days_until_sunday)))
        .ok_or(DateOutOfRange(date))
}

/// Today 00:00 to tomorrow 00:00.
pub fn day_bounds<Tz: TimeZone>(
    date: NaiveDate,
    tz: &Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>), DateOutOfRange> {
    range_bounds(date, date, tz)
}

/// Monday 00:00 to next Monday 00:00 for the week containing `date`.
pub fn week_bounds<Tz: TimeZone>(
    date: NaiveDate,
    tz: &Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>), DateOutOfRange> {
    range_bounds(start_of_week(date)?, end_of_week(date)?, tz)
}

/// Bounds covering whole days `start_date..=end_date`.
///
/// The end date is inclusive at day granularity: the upper bound is midnight
/// of the day after `end_date`.
pub fn range_bounds<Tz: TimeZone>(
    start_date: NaiveDate,
    end_date: NaiveDate,
    tz: &Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>), DateOutOfRange> {
    let day_after = end_date
        .checked_add_days(Days::new(1))
        .ok_or(DateOutOfRange(end_date))?;
    Ok((midnight_utc(start_date, tz), midnight_utc(day_after, tz)))
}

/// Every calendar day from `start_date` to `end_date` inclusive.
pub fn days_inclusive(start_date: NaiveDate, end_date: NaiveDate) -> Vec<NaiveDate> {
    start_date
        .iter_days()
        .take_while(|day| *day <= end_date)
        .collect()
}
