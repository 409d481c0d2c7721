//! DST-aware conversion between provider wall-clock time and absolute instants.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{EngineError, Result};

/// Parse an IANA timezone name.
///
/// # Errors
/// Returns `EngineError::InvalidTimezone` if `name` is not a known IANA identifier.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| EngineError::InvalidTimezone(name.to_string()))
}

/// Resolve a wall-clock datetime in `tz` to an instant.
///
/// Ambiguous times (fall back) take the earlier instant. Times in a DST gap
/// (spring forward) shift forward by the size of the gap, keeping the pre-gap
/// offset.
pub fn resolve(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Transitions are never less than a day apart, so the offset a day
            // earlier is the one in force right before the gap.
            let before = tz
                .offset_from_utc_datetime(&(local - Duration::hours(24)))
                .fix();
            let utc = local - Duration::seconds(i64::from(before.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}

/// The instant a wall-clock `time` on `date` denotes in `tz`.
pub fn at(tz: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    resolve(tz, date.and_time(time))
}

/// The instant local midnight begins `date` in `tz`.
pub fn start_of_day(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    at(tz, date, NaiveTime::MIN)
}

/// The calendar date `instant` falls on in `tz`.
pub fn local_date(tz: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}
