use crate::components::google_calendar::models::EventDateTime;
use crate::error::{CalendarResult, Error};
use chrono::{
    DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveTime, SecondsFormat, TimeZone,
};
use chrono_tz::Tz;
use tracing::warn;

/// Short date format used by all-day events
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Days fetched before the first of the month
pub const WINDOW_DAYS_BEFORE: i64 = 7;
/// Days fetched after the end of the month
pub const WINDOW_DAYS_AFTER: i64 = 14;

/// Inclusive time range for an events query, as RFC 3339 strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWindow {
    pub start: String,
    pub end: String,
}

impl EventWindow {
    /// Window for a month view of a `YYYYMM` token.
    ///
    /// The month is padded by a week before and two weeks after so the
    /// leading and trailing days of a calendar grid show their events too.
    pub fn for_month(token: Option<&str>, tz: &Tz) -> CalendarResult<Self> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingParameter("date"))?;

        let first = first_of_month(token)?;
        let start = first - Duration::days(WINDOW_DAYS_BEFORE);
        let end = first
            .checked_add_months(Months::new(1))
            .ok_or_else(|| Error::InvalidInput(format!("month out of range: {}", token)))?
            + Duration::days(WINDOW_DAYS_AFTER);

        Ok(Self {
            start: format_timestamp(&midnight_in(start, tz)),
            end: format_timestamp(&midnight_in(end, tz)),
        })
    }

    /// Parsed window bounds
    pub fn bounds(&self) -> CalendarResult<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        let parse = |value: &str| {
            DateTime::parse_from_rfc3339(value)
                .map_err(|e| Error::InvalidInput(format!("bad window bound {}: {}", value, e)))
        };
        Ok((parse(&self.start)?, parse(&self.end)?))
    }
}

/// First day of the month named by a `YYYYMM` token
pub fn first_of_month(token: &str) -> CalendarResult<NaiveDate> {
    let invalid = || Error::InvalidInput(format!("malformed month: {}", token));

    if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let year = token[0..4].parse::<i32>().map_err(|_| invalid())?;
    let month = token[4..6].parse::<u32>().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)
}

/// Local midnight of a date. When a DST jump skips midnight, the first
/// whole hour after the gap on the same date is used.
pub fn midnight_in(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN);
    (0..=3)
        .find_map(|hours| {
            tz.from_local_datetime(&(naive + Duration::hours(hours)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// RFC 3339 with second precision and `Z` for UTC
pub fn format_timestamp<T: TimeZone>(dt: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Normalize an event start into a timestamp string and an all-day flag.
///
/// Timed starts keep their own offset. Date-only starts become local midnight
/// in `tz`. Values that fail to parse are returned unchanged.
pub fn normalize_start(start: &EventDateTime, tz: &Tz) -> (String, bool) {
    if start.is_timed() {
        let raw = start.date_time.as_deref().unwrap_or_default();
        let date = match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => format_timestamp(&dt),
            Err(e) => {
                warn!("Unparseable event dateTime {:?}: {}", raw, e);
                raw.to_string()
            }
        };
        return (date, false);
    }

    let raw = start.date.as_deref().unwrap_or_default();
    let date = match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(d) => format_timestamp(&midnight_in(d, tz)),
        Err(e) => {
            warn!("Unparseable event date {:?}: {}", raw, e);
            raw.to_string()
        }
    };
    (date, true)
}

/// Start of an event as an instant; all-day starts are read as UTC midnight
pub fn parse_event_start(start: &EventDateTime) -> Option<DateTime<FixedOffset>> {
    if start.is_timed() {
        return DateTime::parse_from_rfc3339(start.date_time.as_deref()?).ok();
    }

    let date = NaiveDate::parse_from_str(start.date.as_deref()?, DATE_FORMAT).ok()?;
    Some(date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
}
