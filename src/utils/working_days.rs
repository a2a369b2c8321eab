use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use derive_more::Display;

/// Wire format for every calendar date this service emits.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum WorkingDayError {
    #[display(fmt = "Duration must be at least 1 working day")]
    ZeroDuration,
    #[display(fmt = "Invalid date '{}', expected YYYY-MM-DD", _0)]
    InvalidDate(String),
    #[display(fmt = "Resumption date is out of calendar range")]
    OutOfRange,
}

impl std::error::Error for WorkingDayError {}

/// Monday through Friday. Public holidays are not considered.
pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Date an employee is back at work after `duration` working days of leave
/// taken strictly after `start_date`.
///
/// The start date itself is never counted, so a weekend start behaves the
/// same as starting on the preceding Friday. The returned date is always a
/// working day.
pub fn compute_resumption_date(
    start_date: NaiveDate,
    duration: u32,
) -> Result<NaiveDate, WorkingDayError> {
    if duration == 0 {
        return Err(WorkingDayError::ZeroDuration);
    }

    let mut cursor = start_date;
    let mut added_days = 0u32;

    while added_days < duration {
        cursor = cursor.succ_opt().ok_or(WorkingDayError::OutOfRange)?;
        if is_working_day(cursor) {
            added_days += 1;
        }
    }

    Ok(cursor)
}

/// String form of [`compute_resumption_date`]: `YYYY-MM-DD` in, `YYYY-MM-DD` out.
pub fn compute_resumption_date_str(
    start_date: &str,
    duration: u32,
) -> Result<String, WorkingDayError> {
    let start = parse_date(start_date)?;
    compute_resumption_date(start, duration).map(format_date)
}

/// Accepts a plain `YYYY-MM-DD` date or an RFC 3339 timestamp. Time of day is
/// dropped; a timestamp keeps the calendar date of its own offset.
pub fn parse_date(value: &str) -> Result<NaiveDate, WorkingDayError> {
    let value = value.trim();

    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| WorkingDayError::InvalidDate(value.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
