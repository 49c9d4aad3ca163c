//! Wall-clock calendar time with minute granularity.
//!
//! [`CalendarTime`] is the single time representation used by deadlines,
//! stores and the portal scraper. It stores plain fields without any time
//! zone: every value is local wall-clock time.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A field of a [`CalendarTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl CalendarField {
    /// Returns the field name as used in stores and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
        }
    }

    /// Returns the inclusive range of accepted values.
    ///
    /// The day range does not depend on the month: day 31 is accepted for
    /// every month.
    pub fn valid_range(&self) -> RangeInclusive<i64> {
        match self {
            Self::Year => 1..=9999,
            Self::Month => 1..=12,
            Self::Day => 1..=31,
            Self::Hour => 0..=23,
            Self::Minute => 0..=59,
        }
    }
}

impl fmt::Display for CalendarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A date/time component outside its valid range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} {value}: expected a value in {min}..={max}")]
pub struct CalendarFormatError {
    /// The offending field.
    pub field: CalendarField,
    /// The rejected value.
    pub value: i64,
    /// Lower bound of the valid range.
    pub min: i64,
    /// Upper bound of the valid range.
    pub max: i64,
}

impl CalendarFormatError {
    fn new(field: CalendarField, value: i64) -> Self {
        let range = field.valid_range();
        Self {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        }
    }

    /// Returns the valid range of the offending field.
    pub fn valid_range(&self) -> RangeInclusive<i64> {
        self.min..=self.max
    }
}

/// Errors from parsing a `YYYY-MM-DD HH:MM` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCalendarTimeError {
    /// The text does not have the expected shape.
    #[error("expected `YYYY-MM-DD HH:MM`, got `{0}`")]
    Format(String),

    /// A component is out of range.
    #[error(transparent)]
    Calendar(#[from] CalendarFormatError),
}

/// A year/month/day/hour/minute value.
///
/// Seconds are always zero. Equality and ordering are field-wise in the
/// order year, month, day, hour, minute, without calendar normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCalendarTime")]
pub struct CalendarTime {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
}

#[derive(Deserialize)]
struct RawCalendarTime {
    year: i64,
    month: i64,
    day: i64,
    hour: i64,
    minute: i64,
}

impl TryFrom<RawCalendarTime> for CalendarTime {
    type Error = CalendarFormatError;

    fn try_from(raw: RawCalendarTime) -> Result<Self, Self::Error> {
        Self::from_raw(raw.year, raw.month, raw.day, raw.hour, raw.minute)
    }
}

fn check(field: CalendarField, value: i64) -> Result<(), CalendarFormatError> {
    if field.valid_range().contains(&value) {
        Ok(())
    } else {
        Err(CalendarFormatError::new(field, value))
    }
}

impl CalendarTime {
    /// Creates a calendar time, validating every field.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field in the order month, day, hour,
    /// minute, then year.
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Result<Self, CalendarFormatError> {
        Self::from_raw(
            i64::from(year),
            i64::from(month),
            i64::from(day),
            i64::from(hour),
            i64::from(minute),
        )
    }

    /// Creates a calendar time from untrusted integers (file records,
    /// scraped text). Negative values are reported as range errors.
    pub fn from_raw(
        year: i64,
        month: i64,
        day: i64,
        hour: i64,
        minute: i64,
    ) -> Result<Self, CalendarFormatError> {
        check(CalendarField::Month, month)?;
        check(CalendarField::Day, day)?;
        check(CalendarField::Hour, hour)?;
        check(CalendarField::Minute, minute)?;
        check(CalendarField::Year, year)?;

        // All casts are in range after the checks above.
        Ok(Self {
            year: year as i32,
            month: month as u32,
            day: day as u32,
            hour: hour as u32,
            minute: minute as u32,
        })
    }

    /// Returns the current local wall-clock time, truncated to the minute.
    pub fn now() -> Self {
        let now = Local::now().naive_local();
        Self {
            year: now.year(),
            month: now.month(),
            day: now.day(),
            hour: now.hour(),
            minute: now.minute(),
        }
    }

    /// Converts a naive datetime, dropping seconds.
    pub fn from_naive(dt: NaiveDateTime) -> Result<Self, CalendarFormatError> {
        Self::from_raw(
            i64::from(dt.year()),
            i64::from(dt.month()),
            i64::from(dt.day()),
            i64::from(dt.hour()),
            i64::from(dt.minute()),
        )
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn set_year(&mut self, year: i32) -> Result<(), CalendarFormatError> {
        check(CalendarField::Year, i64::from(year))?;
        self.year = year;
        Ok(())
    }

    pub fn set_month(&mut self, month: u32) -> Result<(), CalendarFormatError> {
        check(CalendarField::Month, i64::from(month))?;
        self.month = month;
        Ok(())
    }

    pub fn set_day(&mut self, day: u32) -> Result<(), CalendarFormatError> {
        check(CalendarField::Day, i64::from(day))?;
        self.day = day;
        Ok(())
    }

    pub fn set_hour(&mut self, hour: u32) -> Result<(), CalendarFormatError> {
        check(CalendarField::Hour, i64::from(hour))?;
        self.hour = hour;
        Ok(())
    }

    pub fn set_minute(&mut self, minute: u32) -> Result<(), CalendarFormatError> {
        check(CalendarField::Minute, i64::from(minute))?;
        self.minute = minute;
        Ok(())
    }

    /// Returns `true` if `self` is strictly later than `other`.
    pub fn is_after(&self, other: &CalendarTime) -> bool {
        self > other
    }

    /// Returns `true` if `self` is strictly earlier than `other`.
    pub fn is_before(&self, other: &CalendarTime) -> bool {
        self < other
    }

    /// Returns the absolute instant this value designates.
    ///
    /// Days past the end of the month roll over into the next month, so
    /// February 31st maps to early March.
    pub fn to_naive_datetime(&self) -> NaiveDateTime {
        let first = self.first_of_month();
        let date = first
            .checked_add_days(Days::new(u64::from(self.day - 1)))
            .unwrap_or(first);
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN);
        date.and_time(time)
    }

    /// Day of week of this date (after month rollover).
    pub fn weekday(&self) -> Weekday {
        self.to_naive_datetime().weekday()
    }

    /// Day of week of the first day of the containing month.
    pub fn first_weekday_of_month(&self) -> Weekday {
        self.first_of_month().weekday()
    }

    /// Number of days in the containing month.
    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    fn first_of_month(&self) -> NaiveDate {
        // Year and month are range-checked at construction.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }
}

/// Returns `true` for Gregorian leap years.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` of `year`; 0 for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}

impl FromStr for CalendarTime {
    type Err = ParseCalendarTimeError;

    /// Parses `YYYY-MM-DD HH:MM` (a `T` separator is accepted too).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseCalendarTimeError::Format(s.to_string());
        let trimmed = s.trim();
        let (date, time) = trimmed.split_once(['T', ' ']).ok_or_else(bad)?;

        let mut date_parts = date.split('-');
        let mut time_parts = time.trim().split(':');

        let year = next_number(&mut date_parts).ok_or_else(bad)?;
        let month = next_number(&mut date_parts).ok_or_else(bad)?;
        let day = next_number(&mut date_parts).ok_or_else(bad)?;
        let hour = next_number(&mut time_parts).ok_or_else(bad)?;
        let minute = next_number(&mut time_parts).ok_or_else(bad)?;
        if date_parts.next().is_some() || time_parts.next().is_some() {
            return Err(bad());
        }

        Ok(Self::from_raw(year, month, day, hour, minute)?)
    }
}

fn next_number<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Option<i64> {
    parts.next().and_then(|p| p.trim().parse::<i64>().ok())
}
