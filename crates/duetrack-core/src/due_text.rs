//! Parsing of the portal's due-date subtitles.
//!
//! The portal renders due dates as `(due 04/26/2019 @ 11:59 PM)` or, for team
//! assignments, `(teams lock 04/26/2019 @ 11:59 PM)`. Fields sit at fixed
//! offsets after the literal prefix; this is not a general date parser.

use std::fmt;

use thiserror::Error;

use crate::time::{CalendarFormatError, CalendarTime};

const DUE_PREFIX: &str = "(due ";
const TEAMS_LOCK_PREFIX: &str = "(teams lock ";

// Offsets relative to the end of the prefix: `MM/DD/YYYY @ HH:MM`.
const MONTH: (usize, usize) = (0, 2);
const DAY: (usize, usize) = (3, 5);
const YEAR: (usize, usize) = (6, 10);
const HOUR: (usize, usize) = (13, 15);
const MINUTE: (usize, usize) = (16, 18);

/// Which subtitle a due date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DueKind {
    /// Submission due date.
    Due,
    /// Date after which team membership is locked.
    TeamsLock,
}

impl DueKind {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Due => DUE_PREFIX,
            Self::TeamsLock => TEAMS_LOCK_PREFIX,
        }
    }

    /// Returns the kind whose prefix starts `text`, if any.
    pub fn detect(text: &str) -> Option<DueKind> {
        [Self::Due, Self::TeamsLock]
            .into_iter()
            .find(|kind| text.starts_with(kind.prefix()))
    }
}

impl fmt::Display for DueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Due => write!(f, "due"),
            Self::TeamsLock => write!(f, "teams lock"),
        }
    }
}

/// Errors from [`parse_due_text`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DueTextError {
    /// Neither `(due ` nor `(teams lock ` starts the text.
    #[error("unrecognized due text `{0}`")]
    UnrecognizedPrefix(String),

    /// The text ends before the minute field.
    #[error("due text `{0}` is truncated")]
    Truncated(String),

    /// A field slice is not a number.
    #[error("invalid {field} `{slice}` in due text")]
    InvalidNumber { field: &'static str, slice: String },

    /// A field is out of range.
    #[error(transparent)]
    Calendar(#[from] CalendarFormatError),
}

/// Parses a due-date subtitle into a calendar time and reports its kind.
///
/// A trailing `AM`/`PM` switches to the 12-hour clock: `12 AM` is midnight,
/// `12 PM` is noon, and `PM` adds 12 to hours 1 to 11.
pub fn parse_due_text(text: &str) -> Result<(DueKind, CalendarTime), DueTextError> {
    let text = text.trim();
    let kind =
        DueKind::detect(text).ok_or_else(|| DueTextError::UnrecognizedPrefix(text.to_string()))?;
    let body = &text[kind.prefix().len()..];

    let field = |name: &'static str, (start, end): (usize, usize)| -> Result<i64, DueTextError> {
        let slice = body
            .get(start..end)
            .ok_or_else(|| DueTextError::Truncated(text.to_string()))?;
        slice
            .trim()
            .parse::<i64>()
            .map_err(|_| DueTextError::InvalidNumber {
                field: name,
                slice: slice.to_string(),
            })
    };

    let month = field("month", MONTH)?;
    let day = field("day", DAY)?;
    let year = field("year", YEAR)?;
    let mut hour = field("hour", HOUR)?;
    let minute = field("minute", MINUTE)?;

    let suffix = body.get(MINUTE.1..).unwrap_or_default().to_ascii_uppercase();
    let suffix = suffix.trim_end_matches(')').trim();
    match suffix {
        "PM" if (1..12).contains(&hour) => hour += 12,
        "AM" if hour == 12 => hour = 0,
        _ => {}
    }

    let time = CalendarTime::from_raw(year, month, day, hour, minute)?;
    Ok((kind, time))
}
