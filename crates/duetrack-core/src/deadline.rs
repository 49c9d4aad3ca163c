//! Deadlines and time-remaining computation.
//!
//! A [`Deadline`] ties an assignment of a course to a due [`CalendarTime`].
//! [`RemainingPeriod`] describes how far a reference instant is from the
//! due time, in calendar months, days, hours and minutes.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::time::{CalendarFormatError, CalendarTime};

/// Submission status of a deadline, as reported by the portal or a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Status {
    /// Waiting for a submission.
    #[default]
    Default,
    LateSubmit,
    Resubmit,
    LateResubmit,
    Finished,
    OverdueSubmission,
    NoSubmission,
    /// The assignment requires joining a team before submitting.
    MustOnTeam,
}

impl Status {
    /// All statuses, in declaration order.
    pub const ALL: [Status; 8] = [
        Self::Default,
        Self::LateSubmit,
        Self::Resubmit,
        Self::LateResubmit,
        Self::Finished,
        Self::OverdueSubmission,
        Self::NoSubmission,
        Self::MustOnTeam,
    ];

    /// Returns the human-readable label (also the stored form).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "WAIT FOR SUBMISSION",
            Self::LateSubmit => "LATE SUBMIT",
            Self::Resubmit => "RESUBMIT",
            Self::LateResubmit => "LATE RESUBMIT",
            Self::Finished => "FINISHED",
            Self::OverdueSubmission => "OVERDUE SUBMISSION",
            Self::NoSubmission => "NO SUBMISSION",
            Self::MustOnTeam => "MUST BE ON A TEAM",
        }
    }

    /// Returns the constant-style name (`LATE_SUBMIT`).
    pub fn constant_name(&self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::LateSubmit => "LATE_SUBMIT",
            Self::Resubmit => "RESUBMIT",
            Self::LateResubmit => "LATE_RESUBMIT",
            Self::Finished => "FINISHED",
            Self::OverdueSubmission => "OVERDUE_SUBMISSION",
            Self::NoSubmission => "NO_SUBMISSION",
            Self::MustOnTeam => "MUST_ON_TEAM",
        }
    }

    /// Parses a label or constant name, case-insensitively.
    ///
    /// Unknown text yields `None`; see [`Status::from_label_lossy`].
    pub fn from_label(text: &str) -> Option<Status> {
        let wanted = text.trim();
        Self::ALL.into_iter().find(|status| {
            status.label().eq_ignore_ascii_case(wanted)
                || status.constant_name().eq_ignore_ascii_case(wanted)
        })
    }

    /// Parses a label, falling back to [`Status::Default`] for unknown text.
    pub fn from_label_lossy(text: &str) -> Status {
        Self::from_label(text).unwrap_or_else(|| {
            if !text.trim().is_empty() {
                tracing::debug!(status = %text, "Unknown status label, using default");
            }
            Status::Default
        })
    }

    /// Returns true if nothing is left to do for this deadline.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::OverdueSubmission | Self::NoSubmission
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for Status {
    fn from(text: String) -> Self {
        Self::from_label_lossy(&text)
    }
}

impl From<Status> for &'static str {
    fn from(status: Status) -> Self {
        status.label()
    }
}

/// A due date for one assignment of one course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deadline {
    course: String,
    name: String,
    due: CalendarTime,
    #[serde(default)]
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    link: Option<String>,
}

impl Deadline {
    /// Creates a deadline from raw date fields.
    ///
    /// # Errors
    ///
    /// Returns a [`CalendarFormatError`] for the first out-of-range field.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        name: impl Into<String>,
        course: impl Into<String>,
        status: Status,
        link: Option<String>,
    ) -> Result<Self, CalendarFormatError> {
        let due = CalendarTime::new(year, month, day, hour, minute)?;
        Ok(Self::with_due(course, name, due)
            .with_status(status)
            .with_optional_link(link))
    }

    /// Creates a deadline with the default status and no link.
    pub fn with_due(course: impl Into<String>, name: impl Into<String>, due: CalendarTime) -> Self {
        Self {
            course: course.into(),
            name: name.into(),
            due,
            status: Status::Default,
            link: None,
        }
    }

    /// Returns a copy with the given status.
    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Returns a copy with the given link.
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    #[must_use]
    pub fn with_optional_link(mut self, link: Option<String>) -> Self {
        self.link = link.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn due(&self) -> &CalendarTime {
        &self.due
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// Compares due times only. Deadlines due at the same minute are `Equal`
    /// whatever their names.
    pub fn cmp_due(&self, other: &Deadline) -> Ordering {
        self.due.cmp(&other.due)
    }

    /// Time left until (or elapsed since) the due time.
    pub fn remaining_period(&self, reference: &CalendarTime) -> RemainingPeriod {
        RemainingPeriod::between(reference, &self.due)
    }

    /// Returns true once `reference` has reached the due time.
    pub fn is_overdue(&self, reference: &CalendarTime) -> bool {
        !reference.is_before(&self.due)
    }
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.name == other.name && self.course == other.course
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Due time first, then course and name so that distinct deadlines sharing
/// a due time stay distinct in ordered collections.
impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_due(other)
            .then_with(|| self.course.cmp(&other.course))
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Distance between a reference instant and a due time.
///
/// Whole calendar months are counted first from the earlier instant, the
/// remainder is split into days (weeks included), hours and minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemainingPeriod {
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    /// `true` when the due time is still ahead of the reference.
    pub is_future: bool,
}

impl RemainingPeriod {
    /// Computes the period from `reference` to `due`.
    pub fn between(reference: &CalendarTime, due: &CalendarTime) -> Self {
        let reference = reference.to_naive_datetime();
        let due = due.to_naive_datetime();
        if reference < due {
            Self::decompose(reference, due, true)
        } else {
            Self::decompose(due, reference, false)
        }
    }

    fn decompose(earlier: NaiveDateTime, later: NaiveDateTime, is_future: bool) -> Self {
        let mut months = i64::from(later.year() - earlier.year()) * 12 + i64::from(later.month())
            - i64::from(earlier.month());
        let mut anchor = earlier;
        while months > 0 {
            match earlier.checked_add_months(Months::new(months as u32)) {
                Some(stepped) if stepped <= later => {
                    anchor = stepped;
                    break;
                }
                _ => months -= 1,
            }
        }
        let months = months.max(0);

        let total_minutes = (later - anchor).num_minutes();
        Self {
            months: months as u32,
            days: (total_minutes / (24 * 60)) as u32,
            hours: ((total_minutes / 60) % 24) as u32,
            minutes: (total_minutes % 60) as u32,
            is_future,
        }
    }

    /// Whole weeks contained in `days`.
    pub fn weeks(&self) -> u32 {
        self.days / 7
    }

    /// Returns true if the reference and the due time are the same minute.
    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.days == 0 && self.hours == 0 && self.minutes == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ct(y: i32, m: u32, d: u32, h: u32, min: u32) -> CalendarTime {
        CalendarTime::new(y, m, d, h, min).unwrap()
    }

    fn deadline(course: &str, name: &str, due: CalendarTime) -> Deadline {
        Deadline::with_due(course, name, due)
    }

    mod status {
        use super::*;

        #[test]
        fn parses_labels_and_constants() {
            assert_eq!(Status::from_label("LATE SUBMIT"), Some(Status::LateSubmit));
            assert_eq!(Status::from_label("late_submit"), Some(Status::LateSubmit));
            assert_eq!(
                Status::from_label("WAIT FOR SUBMISSION"),
                Some(Status::Default)
            );
            assert_eq!(Status::from_label("MUST_ON_TEAM"), Some(Status::MustOnTeam));
            assert_eq!(Status::from_label("whatever"), None);
            assert_eq!(Status::from_label_lossy("whatever"), Status::Default);
        }

        #[test]
        fn serializes_as_label() {
            let json = serde_json::to_string(&Status::OverdueSubmission).unwrap();
            assert_eq!(json, "\"OVERDUE SUBMISSION\"");
            let parsed: Status = serde_json::from_str("\"RESUBMIT\"").unwrap();
            assert_eq!(parsed, Status::Resubmit);
        }
    }

    mod construction {
        use super::*;
        use crate::time::CalendarField;

        #[test]
        fn new_validates_fields() {
            let d = Deadline::new(
                2019,
                4,
                26,
                23,
                59,
                "HW1",
                "CSCI 1200",
                Status::LateSubmit,
                Some("http://x".to_string()),
            )
            .unwrap();
            assert_eq!(d.name(), "HW1");
            assert_eq!(d.course(), "CSCI 1200");
            assert_eq!(d.due(), &ct(2019, 4, 26, 23, 59));
            assert_eq!(d.status(), Status::LateSubmit);
            assert_eq!(d.link(), Some("http://x"));

            let err = Deadline::new(2019, 4, 26, 24, 0, "HW1", "C", Status::Default, None)
                .unwrap_err();
            assert_eq!(err.field, CalendarField::Hour);
        }

        #[test]
        fn empty_link_is_dropped() {
            let d = deadline("C", "HW", ct(2019, 1, 1, 0, 0)).with_optional_link(Some("  ".into()));
            assert_eq!(d.link(), None);
        }
    }

    mod comparison {
        use super::*;

        #[test]
        fn equality_uses_due_name_and_course() {
            let due = ct(2019, 4, 26, 23, 59);
            let a = deadline("C", "HW1", due).with_status(Status::Finished);
            let b = deadline("C", "HW1", due).with_link("http://other");
            assert_eq!(a, b);
            assert_ne!(a, deadline("C", "HW2", due));
            assert_ne!(a, deadline("D", "HW1", due));
        }

        #[test]
        fn cmp_due_ignores_names() {
            let due = ct(2019, 4, 26, 23, 59);
            let a = deadline("C", "HW1", due);
            let b = deadline("D", "HW2", due);
            assert_eq!(a.cmp_due(&b), Ordering::Equal);
            assert_ne!(a.cmp(&b), Ordering::Equal);
        }

        #[test]
        fn ordered_set_keeps_same_time_deadlines() {
            use std::collections::BTreeSet;
            let due = ct(2019, 4, 26, 23, 59);
            let set: BTreeSet<_> = [deadline("C", "HW1", due), deadline("C", "HW2", due)]
                .into_iter()
                .collect();
            assert_eq!(set.len(), 2);
        }
    }

    mod remaining {
        use super::*;

        #[test]
        fn future_example() {
            let d = deadline("C", "HW", ct(2018, 12, 31, 23, 59));
            let period = d.remaining_period(&ct(2018, 12, 25, 0, 0));
            assert_eq!(
                period,
                RemainingPeriod {
                    months: 0,
                    days: 6,
                    hours: 23,
                    minutes: 59,
                    is_future: true,
                }
            );
        }

        #[test]
        fn swapped_is_past_with_same_magnitude() {
            let d = deadline("C", "HW", ct(2018, 12, 25, 0, 0));
            let period = d.remaining_period(&ct(2018, 12, 31, 23, 59));
            assert!(!period.is_future);
            assert_eq!(
                (period.months, period.days, period.hours, period.minutes),
                (0, 6, 23, 59)
            );
        }

        #[test]
        fn equal_times_are_not_future() {
            let due = ct(2019, 1, 1, 12, 0);
            let period = deadline("C", "HW", due).remaining_period(&due);
            assert!(!period.is_future);
            assert!(period.is_zero());
            assert!(deadline("C", "HW", due).is_overdue(&due));
        }

        #[test]
        fn counts_whole_months_first() {
            let due = ct(2019, 3, 20, 10, 30);
            let period = RemainingPeriod::between(&ct(2019, 1, 15, 8, 0), &due);
            assert_eq!(
                (period.months, period.days, period.hours, period.minutes),
                (2, 5, 2, 30)
            );
        }

        #[test]
        fn partial_month_is_not_counted() {
            // Jan 31 + 1 month clamps to Feb 28, which is past Feb 27.
            let period = RemainingPeriod::between(&ct(2019, 1, 31, 0, 0), &ct(2019, 2, 27, 0, 0));
            assert_eq!(period.months, 0);
            assert_eq!(period.days, 27);
        }

        #[test]
        fn weeks_are_folded_into_days() {
            let period = RemainingPeriod::between(&ct(2019, 4, 1, 0, 0), &ct(2019, 4, 16, 0, 0));
            assert_eq!(period.days, 15);
            assert_eq!(period.weeks(), 2);
        }

        #[test]
        fn is_idempotent() {
            let d = deadline("C", "HW", ct(2020, 2, 29, 12, 0));
            let reference = ct(2019, 11, 30, 18, 45);
            assert_eq!(d.remaining_period(&reference), d.remaining_period(&reference));
        }
    }
}
