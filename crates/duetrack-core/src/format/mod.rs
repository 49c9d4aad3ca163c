//! Output formatting for deadlines.
//!
//! - **TTY**: one line per deadline with the time remaining, optional OSC8
//!   hyperlinks
//! - **JSON**: machine-readable output
//! - **Month grid**: a small text calendar marking days with deadlines

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::Month;
use serde::{Deserialize, Serialize};

use crate::course::CourseRegistry;
use crate::deadline::{Deadline, RemainingPeriod};
use crate::time::{CalendarTime, days_in_month};

const DEFAULT_SOON_THRESHOLD_HOURS: u32 = 24;

/// Output format for deadline lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human-readable terminal output.
    #[default]
    Tty,
    /// Machine-readable JSON output.
    Json,
}

/// How pressing a deadline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// The due time has passed.
    Overdue,
    /// Due within the configured threshold.
    Soon,
    Upcoming,
    /// Nothing left to do (finished or closed).
    Resolved,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overdue => "overdue",
            Self::Soon => "soon",
            Self::Upcoming => "upcoming",
            Self::Resolved => "resolved",
        }
    }
}

/// Configuration options for output formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Maximum length for assignment names (truncated with ellipsis).
    pub max_title_length: Option<usize>,
    /// Deadlines due within this many hours are marked as soon.
    pub soon_threshold_hours: u32,
    /// Whether to wrap names in OSC8 hyperlinks when a link is known.
    pub hyperlinks: bool,
    /// Whether to append the status label to TTY lines.
    pub show_status: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            max_title_length: None,
            soon_threshold_hours: DEFAULT_SOON_THRESHOLD_HOURS,
            hyperlinks: true,
            show_status: true,
        }
    }
}

/// JSON output for machine consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    pub deadlines: Vec<JsonDeadline>,
    /// The first deadline that is not overdue, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_deadline: Option<JsonDeadline>,
    pub count: usize,
}

/// A single deadline in JSON format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDeadline {
    pub course: String,
    /// Assignment name (may be truncated).
    pub name: String,
    /// Due time as `YYYY-MM-DD HH:MM`.
    pub due: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub remaining: RemainingPeriod,
    /// Remaining time as displayed on the terminal.
    pub remaining_display: String,
    pub urgency: Urgency,
}

/// A formatted deadline line with metadata.
#[derive(Debug, Clone)]
pub struct FormattedDeadline {
    pub text: String,
    pub urgency: Urgency,
}

/// Formats deadlines for display.
#[derive(Debug, Clone)]
pub struct DeadlineFormatter {
    options: FormatOptions,
}

impl DeadlineFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    pub fn with_defaults() -> Self {
        Self::new(FormatOptions::default())
    }

    /// Formats deadlines for the terminal relative to the current time.
    pub fn format_tty(&self, deadlines: &[&Deadline]) -> Vec<FormattedDeadline> {
        self.format_tty_at(deadlines, &CalendarTime::now())
    }

    /// Formats deadlines for the terminal relative to `now`.
    pub fn format_tty_at(
        &self,
        deadlines: &[&Deadline],
        now: &CalendarTime,
    ) -> Vec<FormattedDeadline> {
        deadlines
            .iter()
            .map(|deadline| FormattedDeadline {
                text: self.format_line(deadline, now),
                urgency: self.urgency(deadline, now),
            })
            .collect()
    }

    pub fn format_json(&self, deadlines: &[&Deadline]) -> JsonOutput {
        self.format_json_at(deadlines, &CalendarTime::now())
    }

    pub fn format_json_at(&self, deadlines: &[&Deadline], now: &CalendarTime) -> JsonOutput {
        let json: Vec<JsonDeadline> = deadlines
            .iter()
            .map(|deadline| self.to_json(deadline, now))
            .collect();
        let next_deadline = deadlines
            .iter()
            .find(|deadline| !deadline.is_overdue(now))
            .map(|deadline| self.to_json(deadline, now));

        JsonOutput {
            count: json.len(),
            deadlines: json,
            next_deadline,
        }
    }

    fn format_line(&self, deadline: &Deadline, now: &CalendarTime) -> String {
        let remaining = format_remaining(&deadline.remaining_period(now));
        let mut line = format!(
            "{} - {}: {} ({})",
            deadline.due(),
            deadline.course(),
            self.format_title(deadline),
            remaining
        );
        if self.options.show_status {
            let _ = write!(line, " [{}]", deadline.status());
        }
        line
    }

    fn format_title(&self, deadline: &Deadline) -> String {
        let title = self.truncate_title(deadline.name());
        match deadline.link() {
            Some(link) if self.options.hyperlinks => make_hyperlink(link, &title),
            _ => title.into_owned(),
        }
    }

    fn truncate_title<'a>(&self, title: &'a str) -> Cow<'a, str> {
        match self.options.max_title_length {
            Some(max_len) => ellipsis(title, max_len),
            None => Cow::Borrowed(title),
        }
    }

    /// Computes the urgency of a deadline at `now`.
    pub fn urgency(&self, deadline: &Deadline, now: &CalendarTime) -> Urgency {
        if deadline.status().is_resolved() {
            return Urgency::Resolved;
        }
        let period = deadline.remaining_period(now);
        if !period.is_future {
            return Urgency::Overdue;
        }
        let hours = u64::from(period.days) * 24 + u64::from(period.hours);
        if period.months == 0 && hours < u64::from(self.options.soon_threshold_hours) {
            Urgency::Soon
        } else {
            Urgency::Upcoming
        }
    }

    fn to_json(&self, deadline: &Deadline, now: &CalendarTime) -> JsonDeadline {
        let remaining = deadline.remaining_period(now);
        JsonDeadline {
            course: deadline.course().to_string(),
            name: self.truncate_title(deadline.name()).into_owned(),
            due: deadline.due().to_string(),
            status: deadline.status().label().to_string(),
            link: deadline.link().map(str::to_string),
            remaining_display: format_remaining(&remaining),
            remaining,
            urgency: self.urgency(deadline, now),
        }
    }
}

/// Formats a remaining period, e.g. `in 6 days, 23 hours and 59 minutes`
/// or `overdue by 2 hours`.
pub fn format_remaining(period: &RemainingPeriod) -> String {
    let parts: Vec<String> = [
        (period.months, "month"),
        (period.days, "day"),
        (period.hours, "hour"),
        (period.minutes, "minute"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, unit)| pluralize(count, unit))
    .collect();

    let Some((last, rest)) = parts.split_last() else {
        return "due now".to_string();
    };
    let joined = if rest.is_empty() {
        last.clone()
    } else {
        format!("{} and {}", rest.join(", "), last)
    };

    if period.is_future {
        format!("in {joined}")
    } else {
        format!("overdue by {joined}")
    }
}

fn pluralize(count: u32, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Renders a month as a text grid, weeks starting on Monday.
///
/// Days holding at least one deadline of `registry` are followed by `*`.
pub fn render_month(year: i32, month: u32, registry: &CourseRegistry) -> String {
    let marked: BTreeSet<u32> = registry
        .courses()
        .flat_map(|course| course.deadlines())
        .map(Deadline::due)
        .filter(|due| due.year() == year && due.month() == month)
        .map(|due| due.day())
        .collect();

    let title = u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map_or("?", |m| m.name());
    let mut out = format!("{title} {year}\nMo Tu We Th Fr Sa Su\n");

    let offset = CalendarTime::new(year, month, 1, 0, 0)
        .map(|first| first.first_weekday_of_month().num_days_from_monday())
        .unwrap_or(0);
    let mut row = "   ".repeat(offset as usize);
    let mut column = offset;
    for day in 1..=days_in_month(year, month) {
        let mark = if marked.contains(&day) { '*' } else { ' ' };
        let _ = write!(row, "{day:>2}{mark}");
        column += 1;
        if column == 7 {
            out.push_str(row.trim_end());
            out.push('\n');
            row.clear();
            column = 0;
        }
    }
    if !row.is_empty() {
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}

/// Truncates a string with an ellipsis if it exceeds `max_len` characters.
pub fn ellipsis(s: &str, max_len: usize) -> Cow<'_, str> {
    if max_len == 0 {
        return Cow::Borrowed("");
    }
    if s.chars().count() <= max_len {
        return Cow::Borrowed(s);
    }
    let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
    Cow::Owned(format!("{truncated}..."))
}

/// Creates an OSC8 hyperlink for terminal output.
pub fn make_hyperlink(url: &str, label: &str) -> String {
    format!("\x1b]8;;{url}\x1b\\{label}\x1b]8;;\x1b\\")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::Status;

    fn ct(y: i32, m: u32, d: u32, h: u32, min: u32) -> CalendarTime {
        CalendarTime::new(y, m, d, h, min).unwrap()
    }

    mod ellipsis_tests {
        use super::*;

        #[test]
        fn short_string_unchanged() {
            assert_eq!(ellipsis("HW1", 10), "HW1");
        }

        #[test]
        fn long_string_truncated() {
            assert_eq!(ellipsis("Homework Assignment 4", 10), "Homewor...");
        }

        #[test]
        fn zero_length() {
            assert_eq!(ellipsis("HW1", 0), "");
        }
    }

    #[test]
    fn hyperlink_is_osc8() {
        assert_eq!(
            make_hyperlink("http://x", "HW1"),
            "\x1b]8;;http://x\x1b\\HW1\x1b]8;;\x1b\\"
        );
    }

    mod remaining {
        use super::*;

        fn period(
            months: u32,
            days: u32,
            hours: u32,
            minutes: u32,
            is_future: bool,
        ) -> RemainingPeriod {
            RemainingPeriod {
                months,
                days,
                hours,
                minutes,
                is_future,
            }
        }

        #[test]
        fn future_and_past() {
            assert_eq!(
                format_remaining(&period(0, 6, 23, 59, true)),
                "in 6 days, 23 hours and 59 minutes"
            );
            assert_eq!(format_remaining(&period(0, 0, 2, 0, false)), "overdue by 2 hours");
            assert_eq!(
                format_remaining(&period(1, 1, 0, 1, true)),
                "in 1 month, 1 day and 1 minute"
            );
        }

        #[test]
        fn zero_is_due_now() {
            assert_eq!(format_remaining(&RemainingPeriod::default()), "due now");
        }
    }

    mod urgency {
        use super::*;

        #[test]
        fn classifies_by_remaining_time() {
            let formatter = DeadlineFormatter::with_defaults();
            let now = ct(2019, 4, 26, 12, 0);
            let soon = Deadline::with_due("C", "A", ct(2019, 4, 26, 23, 59));
            let later = Deadline::with_due("C", "B", ct(2019, 5, 26, 23, 59));
            let past = Deadline::with_due("C", "D", ct(2019, 4, 1, 0, 0));
            let done = past.clone().with_status(Status::Finished);

            assert_eq!(formatter.urgency(&soon, &now), Urgency::Soon);
            assert_eq!(formatter.urgency(&later, &now), Urgency::Upcoming);
            assert_eq!(formatter.urgency(&past, &now), Urgency::Overdue);
            assert_eq!(formatter.urgency(&done, &now), Urgency::Resolved);
        }
    }

    mod month_grid {
        use super::*;

        #[test]
        fn april_2019_with_marks() {
            let registry: CourseRegistry =
                [Deadline::with_due("C", "HW1", ct(2019, 4, 26, 23, 59))]
                    .into_iter()
                    .collect();
            let grid = render_month(2019, 4, &registry);
            let expected = "April 2019\n\
                            Mo Tu We Th Fr Sa Su\n\
                            \x201  2  3  4  5  6  7\n\
                            \x208  9 10 11 12 13 14\n\
                            15 16 17 18 19 20 21\n\
                            22 23 24 25 26*27 28\n\
                            29 30\n";
            assert_eq!(grid, expected);
        }

        #[test]
        fn leading_offset_follows_first_weekday() {
            // February 2019 started on a Friday.
            let grid = render_month(2019, 2, &CourseRegistry::new());
            let first_week = grid.lines().nth(2).unwrap();
            assert_eq!(first_week, format!("{} 1  2  3", " ".repeat(12)));
            assert!(grid.ends_with("25 26 27 28\n"));
        }
    }
}
