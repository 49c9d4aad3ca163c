//! `duetrack list`: deadlines with the time remaining.

use duetrack_core::{
    CalendarTime, CourseRegistry, Deadline, DeadlineFormatter, OutputFormat, Urgency,
};

use super::Context;
use crate::error::ClientResult;

/// Text printed when nothing is due.
pub const NO_DEADLINES_TEXT: &str = "No deadlines";

/// Picks the deadlines to show, earliest first unless `reverse`.
///
/// Ignored courses are left out unless `all` is set.
pub fn select<'a>(
    registry: &'a CourseRegistry,
    ignored: &'a [String],
    all: bool,
    reverse: bool,
) -> Vec<&'a Deadline> {
    let mut deadlines: Vec<&Deadline> = if all {
        registry.all_sorted()
    } else {
        let mut visible: Vec<&Deadline> = registry
            .visible(ignored)
            .flat_map(|course| course.deadlines())
            .collect();
        visible.sort();
        visible
    };
    if reverse {
        deadlines.reverse();
    }
    deadlines
}

/// Renders the listing relative to `now`.
pub fn render(ctx: &Context, deadlines: &[&Deadline], now: &CalendarTime) -> ClientResult<String> {
    let formatter = DeadlineFormatter::new(ctx.options.clone());
    match ctx.format {
        OutputFormat::Json => Ok(serde_json::to_string(&formatter.format_json_at(deadlines, now))?),
        OutputFormat::Tty if deadlines.is_empty() => Ok(NO_DEADLINES_TEXT.to_string()),
        OutputFormat::Tty => Ok(formatter
            .format_tty_at(deadlines, now)
            .into_iter()
            .map(|line| match line.urgency {
                Urgency::Overdue => format!("! {}", line.text),
                Urgency::Soon => format!("* {}", line.text),
                Urgency::Upcoming | Urgency::Resolved => format!("  {}", line.text),
            })
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

pub fn run(ctx: &Context, reverse: bool, all: bool) -> ClientResult<()> {
    let registry = ctx.load()?;
    let deadlines = select(&registry, &ctx.config.ignored_courses, all, reverse);
    println!("{}", render(ctx, &deadlines, &CalendarTime::now())?);
    Ok(())
}
