//! `duetrack month`: a month grid with the days holding deadlines marked.

use duetrack_core::{CalendarTime, CourseRegistry, render_month};

use super::Context;
use crate::error::{ClientError, ClientResult};

/// Renders the month, defaulting to the month of `now`.
///
/// Ignored courses are not marked.
pub fn render(
    registry: &CourseRegistry,
    ignored: &[String],
    year: Option<i32>,
    month: Option<u32>,
    now: &CalendarTime,
) -> ClientResult<String> {
    let year = year.unwrap_or(now.year());
    let month = month.unwrap_or(now.month());
    // Validates both fields the same way stored deadlines are.
    CalendarTime::new(year, month, 1, 0, 0).map_err(|e| ClientError::Input(e.to_string()))?;

    let visible: CourseRegistry = registry
        .visible(ignored)
        .flat_map(|course| course.deadlines())
        .cloned()
        .collect();
    Ok(render_month(year, month, &visible))
}

pub fn run(ctx: &Context, year: Option<i32>, month: Option<u32>) -> ClientResult<()> {
    let registry = ctx.load()?;
    let grid = render(
        &registry,
        &ctx.config.ignored_courses,
        year,
        month,
        &CalendarTime::now(),
    )?;
    print!("{grid}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use duetrack_core::{Deadline, Status};

    fn registry() -> CourseRegistry {
        [
            Deadline::new(2019, 4, 3, 23, 59, "HW3", "Data Structures", Status::Default, None)
                .unwrap(),
            Deadline::new(2019, 4, 10, 12, 0, "Quiz 2", "Calculus II", Status::Default, None)
                .unwrap(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn defaults_to_current_month() {
        let now = CalendarTime::new(2019, 4, 1, 8, 0).unwrap();
        let grid = render(&registry(), &[], None, None, &now).unwrap();
        assert!(grid.starts_with("April 2019\n"), "{grid}");
        assert!(grid.contains(" 3*"), "{grid}");
        assert!(grid.contains("10*"), "{grid}");
    }

    #[test]
    fn ignored_courses_are_not_marked() {
        let now = CalendarTime::new(2019, 4, 1, 8, 0).unwrap();
        let ignored = vec!["Calculus II".to_string()];
        let grid = render(&registry(), &ignored, None, None, &now).unwrap();
        assert!(grid.contains(" 3*"), "{grid}");
        assert!(!grid.contains("10*"), "{grid}");
    }

    #[test]
    fn invalid_month_is_rejected() {
        let now = CalendarTime::new(2019, 4, 1, 8, 0).unwrap();
        assert!(matches!(
            render(&registry(), &[], Some(2019), Some(13), &now),
            Err(ClientError::Input(_))
        ));
    }
}
