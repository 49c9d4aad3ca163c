//! `duetrack add` and `duetrack remove`.

use duetrack_core::{CalendarTime, CourseRegistry, Deadline, Status, save_path};
use tracing::info;

use super::Context;
use crate::error::{ClientError, ClientResult};

/// Parses a status given on the command line.
pub fn parse_status(label: Option<&str>) -> ClientResult<Status> {
    match label {
        None => Ok(Status::Default),
        Some(label) => Status::from_label(label).ok_or_else(|| {
            let known: Vec<&str> = Status::ALL.iter().map(Status::label).collect();
            ClientError::Input(format!(
                "unknown status `{label}` (expected one of: {})",
                known.join(", ")
            ))
        }),
    }
}

/// Inserts the deadline, returning the one it replaced.
pub fn add_to(
    registry: &mut CourseRegistry,
    course: &str,
    assignment: &str,
    due: CalendarTime,
    status: Status,
    link: Option<String>,
) -> ClientResult<Option<Deadline>> {
    if course.trim().is_empty() || assignment.trim().is_empty() {
        return Err(ClientError::Input(
            "course and assignment names must not be empty".to_string(),
        ));
    }
    let deadline = Deadline::with_due(course.trim(), assignment.trim(), due)
        .with_status(status)
        .with_optional_link(link);
    Ok(registry.insert_deadline(deadline))
}

pub fn add(
    ctx: &Context,
    course: &str,
    assignment: &str,
    due: CalendarTime,
    status: Option<&str>,
    link: Option<String>,
) -> ClientResult<()> {
    let status = parse_status(status)?;
    let mut registry = ctx.load()?;
    let replaced = add_to(&mut registry, course, assignment, due, status, link)?;
    save_path(&ctx.data_file, &registry)?;

    info!(%course, %assignment, %due, "Deadline saved");
    match replaced {
        Some(old) => println!("Updated {course}: {assignment} (was due {})", old.due()),
        None => println!("Added {course}: {assignment} due {due}"),
    }
    Ok(())
}

pub fn remove(ctx: &Context, course: &str, assignment: &str) -> ClientResult<()> {
    let mut registry = ctx.load()?;
    if registry.remove_deadline(course, assignment).is_none() {
        return Err(ClientError::Input(format!(
            "no deadline `{assignment}` in course `{course}`"
        )));
    }
    save_path(&ctx.data_file, &registry)?;
    println!("Removed {course}: {assignment}");
    Ok(())
}
