//! CSV deadline files.
//!
//! The first line is a header and is ignored. Each following line is
//! `course,assignment,month,day,year,hour,minute,status[,link]`. Fields may
//! be double-quoted; a quoted field can contain commas, line breaks and `""`
//! escapes.

use std::fmt::Write as _;

use super::{LoadReport, RecordKey, SkipReason};
use crate::course::CourseRegistry;
use crate::deadline::{Deadline, Status};
use crate::time::CalendarTime;

pub(super) const HEADER: &str = "course,assignment,month,day,year,hour,minute,status,link";

/// Rows shorter than this are skipped; the status column may be missing.
const MIN_FIELDS: usize = 7;

pub(super) fn parse(contents: &str) -> LoadReport {
    let mut report = LoadReport::default();
    for (line, fields) in split_records(contents).into_iter().skip(1) {
        let outcome = read_row(line, &fields).map(|deadline| {
            let key = RecordKey::new(deadline.course(), deadline.name());
            report.registry.insert_deadline(deadline);
            key
        });
        report.record(outcome);
    }
    report
}

fn read_row(line: usize, fields: &[String]) -> Result<Deadline, SkipReason> {
    if fields.len() < MIN_FIELDS {
        return Err(SkipReason::TooFewFields {
            line,
            expected: MIN_FIELDS,
            found: fields.len(),
        });
    }
    let course = fields[0].trim();
    let assignment = fields[1].trim();
    let record = RecordKey::new(course, assignment).to_string();

    let number = |index: usize, field: &'static str| {
        fields[index]
            .trim()
            .parse::<i64>()
            .map_err(|_| SkipReason::InvalidNumber {
                record: record.clone(),
                field,
            })
    };
    let month = number(2, "month")?;
    let day = number(3, "day")?;
    let year = number(4, "year")?;
    let hour = number(5, "hour")?;
    let minute = number(6, "minute")?;
    let due = CalendarTime::from_raw(year, month, day, hour, minute).map_err(|source| {
        SkipReason::Calendar {
            record: record.clone(),
            source,
        }
    })?;

    let status = fields
        .get(7)
        .map(|s| Status::from_label_lossy(s))
        .unwrap_or_default();
    let link = fields.get(8).map(|s| s.trim().to_string());

    Ok(Deadline::with_due(course, assignment, due)
        .with_status(status)
        .with_optional_link(link))
}

/// Splits the file into records, honoring double quotes.
///
/// Each record carries the line it starts on. Blank lines are dropped.
fn split_records(contents: &str) -> Vec<(usize, Vec<String>)> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut line = 1;
    let mut start = 1;
    let mut chars = contents.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            '\r' if !quoted && chars.peek() == Some(&'\n') => {}
            '\n' if quoted => {
                current.push('\n');
                line += 1;
            }
            '\n' => {
                end_record(&mut records, start, &mut fields, &mut current);
                line += 1;
                start = line;
            }
            _ => current.push(c),
        }
    }
    end_record(&mut records, start, &mut fields, &mut current);
    records
}

fn end_record(
    records: &mut Vec<(usize, Vec<String>)>,
    start: usize,
    fields: &mut Vec<String>,
    current: &mut String,
) {
    let last = std::mem::take(current);
    if fields.is_empty() && last.trim().is_empty() {
        return;
    }
    fields.push(last);
    records.push((start, std::mem::take(fields)));
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub(super) fn render(registry: &CourseRegistry) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for course in registry.courses() {
        for (assignment, deadline) in course {
            let due = deadline.due();
            // Writing to a String cannot fail.
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{}",
                quote(course.name()),
                quote(assignment),
                due.month(),
                due.day(),
                due.year(),
                due.hour(),
                due.minute(),
                deadline.status().label(),
                quote(deadline.link().unwrap_or_default()),
            );
        }
    }
    out
}
