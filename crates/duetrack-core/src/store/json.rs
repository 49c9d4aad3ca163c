//! JSON deadline files.
//!
//! ```json
//! { "CSCI 1200": { "HW1": { "year": 2019, "month": 4, "day": 26,
//!                           "hour": 23, "minute": 59,
//!                           "status": "LATE SUBMIT", "link": "https://..." } } }
//! ```
//!
//! `date` is accepted as an alias of `day` when loading.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{LoadReport, RecordKey, SkipReason, StoreError, StoreFormat};
use crate::course::CourseRegistry;
use crate::deadline::{Deadline, Status};
use crate::time::CalendarTime;

#[derive(Serialize)]
struct JsonRecord<'a> {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
}

pub(super) fn parse(contents: &str) -> Result<LoadReport, StoreError> {
    let root: Value = serde_json::from_str(contents)?;
    let Value::Object(courses) = root else {
        return Err(StoreError::malformed(
            StoreFormat::Json,
            "top level is not an object",
        ));
    };

    let mut report = LoadReport::default();
    for (course, assignments) in &courses {
        let Value::Object(assignments) = assignments else {
            report.record(Err(SkipReason::NotAnObject {
                record: course.clone(),
            }));
            continue;
        };
        for (assignment, record) in assignments {
            let key = RecordKey::new(course.as_str(), assignment.as_str());
            let outcome = read_record(&key, record).map(|deadline| {
                report.registry.insert_deadline(deadline);
                key
            });
            report.record(outcome);
        }
    }
    Ok(report)
}

fn read_record(key: &RecordKey, record: &Value) -> Result<Deadline, SkipReason> {
    let Value::Object(fields) = record else {
        return Err(SkipReason::NotAnObject {
            record: key.to_string(),
        });
    };

    let year = integer(key, fields, &["year"])?;
    let month = integer(key, fields, &["month"])?;
    let day = integer(key, fields, &["day", "date"])?;
    let hour = integer(key, fields, &["hour"])?;
    let minute = integer(key, fields, &["minute"])?;
    let due = CalendarTime::from_raw(year, month, day, hour, minute).map_err(|source| {
        SkipReason::Calendar {
            record: key.to_string(),
            source,
        }
    })?;

    let status = fields
        .get("status")
        .and_then(Value::as_str)
        .map(Status::from_label_lossy)
        .unwrap_or_default();
    let link = fields
        .get("link")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Deadline::with_due(&key.course, &key.assignment, due)
        .with_status(status)
        .with_optional_link(link))
}

/// Reads the first present alias as an integer.
fn integer(
    key: &RecordKey,
    fields: &Map<String, Value>,
    aliases: &[&'static str],
) -> Result<i64, SkipReason> {
    let (field, value) = aliases
        .iter()
        .find_map(|alias| fields.get(*alias).map(|value| (*alias, value)))
        .ok_or_else(|| SkipReason::MissingField {
            record: key.to_string(),
            field: aliases[0],
        })?;
    value.as_i64().ok_or_else(|| SkipReason::InvalidNumber {
        record: key.to_string(),
        field,
    })
}

pub(super) fn render(registry: &CourseRegistry) -> Result<String, StoreError> {
    let document: BTreeMap<&str, BTreeMap<&str, JsonRecord<'_>>> = registry
        .courses()
        .map(|course| {
            let records = course
                .iter()
                .map(|(assignment, deadline)| {
                    let due = deadline.due();
                    let record = JsonRecord {
                        year: due.year(),
                        month: due.month(),
                        day: due.day(),
                        hour: due.hour(),
                        minute: due.minute(),
                        status: deadline.status().label(),
                        link: deadline.link(),
                    };
                    (assignment.as_str(), record)
                })
                .collect();
            (course.name(), records)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "CSCI 1200": {
            "HW1": { "year": 2019, "month": 4, "day": 26, "hour": 23, "minute": 59,
                     "status": "LATE SUBMIT", "link": "http://x" },
            "HW2": { "month": 5, "day": 1, "hour": 12, "minute": 0 }
        },
        "MATH 2010": {
            "Quiz": { "year": 2019, "month": 5, "date": 3, "hour": 9, "minute": 30 }
        }
    }"#;

    #[test]
    fn missing_year_skips_only_that_record() {
        let report = parse(SAMPLE).unwrap();
        assert!(report.is_success());
        assert!(report.is_partial());
        assert_eq!(report.loaded(), 2);
        let skipped: Vec<_> = report.skipped().collect();
        assert_eq!(
            skipped,
            vec![&SkipReason::MissingField {
                record: "CSCI 1200/HW2".to_string(),
                field: "year",
            }]
        );

        let hw1 = report.registry.get_deadline("CSCI 1200", "HW1").unwrap();
        assert_eq!(hw1.status(), Status::LateSubmit);
        assert_eq!(hw1.link(), Some("http://x"));
        let quiz = report.registry.get_deadline("MATH 2010", "Quiz").unwrap();
        assert_eq!(quiz.due().day(), 3);
    }

    #[test]
    fn zero_valid_records_is_failure() {
        let report =
            parse(r#"{"C": {"HW": {"year": 2019, "month": 13, "day": 1, "hour": 0, "minute": 0}}}"#)
                .unwrap();
        assert!(!report.is_success());
        assert!(matches!(
            report.skipped().next(),
            Some(SkipReason::Calendar { .. })
        ));

        let report = parse("{}").unwrap();
        assert!(!report.is_success());
    }

    #[test]
    fn non_integer_field_is_skipped() {
        let report =
            parse(r#"{"C": {"HW": {"year": "2019", "month": 1, "day": 1, "hour": 0, "minute": 0}}}"#)
                .unwrap();
        assert!(matches!(
            report.skipped().next(),
            Some(SkipReason::InvalidNumber { field: "year", .. })
        ));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(parse("not json"), Err(StoreError::Json(_))));
        assert!(matches!(
            parse("[1, 2]"),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn render_layout() {
        let registry: CourseRegistry = [Deadline::with_due(
            "C",
            "HW1",
            CalendarTime::new(2019, 4, 26, 23, 59).unwrap(),
        )]
        .into_iter()
        .collect();
        let rendered: Value = serde_json::from_str(&render(&registry).unwrap()).unwrap();
        assert_eq!(
            rendered,
            serde_json::json!({
                "C": { "HW1": {
                    "year": 2019, "month": 4, "day": 26, "hour": 23, "minute": 59,
                    "status": "WAIT FOR SUBMISSION"
                } }
            })
        );
    }
}
