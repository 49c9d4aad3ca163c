//! Local deadline files.
//!
//! Deadlines can be kept in JSON or CSV files. Loading is lenient: a record
//! that cannot be read is skipped and reported in the [`LoadReport`] while
//! the rest of the file is still loaded. Only structural problems (unreadable
//! file, malformed JSON, unsupported format) fail the whole operation.

mod csv;
mod json;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::course::CourseRegistry;
use crate::time::CalendarFormatError;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreFormat {
    Json,
    Csv,
    /// iCalendar; recognized but neither loaded nor saved.
    Ics,
}

impl StoreFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Ics => "ics",
        }
    }

    /// Picks the format from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "ics" | "ical" => Ok(Self::Ics),
            _ => Err(StoreError::UnknownFormat(path.to_path_buf())),
        }
    }
}

impl fmt::Display for StoreFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural failures of a load or save.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed {format} file: {message}")]
    Malformed {
        format: StoreFormat,
        message: String,
    },

    #[error("{0} files are not supported")]
    Unsupported(StoreFormat),

    #[error("cannot tell the format of {}", .0.display())]
    UnknownFormat(PathBuf),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn malformed(format: StoreFormat, message: impl Into<String>) -> Self {
        Self::Malformed {
            format,
            message: message.into(),
        }
    }
}

/// Identifies one record of a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub course: String,
    pub assignment: String,
}

impl RecordKey {
    pub fn new(course: impl Into<String>, assignment: impl Into<String>) -> Self {
        Self {
            course: course.into(),
            assignment: assignment.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.course, self.assignment)
    }
}

/// Why a record was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("{record}: missing field `{field}`")]
    MissingField {
        record: String,
        field: &'static str,
    },

    #[error("{record}: field `{field}` is not an integer")]
    InvalidNumber {
        record: String,
        field: &'static str,
    },

    #[error("{record}: {source}")]
    Calendar {
        record: String,
        #[source]
        source: CalendarFormatError,
    },

    #[error("line {line}: expected at least {expected} fields, found {found}")]
    TooFewFields {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{record}: not an object")]
    NotAnObject { record: String },
}

/// Result of loading a file: what was loaded and what was skipped, in file
/// order.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub registry: CourseRegistry,
    pub outcomes: Vec<Result<RecordKey, SkipReason>>,
}

impl LoadReport {
    /// Number of records loaded.
    pub fn loaded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_ok()).count()
    }

    /// Reasons for every skipped record.
    pub fn skipped(&self) -> impl Iterator<Item = &SkipReason> {
        self.outcomes.iter().filter_map(|outcome| outcome.as_ref().err())
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    /// A load succeeds when at least one record was read.
    pub fn is_success(&self) -> bool {
        self.loaded() > 0
    }

    /// Some records loaded and some skipped.
    pub fn is_partial(&self) -> bool {
        self.is_success() && self.skipped_count() > 0
    }

    fn record(&mut self, outcome: Result<RecordKey, SkipReason>) {
        if let Err(reason) = &outcome {
            tracing::warn!(%reason, "Skipping record");
        }
        self.outcomes.push(outcome);
    }
}

/// Parses file contents in the given format.
pub fn load_str(format: StoreFormat, contents: &str) -> Result<LoadReport, StoreError> {
    match format {
        StoreFormat::Json => json::parse(contents),
        StoreFormat::Csv => Ok(csv::parse(contents)),
        StoreFormat::Ics => Err(StoreError::Unsupported(format)),
    }
}

/// Renders a registry in the given format.
pub fn save_string(format: StoreFormat, registry: &CourseRegistry) -> Result<String, StoreError> {
    match format {
        StoreFormat::Json => json::render(registry),
        StoreFormat::Csv => Ok(csv::render(registry)),
        StoreFormat::Ics => Err(StoreError::Unsupported(format)),
    }
}

/// Loads a file, choosing the format from its extension.
pub fn load_path(path: &Path) -> Result<LoadReport, StoreError> {
    let format = StoreFormat::from_path(path)?;
    if format == StoreFormat::Ics {
        return Err(StoreError::Unsupported(format));
    }
    let contents = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let report = load_str(format, &contents)?;
    tracing::debug!(
        path = %path.display(),
        %format,
        loaded = report.loaded(),
        skipped = report.skipped_count(),
        "Loaded deadline file"
    );
    Ok(report)
}

/// Saves a registry, choosing the format from the extension.
///
/// Parent directories are created as needed.
pub fn save_path(path: &Path, registry: &CourseRegistry) -> Result<(), StoreError> {
    let format = StoreFormat::from_path(path)?;
    let contents = save_string(format, registry)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| StoreError::io(path, e))?;
    tracing::debug!(
        path = %path.display(),
        %format,
        deadlines = registry.deadline_count(),
        "Saved deadline file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            StoreFormat::from_path(Path::new("a/b.JSON")).unwrap(),
            StoreFormat::Json
        );
        assert_eq!(
            StoreFormat::from_path(Path::new("b.csv")).unwrap(),
            StoreFormat::Csv
        );
        assert_eq!(
            StoreFormat::from_path(Path::new("b.ics")).unwrap(),
            StoreFormat::Ics
        );
        assert!(matches!(
            StoreFormat::from_path(Path::new("notes.txt")),
            Err(StoreError::UnknownFormat(_))
        ));
    }

    #[test]
    fn ics_is_unsupported() {
        assert!(matches!(
            load_str(StoreFormat::Ics, "BEGIN:VCALENDAR"),
            Err(StoreError::Unsupported(StoreFormat::Ics))
        ));
        assert!(matches!(
            save_string(StoreFormat::Ics, &CourseRegistry::new()),
            Err(StoreError::Unsupported(StoreFormat::Ics))
        ));
    }

    #[test]
    fn report_accounting() {
        let mut report = LoadReport::default();
        assert!(!report.is_success());
        report.record(Ok(RecordKey::new("C", "HW1")));
        assert!(report.is_success());
        assert!(!report.is_partial());
        report.record(Err(SkipReason::TooFewFields {
            line: 3,
            expected: 7,
            found: 6,
        }));
        assert_eq!(report.loaded(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert!(report.is_partial());
    }

    #[test]
    fn skip_reason_messages() {
        let reason = SkipReason::MissingField {
            record: RecordKey::new("C", "HW1").to_string(),
            field: "year",
        };
        assert_eq!(reason.to_string(), "C/HW1: missing field `year`");
    }
}
