//! Core types: calendar time, deadlines, courses, due-text parsing, stores,
//! formatting

pub mod course;
pub mod deadline;
pub mod due_text;
pub mod format;
pub mod store;
pub mod time;
pub mod tracing;

pub use course::{Course, CourseRegistry};
pub use deadline::{Deadline, RemainingPeriod, Status};
pub use due_text::{DueKind, DueTextError, parse_due_text};
pub use format::{
    DeadlineFormatter, FormatOptions, FormattedDeadline, JsonDeadline, JsonOutput, OutputFormat,
    Urgency, ellipsis, format_remaining, make_hyperlink, render_month,
};
pub use store::{LoadReport, RecordKey, SkipReason, StoreError, StoreFormat, load_path, save_path};
pub use time::{CalendarField, CalendarFormatError, CalendarTime, ParseCalendarTimeError};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
