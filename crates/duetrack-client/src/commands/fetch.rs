//! `duetrack fetch`: scrape the portal and update the deadline file.

use duetrack_core::{CourseRegistry, OutputFormat, save_path};
use duetrack_portal::{FeedbackReceiver, ScrapeReport, feedback_channel, fetch_deadlines};
use serde::Serialize;
use tracing::{debug, info};

use super::{Context, load_registry};
use crate::error::{ClientError, ClientResult};

/// How a fetch went, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    Success,
    /// Some deadlines were read but some courses or gradeables failed.
    Partial,
    /// Nothing could be read.
    Failure,
}

impl FetchOutcome {
    pub fn of(report: &ScrapeReport) -> Self {
        if report.is_total_failure() {
            Self::Failure
        } else if report.is_success() {
            Self::Success
        } else {
            Self::Partial
        }
    }
}

/// Summary printed after a fetch.
#[derive(Debug, Clone, Serialize)]
pub struct FetchSummary {
    pub outcome: FetchOutcome,
    pub courses: usize,
    pub deadlines: usize,
    /// Deadlines not in the file before.
    pub new_deadlines: usize,
    pub skipped_resolved: usize,
    pub failures: Vec<String>,
}

impl FetchSummary {
    fn text(&self) -> String {
        let mut text = match self.outcome {
            FetchOutcome::Success => format!(
                "Fetched {} deadlines from {} courses ({} new)",
                self.deadlines, self.courses, self.new_deadlines
            ),
            FetchOutcome::Partial => format!(
                "Fetched {} deadlines from {} courses ({} new), {} problems:",
                self.deadlines,
                self.courses,
                self.new_deadlines,
                self.failures.len()
            ),
            FetchOutcome::Failure => {
                format!("No deadline could be read, {} problems:", self.failures.len())
            }
        };
        for failure in &self.failures {
            text.push_str("\n  ");
            text.push_str(failure);
        }
        text
    }
}

/// Merges the scraped deadlines into `stored` (or replaces it).
///
/// Returns the resulting registry and how many deadlines are new.
pub fn merge_report(
    stored: CourseRegistry,
    report: &ScrapeReport,
    replace: bool,
) -> (CourseRegistry, usize) {
    if replace {
        let new = report
            .registry
            .courses()
            .flat_map(|course| course.deadlines())
            .filter(|d| stored.get_deadline(d.course(), d.name()).is_none())
            .count();
        return (report.registry.clone(), new);
    }
    let mut merged = stored;
    let new = merged.merge(report.registry.clone());
    (merged, new)
}

/// Prints progress events to stderr until the sender goes away.
async fn show_progress(mut receiver: FeedbackReceiver) {
    while receiver.changed().await.is_ok() {
        let event = receiver.borrow_and_update().clone();
        eprintln!("{event}");
    }
}

pub async fn run(
    ctx: &Context,
    user_id: Option<&str>,
    password: Option<&str>,
    replace: bool,
) -> ClientResult<()> {
    let portal = ctx.config.portal.to_portal_config().map_err(ClientError::Config)?;
    let credentials = ctx.config.portal.resolve_credentials(user_id, password)?;
    // Loaded first so that an unreadable file fails before any network call.
    let stored = load_registry(&ctx.data_file)?;

    let (sender, receiver) = feedback_channel();
    let progress =
        (ctx.format == OutputFormat::Tty).then(|| tokio::spawn(show_progress(receiver)));

    info!(portal = %portal.base_url, "Fetching deadlines");
    let ignored = &ctx.config.ignored_courses;
    let result = fetch_deadlines(portal, &credentials, ignored, Some(sender)).await;
    if let Some(handle) = progress {
        if let Err(e) = handle.await {
            debug!(error = %e, "Progress task ended abnormally");
        }
    }
    let report = result?;

    let outcome = FetchOutcome::of(&report);
    let summary = FetchSummary {
        outcome,
        courses: report.courses_seen,
        deadlines: report.registry.deadline_count(),
        new_deadlines: 0,
        skipped_resolved: report.skipped_resolved,
        failures: report.failures.iter().map(ToString::to_string).collect(),
    };
    if outcome == FetchOutcome::Failure {
        return Err(ClientError::Fetch(summary.text()));
    }

    let (registry, new_deadlines) = merge_report(stored, &report, replace);
    save_path(&ctx.data_file, &registry)?;
    let summary = FetchSummary {
        new_deadlines,
        ..summary
    };

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&summary)?),
        OutputFormat::Tty => println!("{}", summary.text()),
    }
    Ok(())
}
