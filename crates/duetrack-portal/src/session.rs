//! Login and scrape flow against the portal.
//!
//! A [`PortalSession`] owns one transport (one cookie jar) and walks through
//! `Unauthenticated -> Authenticating -> Authenticated -> Scraping -> Done`,
//! or ends in `Failed` when the login is rejected. Requests are sequential.
//!
//! The transport is released exactly once: by [`PortalSession::close`], or
//! when the session is dropped without being closed.

use std::fmt;

use duetrack_core::{CourseRegistry, Deadline, Status};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::PortalConfig;
use crate::error::{PortalError, PortalResult};
use crate::markup::{self, GradeableClass};
use crate::progress::{FeedbackSender, Progress, ScrapeEvent};
use crate::transport::{HttpTransport, Page, PortalTransport};

/// Suffix of the secondary deadline created for a team lock date.
pub const TEAMS_LOCK_SUFFIX: &str = " (teams lock)";

/// Where a session is in the login/scrape flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Scraping,
    Done,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Scraping => "scraping",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Portal user id and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user_id: String,
    password: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: password.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns true if either part is empty or blank.
    pub fn is_empty(&self) -> bool {
        self.user_id.trim().is_empty() || self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A per-course or per-gradeable problem that did not stop the scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeFailure {
    pub course: String,
    /// `None` when the whole course page failed.
    pub gradeable: Option<String>,
    pub reason: String,
}

impl fmt::Display for ScrapeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.gradeable {
            Some(gradeable) => write!(f, "{} / {}: {}", self.course, gradeable, self.reason),
            None => write!(f, "{}: {}", self.course, self.reason),
        }
    }
}

/// Everything a scrape produced.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub registry: CourseRegistry,
    pub failures: Vec<ScrapeFailure>,
    /// Gradeables skipped because they were already graded or closed.
    pub skipped_resolved: usize,
    /// Courses to hide when displaying; they are scraped like the others.
    pub ignored: Vec<String>,
    /// Course pages visited.
    pub courses_seen: usize,
}

impl ScrapeReport {
    /// No failure at all.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Some deadlines were read but something failed.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() && self.registry.deadline_count() > 0
    }

    /// Nothing was read and something failed.
    pub fn is_total_failure(&self) -> bool {
        !self.failures.is_empty() && self.registry.deadline_count() == 0
    }

    fn fail(&mut self, course: &str, gradeable: Option<&str>, reason: impl fmt::Display) {
        let failure = ScrapeFailure {
            course: course.to_string(),
            gradeable: gradeable.map(str::to_string),
            reason: reason.to_string(),
        };
        warn!(%failure, "Scrape step failed");
        self.failures.push(failure);
    }
}

/// A logged-in (or about to be) portal session.
pub struct PortalSession {
    config: PortalConfig,
    transport: Option<Box<dyn PortalTransport>>,
    state: SessionState,
    progress: Progress,
}

impl PortalSession {
    /// Creates a session over the given transport.
    pub fn new(config: PortalConfig, transport: Box<dyn PortalTransport>) -> Self {
        Self {
            config,
            transport: Some(transport),
            state: SessionState::Unauthenticated,
            progress: Progress::default(),
        }
    }

    /// Creates a session over HTTP.
    pub fn connect(config: PortalConfig) -> PortalResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(config, Box::new(transport)))
    }

    /// Reports progress on `sender`.
    pub fn with_progress(mut self, sender: Option<FeedbackSender>) -> Self {
        self.progress = Progress::new(sender);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    fn transport(&self) -> PortalResult<&dyn PortalTransport> {
        self.transport.as_deref().ok_or(PortalError::InvalidState {
            expected: "open session",
            actual: "closed",
        })
    }

    fn expect_state(&self, expected: SessionState) -> PortalResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PortalError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    fn url(&self, joined: Result<Url, url::ParseError>) -> PortalResult<Url> {
        joined.map_err(|e| {
            PortalError::invalid_response(self.config.base_url.as_str(), e.to_string())
        })
    }

    /// Logs in with the login form of the portal.
    ///
    /// Empty credentials are rejected before any request. There is no retry:
    /// a rejected login leaves the session in [`SessionState::Failed`].
    #[instrument(skip_all, fields(user_id = %credentials.user_id()))]
    pub async fn login(&mut self, credentials: &Credentials) -> PortalResult<()> {
        if credentials.is_empty() {
            return Err(PortalError::EmptyCredentials);
        }
        self.expect_state(SessionState::Unauthenticated)?;

        self.state = SessionState::Authenticating;
        self.progress.feedback(ScrapeEvent::LoggingIn);
        match self.submit_login(credentials).await {
            Ok(()) => {
                self.state = SessionState::Authenticated;
                self.progress.feedback(ScrapeEvent::LoggedIn);
                info!("Logged in to portal");
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }

    async fn submit_login(&self, credentials: &Credentials) -> PortalResult<()> {
        let login_url = self.url(self.config.login_url())?;
        let page = self.transport()?.get(login_url).await?;
        let form = markup::find_login_form(&page.body)?;

        let action = match &form.action {
            Some(action) => self.url(page.url.join(action))?,
            None => page.url.clone(),
        };
        debug!(%action, hidden = form.hidden_fields.len(), "Submitting login form");
        let fields = form.fields(&credentials.user_id, &credentials.password);
        let response = self.transport()?.post_form(action, fields).await?;

        if markup::is_login_rejected(&response.body) {
            return Err(PortalError::LoginFailed(
                markup::LOGIN_FAILURE_TEXT.to_string(),
            ));
        }
        if markup::find_login_form(&response.body).is_ok() {
            return Err(PortalError::LoginFailed(
                "the login form was shown again".to_string(),
            ));
        }
        Ok(())
    }

    /// Scrapes every course of the configured semester.
    ///
    /// One failing course page or gradeable is recorded in the report and
    /// the scrape goes on. Courses listed in `ignored` are scraped too; the
    /// list is only carried in the report.
    #[instrument(skip_all, fields(semester = %self.config.semester_prefix))]
    pub async fn scrape_all_courses(&mut self, ignored: &[String]) -> PortalResult<ScrapeReport> {
        self.expect_state(SessionState::Authenticated)?;
        self.state = SessionState::Scraping;

        match self.scrape(ignored).await {
            Ok(report) => {
                self.state = SessionState::Done;
                self.progress.feedback(ScrapeEvent::Finished {
                    success: report.is_success(),
                });
                info!(
                    courses = report.courses_seen,
                    deadlines = report.registry.deadline_count(),
                    failures = report.failures.len(),
                    skipped = report.skipped_resolved,
                    "Scrape finished"
                );
                Ok(report)
            }
            Err(err) => {
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }

    async fn scrape(&self, ignored: &[String]) -> PortalResult<ScrapeReport> {
        let home_url = self.url(self.config.home_url())?;
        let home = self.transport()?.get(home_url).await?;
        let courses = markup::find_course_links(&home.body, &self.config.semester_prefix)?;
        debug!(count = courses.len(), "Found course buttons");

        let mut report = ScrapeReport {
            ignored: ignored.to_vec(),
            ..ScrapeReport::default()
        };
        let total = courses.len();
        for (index, course) in courses.into_iter().enumerate() {
            if ignored.contains(&course.name) {
                debug!(course = %course.name, "Scraping ignored course");
            }
            self.progress.feedback(ScrapeEvent::Course {
                name: course.name.clone(),
                index: index + 1,
                total,
            });

            let page = match home.url.join(&course.href) {
                Ok(url) => self.transport()?.get(url).await,
                Err(e) => Err(PortalError::invalid_response(&course.href, e.to_string())),
            };
            match page {
                Ok(page) => {
                    report.courses_seen += 1;
                    self.scrape_course(&course.name, &page, &mut report);
                }
                Err(err) => report.fail(&course.name, None, err),
            }
        }
        Ok(report)
    }

    fn scrape_course(&self, course: &str, page: &Page, report: &mut ScrapeReport) {
        let rows = match markup::find_gradeables(&page.body) {
            Ok(rows) => rows,
            Err(err) => {
                report.fail(course, None, err);
                return;
            }
        };
        debug!(%course, rows = rows.len(), "Reading gradeables");

        for raw in rows {
            match markup::classify_gradeable(&raw) {
                Ok(GradeableClass::Resolved { name, marker }) => {
                    debug!(%course, gradeable = %name, %marker, "Skipping resolved gradeable");
                    report.skipped_resolved += 1;
                }
                Ok(GradeableClass::Open(gradeable)) => {
                    let link = gradeable.link.as_deref().map(|href| {
                        page.url
                            .join(href)
                            .map_or_else(|_| href.to_string(), |url| url.to_string())
                    });
                    if let Some(lock) = gradeable.teams_lock {
                        let name = format!("{}{TEAMS_LOCK_SUFFIX}", gradeable.name);
                        report.registry.insert_deadline(
                            Deadline::with_due(course, name, lock)
                                .with_status(Status::MustOnTeam)
                                .with_optional_link(link.clone()),
                        );
                    }
                    report.registry.insert_deadline(
                        Deadline::with_due(course, gradeable.name, gradeable.due)
                            .with_status(gradeable.status)
                            .with_optional_link(link),
                    );
                }
                Err(err) => {
                    let gradeable = raw.text.chars().take(60).collect::<String>();
                    report.fail(course, Some(&gradeable), err);
                }
            }
        }
    }

    /// Logs in, scrapes, and closes the session whatever the outcome.
    pub async fn fetch(
        mut self,
        credentials: &Credentials,
        ignored: &[String],
    ) -> PortalResult<ScrapeReport> {
        let result = match self.login(credentials).await {
            Ok(()) => self.scrape_all_courses(ignored).await,
            Err(err) => Err(err),
        };
        if result.is_err() {
            self.progress.feedback(ScrapeEvent::Finished { success: false });
        }
        self.close();
        result
    }

    /// Releases the transport.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            debug!(state = %self.state, "Portal session closed");
        }
    }
}

impl Drop for PortalSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Opens an HTTP session, logs in, scrapes and closes.
pub async fn fetch_deadlines(
    config: PortalConfig,
    credentials: &Credentials,
    ignored: &[String],
    progress: Option<FeedbackSender>,
) -> PortalResult<ScrapeReport> {
    PortalSession::connect(config)?
        .with_progress(progress)
        .fetch(credentials, ignored)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn config() -> PortalConfig {
        PortalConfig::new("https://portal.test/").unwrap()
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("student", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("student"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn blank_credentials_are_empty() {
        assert!(Credentials::new("", "pw").is_empty());
        assert!(Credentials::new("  ", "pw").is_empty());
        assert!(Credentials::new("id", "").is_empty());
        assert!(!Credentials::new("id", "pw").is_empty());
    }

    #[test]
    fn report_outcomes() {
        let mut report = ScrapeReport::default();
        assert!(report.is_success());
        report.fail("C", Some("HW"), "bad date");
        assert!(report.is_total_failure());
        assert!(!report.is_partial());
        assert_eq!(report.failures[0].to_string(), "C / HW: bad date");
    }

    #[test]
    fn close_releases_transport_once() {
        let transport = MemoryTransport::new();
        let session = PortalSession::new(config(), Box::new(transport.clone()));
        session.close();
        assert_eq!(transport.close_count(), 1);

        let session = PortalSession::new(config(), Box::new(transport.clone()));
        drop(session);
        assert_eq!(transport.close_count(), 2);
    }

    #[tokio::test]
    async fn scrape_requires_login() {
        let transport = MemoryTransport::new();
        let mut session = PortalSession::new(config(), Box::new(transport.clone()));
        let err = session.scrape_all_courses(&[]).await.unwrap_err();
        assert!(matches!(
            err,
            PortalError::InvalidState {
                expected: "authenticated",
                actual: "unauthenticated"
            }
        ));
        assert!(transport.requests().is_empty());
    }
}
