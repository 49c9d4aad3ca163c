//! Course portal scraper.
//!
//! Logs in to the portal with a user id and password, lists the courses of
//! one semester and turns their open gradeables into deadlines.
//!
//! ```ignore
//! # async fn run() -> duetrack_portal::PortalResult<()> {
//! use duetrack_portal::{Credentials, PortalConfig, fetch_deadlines};
//!
//! let config = PortalConfig::new("https://portal.example.edu/")
//!     .map_err(|e| duetrack_portal::PortalError::invalid_response("config", e.to_string()))?;
//! let report = fetch_deadlines(config, &Credentials::new("student", "secret"), &[], None).await?;
//! println!("{} deadlines", report.registry.deadline_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod markup;
pub mod progress;
pub mod session;
pub mod transport;

pub use config::PortalConfig;
pub use error::{PortalError, PortalErrorCode, PortalResult};
pub use progress::{FeedbackReceiver, FeedbackSender, ScrapeEvent, feedback_channel};
pub use session::{
    Credentials, PortalSession, ScrapeFailure, ScrapeReport, SessionState, TEAMS_LOCK_SUFFIX,
    fetch_deadlines,
};
pub use transport::{
    BoxFuture, HttpTransport, MemoryResponse, MemoryTransport, Page, PortalTransport,
    RecordedRequest,
};
