//! Progress feedback for a portal scrape

use std::fmt;

/// An event that happens during a scrape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScrapeEvent {
    #[default]
    NotStarted,
    LoggingIn,
    LoggedIn,
    /// Scraping the `index`-th course (1-based) out of `total`.
    Course {
        name: String,
        index: usize,
        total: usize,
    },
    Finished {
        success: bool,
    },
}

impl fmt::Display for ScrapeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "Not started"),
            Self::LoggingIn => write!(f, "Logging in..."),
            Self::LoggedIn => write!(f, "Logged in"),
            Self::Course { name, index, total } => {
                write!(f, "[{index}/{total}] Reading {name}...")
            }
            Self::Finished { success: true } => write!(f, "Scrape finished"),
            Self::Finished { success: false } => write!(f, "Scrape finished with errors"),
        }
    }
}

/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<ScrapeEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<ScrapeEvent>;

/// Creates a channel reporting the current step of a scrape.
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(ScrapeEvent::default())
}

/// Optional feedback sink carried by a session.
#[derive(Debug, Default)]
pub(crate) struct Progress {
    sender: Option<FeedbackSender>,
}

impl Progress {
    pub(crate) fn new(sender: Option<FeedbackSender>) -> Self {
        Self { sender }
    }

    /// Publishes `event` to the listener, if any.
    pub(crate) fn feedback(&self, event: ScrapeEvent) {
        tracing::debug!(%event, "Scrape progress");
        if let Some(sender) = &self.sender {
            sender.send_replace(event);
        }
    }
}
