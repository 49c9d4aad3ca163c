//! HTTP access to the portal.
//!
//! [`PortalTransport`] is the seam between the session logic and the network.
//! [`HttpTransport`] talks to the real portal with a cookie-keeping reqwest
//! client; [`MemoryTransport`] serves canned pages.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::PortalConfig;
use crate::error::{PortalError, PortalResult};

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Final URL after redirects; relative links resolve against it.
    pub url: Url,
    pub body: String,
}

/// Access to portal pages over one shared session (cookies).
///
/// Requests are issued one at a time; implementations do not need to
/// support concurrent use of the session cursor.
pub trait PortalTransport: Send + Sync {
    /// Fetches a page.
    fn get(&self, url: Url) -> BoxFuture<'_, PortalResult<Page>>;

    /// Submits an url-encoded form and returns the resulting page.
    fn post_form(
        &self,
        url: Url,
        fields: Vec<(String, String)>,
    ) -> BoxFuture<'_, PortalResult<Page>>;

    /// Releases the session. Later requests fail.
    fn close(&mut self);
}

/// Transport backed by a reqwest client with a cookie store.
pub struct HttpTransport {
    client: Option<Client>,
}

impl HttpTransport {
    /// Builds a client with the configured timeout and user agent.
    pub fn new(config: &PortalConfig) -> PortalResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| PortalError::network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&self) -> PortalResult<&Client> {
        self.client.as_ref().ok_or(PortalError::InvalidState {
            expected: "open transport",
            actual: "closed",
        })
    }
}

impl PortalTransport for HttpTransport {
    fn get(&self, url: Url) -> BoxFuture<'_, PortalResult<Page>> {
        Box::pin(async move {
            trace!(%url, "GET");
            let response = self.client()?.get(url.clone()).send().await?;
            handle_response(url, response).await
        })
    }

    fn post_form(
        &self,
        url: Url,
        fields: Vec<(String, String)>,
    ) -> BoxFuture<'_, PortalResult<Page>> {
        Box::pin(async move {
            trace!(%url, fields = fields.len(), "POST");
            let response = self
                .client()?
                .post(url.clone())
                .form(&fields)
                .send()
                .await?;
            handle_response(url, response).await
        })
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("Closed portal HTTP session");
        }
    }
}

/// Maps the response status and reads the body.
async fn handle_response(requested: Url, response: Response) -> PortalResult<Page> {
    let status = response.status();
    let url = response.url().clone();
    trace!(status = %status, %url, "Received response");

    match status {
        s if s.is_success() => {
            let body = response.text().await?;
            Ok(Page { url, body })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortalError::Authentication {
            url: requested.to_string(),
            status: status.as_u16(),
        }),
        s if s.is_server_error() => Err(PortalError::Server {
            url: requested.to_string(),
            status: s.as_u16(),
        }),
        s => {
            warn!(status = %s, url = %requested, "Unexpected response status");
            Err(PortalError::invalid_response(
                requested.as_str(),
                format!("unexpected status {s}"),
            ))
        }
    }
}

/// A canned response of a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub enum MemoryResponse {
    Page(String),
    /// An HTTP error status, mapped like [`HttpTransport`] maps it.
    Status(u16),
}

/// A request seen by a [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct SharedLog {
    requests: Mutex<Vec<RecordedRequest>>,
    closes: AtomicUsize,
}

/// In-memory transport serving pages by absolute URL.
///
/// Clones share the request log and close counter, so a caller can keep a
/// handle while a session owns the transport.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    get: HashMap<String, MemoryResponse>,
    post: HashMap<String, MemoryResponse>,
    log: Arc<SharedLog>,
    closed: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for GET requests to `url`.
    pub fn with_page(self, url: &str, body: impl Into<String>) -> Self {
        self.with_get(url, MemoryResponse::Page(body.into()))
    }

    pub fn with_get(mut self, url: &str, response: MemoryResponse) -> Self {
        self.get.insert(url.to_string(), response);
        self
    }

    /// Serves `response` for form posts to `url`.
    pub fn with_post(mut self, url: &str, response: MemoryResponse) -> Self {
        self.post.insert(url.to_string(), response);
        self
    }

    /// Every request issued so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log
            .requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// How many times `close` was called across all clones.
    pub fn close_count(&self) -> usize {
        self.log.closes.load(Ordering::SeqCst)
    }

    fn respond(
        &self,
        method: &'static str,
        url: Url,
        fields: Vec<(String, String)>,
    ) -> PortalResult<Page> {
        if self.closed {
            return Err(PortalError::InvalidState {
                expected: "open transport",
                actual: "closed",
            });
        }
        if let Ok(mut requests) = self.log.requests.lock() {
            requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                fields,
            });
        }
        let routes = if method == "POST" { &self.post } else { &self.get };
        match routes.get(url.as_str()) {
            Some(MemoryResponse::Page(body)) => Ok(Page {
                url,
                body: body.clone(),
            }),
            Some(MemoryResponse::Status(code)) => Err(status_error(&url, *code)),
            None => Err(status_error(&url, 404)),
        }
    }
}

fn status_error(url: &Url, code: u16) -> PortalError {
    match code {
        401 | 403 => PortalError::Authentication {
            url: url.to_string(),
            status: code,
        },
        500..=599 => PortalError::Server {
            url: url.to_string(),
            status: code,
        },
        _ => PortalError::invalid_response(url.as_str(), format!("unexpected status {code}")),
    }
}

impl PortalTransport for MemoryTransport {
    fn get(&self, url: Url) -> BoxFuture<'_, PortalResult<Page>> {
        Box::pin(async move { self.respond("GET", url, Vec::new()) })
    }

    fn post_form(
        &self,
        url: Url,
        fields: Vec<(String, String)>,
    ) -> BoxFuture<'_, PortalResult<Page>> {
        Box::pin(async move { self.respond("POST", url, fields) })
    }

    fn close(&mut self) {
        self.closed = true;
        self.log.closes.fetch_add(1, Ordering::SeqCst);
    }
}
