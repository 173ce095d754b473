//! HTTP transport abstraction.
//!
//! Every remote call in the crate (release API lookups, artifact downloads,
//! CI requests) goes through the [`HttpTransport`] trait, so components can
//! be tested against scripted transports instead of live servers.
//!
//! ```text
//! AssetResolver ─┐
//! DiskCache ─────┼──► HttpTransport ──► ReqwestTransport (blocking reqwest)
//! JenkinsServer ─┘
//! ```

mod reqwest_transport;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use reqwest_transport::ReqwestTransport;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised by an [`HttpTransport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// A download was answered with a non-success status.
    #[error("GET {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Writing the downloaded body failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// HTTP method subset used by the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Headers in insertion order; duplicates are sent as-is.
    pub headers: Vec<(String, String)>,
    /// Form-encoded body fields (POST only).
    pub form: BTreeMap<String, String>,
    /// HTTP basic credentials.
    pub basic_auth: Option<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            form: BTreeMap::new(),
            basic_auth: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn form(mut self, form: BTreeMap<String, String>) -> Self {
        self.form = form;
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(key.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True for 4xx and 5xx statuses.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Blocking HTTP transport.
pub trait HttpTransport: Send + Sync {
    /// Send a request and buffer the whole response.
    ///
    /// Non-success statuses are returned as responses, not errors; the
    /// caller decides what a status means.
    fn send(&self, request: &HttpRequest) -> TransportResult<HttpResponse>;

    /// Stream a GET response body into `dest`, returning the byte count.
    ///
    /// Non-success statuses fail with [`TransportError::Status`].
    fn download(&self, request: &HttpRequest, dest: &Path) -> TransportResult<u64>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn send(&self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        (**self).send(request)
    }

    fn download(&self, request: &HttpRequest, dest: &Path) -> TransportResult<u64> {
        (**self).download(request, dest)
    }
}

impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    fn send(&self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        (**self).send(request)
    }

    fn download(&self, request: &HttpRequest, dest: &Path) -> TransportResult<u64> {
        (**self).download(request, dest)
    }
}
