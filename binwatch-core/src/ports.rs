//! Traits describing the collaborators of the reporter and shared request types.

use std::io;
use std::time::Duration;

use reqwest::Error as ReqwestError;
use reqwest::{Method, Url};

use crate::model::Measurement;
use crate::outcome::FailureCode;

#[derive(thiserror::Error, Debug)]
/// Errors raised by a transport while opening or performing a request.
pub enum TransportError {
    /// The backend could not be reached.
    #[error("Connection failed: {0}")]
    Connect(String),
    /// The request did not complete in time.
    #[error("Request timed out: {0}")]
    Timeout(String),
    /// The request was malformed or could not be sent.
    #[error("Invalid request: {0}")]
    Request(String),
    /// Anything the transport cannot classify further.
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Category preserved in the delivery outcome.
    #[must_use]
    pub fn code(&self) -> FailureCode {
        match self {
            TransportError::Connect(_) => FailureCode::Connect,
            TransportError::Timeout(_) => FailureCode::Timeout,
            TransportError::Request(_) => FailureCode::Request,
            TransportError::Other(_) => FailureCode::Other,
        }
    }
}

impl From<ReqwestError> for TransportError {
    fn from(err: ReqwestError) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_builder() || err.is_request() {
            TransportError::Request(message)
        } else {
            TransportError::Other(message)
        }
    }
}

#[derive(Debug, Clone)]
/// Destination and method shared by every request the reporter issues.
pub struct RequestConfig {
    /// Fully resolved backend URL.
    pub url: Url,
    /// HTTP method, always POST for status documents.
    pub method: Method,
    /// Upper bound for one request, connect to response head.
    pub timeout: Duration,
}

impl RequestConfig {
    /// POST configuration for the given URL.
    #[must_use]
    pub fn post(url: Url, timeout: Duration) -> Self {
        Self {
            url,
            method: Method::POST,
            timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What the transport observed when the request completed.
pub struct TransportResponse {
    /// HTTP status code of the response.
    pub status: u16,
}

/// Factory for per-request handles.
///
/// Implementations are shared between threads; every handle they return is owned by
/// exactly one request and released when dropped.
pub trait Transport: Send + Sync {
    /// Acquire a handle configured for `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no handle can be acquired.
    fn open(&self, config: &RequestConfig) -> Result<Box<dyn RequestHandle>, TransportError>;
}

/// A single in-flight request. Dropping it releases everything it holds.
pub trait RequestHandle {
    /// Set a request header, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Request`] for invalid header names or values.
    fn set_header(&mut self, name: &str, value: &str) -> Result<(), TransportError>;

    /// Attach `body` with its exact length and perform the request, blocking until the
    /// response head arrives or the transport gives up.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response was observed.
    fn perform(&mut self, body: &[u8]) -> Result<TransportResponse, TransportError>;
}

/// Source of fill-level readings, polled once per reporting cycle.
pub trait MeasurementSource {
    /// Next reading, or `None` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] when the underlying device or stream fails.
    fn next_reading(&mut self) -> Result<Option<Measurement>, io::Error>;
}
