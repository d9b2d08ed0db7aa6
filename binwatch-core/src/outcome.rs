//! Terminal result of one reporting call.

use std::fmt;

use crate::ports::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Coarse category of a failed delivery, kept for callers and log records.
pub enum FailureCode {
    /// The backend could not be reached (DNS, refused, reset).
    Connect,
    /// No response arrived within the configured timeout.
    Timeout,
    /// The request could not be built or sent.
    Request,
    /// The backend answered with a non-success status while rejections are enabled.
    Rejected(u16),
    /// The reading cannot be represented as a JSON number.
    InvalidReading,
    /// The status document could not be serialized.
    Encode,
    /// Any other transport failure.
    Other,
}

impl fmt::Display for FailureCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCode::Connect => write!(formatter, "connect"),
            FailureCode::Timeout => write!(formatter, "timeout"),
            FailureCode::Request => write!(formatter, "request"),
            FailureCode::Rejected(status) => write!(formatter, "rejected:{status}"),
            FailureCode::InvalidReading => write!(formatter, "invalid-reading"),
            FailureCode::Encode => write!(formatter, "encode"),
            FailureCode::Other => write!(formatter, "other"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
/// Why a reading was not delivered.
pub enum DeliveryFailure {
    /// The transport failed before a response was observed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The backend answered with a non-success status.
    #[error("Backend rejected the reading with status {status}")]
    Rejected {
        /// HTTP status returned by the backend.
        status: u16,
    },
    /// The reading is NaN or infinite.
    #[error("Reading {0} is not a finite number")]
    InvalidReading(f32),
    /// Serializing the status document failed.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DeliveryFailure {
    /// Category of this failure.
    #[must_use]
    pub fn code(&self) -> FailureCode {
        match self {
            DeliveryFailure::Transport(err) => err.code(),
            DeliveryFailure::Rejected { status } => FailureCode::Rejected(*status),
            DeliveryFailure::InvalidReading(_) => FailureCode::InvalidReading,
            DeliveryFailure::Encode(_) => FailureCode::Encode,
        }
    }
}

#[derive(Debug)]
/// Outcome of [`TelemetryReporter::report`](crate::reporter::TelemetryReporter::report).
pub enum DeliveryOutcome {
    /// The transport completed the request.
    Delivered {
        /// HTTP status observed. Informational unless rejections are enabled.
        status: u16,
    },
    /// The reading was not delivered.
    Failed(DeliveryFailure),
}

impl DeliveryOutcome {
    /// Whether the reading reached the backend.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    /// The failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&DeliveryFailure> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::Failed(failure) => Some(failure),
        }
    }

    /// Convert into a `Result` carrying the observed status.
    ///
    /// # Errors
    ///
    /// Returns the [`DeliveryFailure`] when the reading was not delivered.
    pub fn into_result(self) -> Result<u16, DeliveryFailure> {
        match self {
            DeliveryOutcome::Delivered { status } => Ok(status),
            DeliveryOutcome::Failed(failure) => Err(failure),
        }
    }
}
