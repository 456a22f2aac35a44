//! Error types for Activity Flux

use thiserror::Error;

/// Errors raised by the pure aggregation and presentation layers
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid goal {0}: goals must be positive and finite")]
    InvalidGoal(f64),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Misaligned series: {metric} has {found} values but there are {expected} dates")]
    MisalignedSeries {
        metric: String,
        expected: usize,
        found: usize,
    },

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors raised by an activity repository
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport unreachable (connect, timeout, DNS)
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Response body was not the expected payload
    #[error("decode error: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// HTTP status for server errors
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Server {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

impl From<ComputeError> for FetchError {
    fn from(e: ComputeError) -> Self {
        FetchError::Decode(e.to_string())
    }
}

/// Errors from operations that validate locally and then reach the repository
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
