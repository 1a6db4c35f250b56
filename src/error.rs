//! Error handling

use std::fmt;

/// Errors returned by the generation clients.
#[derive(Debug)]
pub enum JobError {
    /// The model or operation does not exist (HTTP 404).
    NotFound(String),
    /// The service is overloaded or rate limiting (HTTP 429/503).
    Overloaded(String),
    /// The service rejected the request shape (HTTP 400).
    BadRequest(String),
    /// The request or the poll loop ran out of time.
    Timeout,
    /// Every candidate model refused the job.
    NoModelAvailable,
    /// A finished operation reported an error.
    Service {
        /// Vendor error code, if one was supplied.
        code: Option<i64>,
        /// Vendor error message.
        message: String,
    },
    /// The response could not be decoded.
    Malformed(String),
    /// The brief failed a precondition.
    Validation(String),
    /// Writing outputs failed.
    Io(std::io::Error),
    /// Anything else.
    Unknown(String),
}

impl JobError {
    /// Classifies a non-success HTTP status and its body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("HTTP {status}: {}", truncate(body, 500));
        match status {
            404 => Self::NotFound(detail),
            429 | 503 => Self::Overloaded(detail),
            400 => Self::BadRequest(detail),
            _ => Self::Unknown(detail),
        }
    }

    /// True when the next fallback candidate should be tried.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Overloaded(_))
    }
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(detail) => {
                write!(f, "Model not found, clear the selection and retry: {detail}")
            }
            Self::Overloaded(detail) => {
                write!(f, "Service overloaded, try again later: {detail}")
            }
            Self::BadRequest(detail) => write!(f, "Request rejected: {detail}"),
            Self::Timeout => write!(f, "Timed out waiting for the service"),
            Self::NoModelAvailable => write!(f, "No model available to accept the job"),
            Self::Service { code, message } => match code {
                Some(code) => write!(f, "Service reported error (code {code}): {message}"),
                None => write!(f, "Service reported error: {message}"),
            },
            Self::Malformed(detail) => write!(f, "Malformed response: {detail}"),
            Self::Validation(detail) => write!(f, "Invalid brief: {detail}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Unknown(detail) => write!(f, "Unexpected error: {detail}"),
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for JobError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            JobError::Timeout
        } else if err.is_decode() {
            JobError::Malformed(err.to_string())
        } else {
            JobError::Unknown(err.to_string())
        }
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        JobError::Malformed(err.to_string())
    }
}

impl From<base64::DecodeError> for JobError {
    fn from(err: base64::DecodeError) -> Self {
        JobError::Malformed(format!("invalid base64 payload: {err}"))
    }
}

impl From<url::ParseError> for JobError {
    fn from(err: url::ParseError) -> Self {
        JobError::Unknown(format!("invalid endpoint url: {err}"))
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::Io(err)
    }
}
