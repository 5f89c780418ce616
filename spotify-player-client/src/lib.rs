use snafu::prelude::*;
use std::time::Duration;

pub mod client;
pub mod models;
pub mod params;
pub mod transport;

pub use client::{CatalogClient, ClientConfig};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug, Clone, PartialEq)]
pub enum Error {
    /// Rejected before anything was sent, or a 4xx the service explains in its message.
    #[snafu(display("invalid argument: {message}"))]
    InvalidArgument { message: String },
    /// Token missing, expired or lacking scope. Re-authenticate.
    #[snafu(display("unauthorized: {message}"))]
    Unauthorized { message: String },
    #[snafu(display("not found: {message}"))]
    NotFound { message: String },
    #[snafu(display("rate limited: {message}"))]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },
    /// Network failure, timeout or a 5xx from the service.
    #[snafu(display("service unavailable: {message}"))]
    Unavailable { message: String },
    #[snafu(display("malformed response: {message}"))]
    MalformedResponse { message: String },
}

impl Error {
    /// True when the same call may succeed later without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. } | Error::Unavailable { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        let message = if value.is_timeout() {
            "request timed out".to_string()
        } else {
            value.to_string()
        };

        Error::Unavailable { message }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::MalformedResponse {
            message: value.to_string(),
        }
    }
}
