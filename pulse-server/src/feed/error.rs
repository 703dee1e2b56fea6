//! Vehicle feed error types.

use std::fmt;

/// Errors from the vehicle feed.
#[derive(Debug)]
pub enum FeedError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// Response body could not be decoded
    Json {
        message: String,
        body: Option<String>,
    },

    /// Feed returned an error status code
    ApiError { status: u16, message: String },

    /// Rate limited by the feed provider
    RateLimited,

    /// Invalid API key or unauthorized
    Unauthorized,

    /// Reading a snapshot file failed
    Io(std::io::Error),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Http(e) => write!(f, "HTTP error: {e}"),
            FeedError::Json { message, body } => {
                write!(f, "feed decode error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            FeedError::ApiError { status, message } => {
                write!(f, "feed error {status}: {message}")
            }
            FeedError::RateLimited => write!(f, "rate limited by feed provider"),
            FeedError::Unauthorized => write!(f, "unauthorized (invalid API key)"),
            FeedError::Io(e) => write!(f, "feed I/O error: {e}"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Http(e) => Some(e),
            FeedError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err)
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        FeedError::Io(err)
    }
}
