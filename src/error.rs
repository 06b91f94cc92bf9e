//! Error types for client calls.
//!
//! Only failures that prevent a response from being classified are errors.
//! A malformed body or a non-2xx status is an [`Outcome`](crate::Outcome),
//! not an [`Error`].

use http::StatusCode;

/// The main error type for client calls.
///
/// # Examples
///
/// ```no_run
/// use wirecall::{Client, Error, Outcome};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .host("https://api.example.com")?
///     .build()?;
///
/// match client.get("/orgs/acme").await {
///     Ok(Outcome::Success { data, .. }) => println!("Org: {:?}", data),
///     Ok(Outcome::ApiError { status, .. }) => eprintln!("Service said {}", status),
///     Ok(Outcome::ClientError { raw_text, .. }) => eprintln!("Unreadable body: {}", raw_text),
///     Err(Error::Aborted) => eprintln!("Cancelled"),
///     Err(e) => eprintln!("Transport failure: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    ///
    /// This wraps the underlying `reqwest::Error` and indicates problems at the
    /// network layer rather than the HTTP protocol layer.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The request was cancelled through its abort signal.
    #[error("Request aborted")]
    Aborted,

    /// Invalid configuration was provided, such as a bad header or a missing host.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The request body could not be represented as JSON.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A typed view was requested from an outcome that is not a success.
    #[error("Expected a successful response, got status {status}")]
    UnexpectedOutcome {
        /// The status code of the outcome.
        status: StatusCode,
    },

    /// The response data did not match the requested type.
    #[error("Response data does not match the expected shape: {0}")]
    DataMismatch(#[source] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err)
        }
    }
}

impl Error {
    /// Returns `true` if this error is potentially retryable.
    ///
    /// Network errors and timeouts are retryable. Aborts, configuration
    /// problems and data mismatches are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use wirecall::Error;
    ///
    /// assert!(Error::Timeout.is_retryable());
    /// assert!(!Error::Aborted.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Timeout => true,
            Error::Aborted => false,
            Error::ConfigurationError(_) => false,
            Error::SerializationFailed(_) => false,
            Error::InvalidUrl(_) => false,
            Error::UnexpectedOutcome { .. } => false,
            Error::DataMismatch(_) => false,
        }
    }
}

/// A specialized `Result` type for client calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[tokio::test]
    async fn test_network_error_keeps_its_source() {
        // Nothing listens on port 1.
        let err: Error = reqwest::get("http://127.0.0.1:1/").await.unwrap_err().into();

        assert!(matches!(err, Error::Network(_)));
        assert!(err.source().is_some());
    }
}
