use std::sync::Arc;

use reqwest::StatusCode;

/// Represents a result type for operations in the Prefinery client.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur while talking to Prefinery.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The operation is not valid for the current state of the tester (e.g. updating a tester
    /// that was never added). Detected locally, no request was sent.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// An argument was empty or otherwise unusable. Detected locally, no request was sent.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        name: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The tester references a beta that the client does not manage.
    #[error("beta {0} is not managed by this client")]
    UnknownBeta(u64),

    /// Prefinery answered with an unexpected status code.
    ///
    /// `message` holds the text of the `<error>` element when the server supplied one, the
    /// status reason phrase for operations without a response body, or a generic fallback.
    #[error("{message}")]
    Service {
        /// Human-readable error message.
        message: String,
        /// HTTP status of the response, if the error came from a response.
        status: Option<StatusCode>,
    },

    /// The response body was not a well-formed tester document.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Invalid base URL configuration.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// Settings document could not be parsed.
    #[error("invalid settings document")]
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    Configuration(#[source] Arc<serde_json::Error>),

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Network error.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),
}

impl Error {
    /// Returns `true` for errors detected before any request was issued.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::InvalidOperation(_) | Error::InvalidArgument { .. } | Error::UnknownBeta(_)
        )
    }

    pub(crate) fn service(message: impl Into<String>, status: StatusCode) -> Error {
        Error::Service {
            message: message.into(),
            status: Some(status),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        // Request URLs carry the api_key query parameter.
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Configuration(Arc::new(value))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(value: quick_xml::Error) -> Self {
        Error::Parse(value.to_string())
    }
}
