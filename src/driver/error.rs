//! Error types for page drivers.

use thiserror::Error;

/// Errors that can occur while loading or reading a page.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The step did not finish within its timeout.
    #[error("timed out after {timeout_ms}ms while {action}")]
    Timeout {
        /// What the driver was doing.
        action: String,
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u128,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error loading {url}: {source}")]
    Http {
        /// The URL that failed to load.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} loading {url}")]
    Status {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A page query was made before any page was loaded.
    #[error("no page has been loaded")]
    NoPage,

    /// The loaded page has no element matching the selector.
    #[error("no element matches {selector}")]
    ContentNotFound {
        /// The selector that matched nothing.
        selector: String,
    },

    /// The selector could not be parsed.
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector {
        /// The selector text.
        selector: String,
        /// Parser message.
        message: String,
    },

    /// The URL is malformed or uses an unsupported scheme.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl DriverError {
    pub(crate) fn timeout(action: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            action: action.into(),
            timeout_ms: timeout.as_millis(),
        }
    }
}
