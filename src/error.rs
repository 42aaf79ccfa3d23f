//! Error types for the mail-otp crate.
//!
//! Only failures the caller can act on are represented here. Malformed body
//! parts, broken markup and individual messages that fail to load are
//! recovered inside the pipeline and never become an [`Error`]; an empty
//! inbox is an empty result, not an error.
//!
//! Errors are categorized by their retryability - see [`Error::is_retryable`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while harvesting codes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration / validation errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// The HTTP transport could not be constructed (bad proxy, TLS setup).
    #[error("failed to build HTTP client")]
    HttpClient {
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Network errors (RETRYABLE)
    // ─────────────────────────────────────────────────────────────────────────
    /// The request could not be sent or its body could not be read.
    #[error("request to {endpoint} failed")]
    Request {
        /// The API endpoint being called.
        endpoint: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete in time.
    #[error("request to {endpoint} timed out after {timeout:?}")]
    Timeout {
        /// The API endpoint being called.
        endpoint: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization errors (NOT retryable without re-authentication)
    // ─────────────────────────────────────────────────────────────────────────
    /// The mail provider rejected the credentials.
    #[error("mail provider rejected credentials (HTTP {status}), re-authentication required")]
    Unauthorized {
        /// HTTP status returned by the provider.
        status: u16,
    },

    /// The user declined or closed the sign-in prompt.
    #[error("sign-in was canceled by the user")]
    AuthCanceled,

    // ─────────────────────────────────────────────────────────────────────────
    // Protocol errors (mixed retryability)
    // ─────────────────────────────────────────────────────────────────────────
    /// The mail provider answered with an unexpected status.
    #[error("mail API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The response body was not the JSON shape we expect.
    #[error("invalid response from {endpoint}")]
    InvalidResponse {
        /// The API endpoint being called.
        endpoint: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Storage errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// Reading or writing the consumption record failed.
    #[error("consumption record I/O failed for {}", path.display())]
    Storage {
        /// File backing the record.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The consumption record file is not valid JSON.
    #[error("consumption record at {} is malformed", path.display())]
    StorageFormat {
        /// File backing the record.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Returns `true` if this error represents a transient failure that might succeed on retry.
    ///
    /// Authorization failures are not retryable: the caller must obtain
    /// fresh credentials first (see [`requires_reauth`](Self::requires_reauth)).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Request { .. } | Error::Timeout { .. } => true,

            Error::Api { status, .. } => *status == 429 || *status >= 500,

            Error::InvalidConfig { .. }
            | Error::HttpClient { .. }
            | Error::Unauthorized { .. }
            | Error::AuthCanceled
            | Error::InvalidResponse { .. }
            | Error::Storage { .. }
            | Error::StorageFormat { .. } => false,
        }
    }

    /// Returns `true` if the caller should re-authenticate before trying again.
    #[must_use]
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Error::Unauthorized { .. } | Error::AuthCanceled)
    }

    /// Returns the error category for metrics/logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidConfig { .. } | Error::HttpClient { .. } => ErrorCategory::Configuration,

            Error::Request { .. } => ErrorCategory::Network,

            Error::Timeout { .. } => ErrorCategory::Timeout,

            Error::Unauthorized { .. } | Error::AuthCanceled => ErrorCategory::Authorization,

            Error::Api { .. } | Error::InvalidResponse { .. } => ErrorCategory::Protocol,

            Error::Storage { .. } | Error::StorageFormat { .. } => ErrorCategory::Storage,
        }
    }
}

/// Error categories for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration or validation errors.
    Configuration,
    /// Network connectivity errors.
    Network,
    /// Timeout errors.
    Timeout,
    /// Credentials rejected or sign-in declined.
    Authorization,
    /// Unexpected responses from the mail provider.
    Protocol,
    /// Consumption record persistence errors.
    Storage,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Authorization => write!(f, "authorization"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Storage => write!(f, "storage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let err = Error::InvalidConfig {
            message: "bad".into(),
        };
        assert!(!err.is_retryable());

        let err = Error::Timeout {
            endpoint: "users/me/messages".into(),
            timeout: Duration::from_secs(10),
        };
        assert!(err.is_retryable());

        // Rejected credentials need a new token, not a retry
        let err = Error::Unauthorized { status: 401 };
        assert!(!err.is_retryable());
        assert!(err.requires_reauth());

        let err = Error::Api {
            status: 503,
            body: "backend error".into(),
        };
        assert!(err.is_retryable());

        let err = Error::Api {
            status: 400,
            body: "bad query".into(),
        };
        assert!(!err.is_retryable());
        assert!(!err.requires_reauth());
    }

    #[test]
    fn test_error_categories() {
        let err = Error::InvalidConfig {
            message: "bad".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);

        assert_eq!(Error::AuthCanceled.category(), ErrorCategory::Authorization);

        let err = Error::Storage {
            path: PathBuf::from("/tmp/consumed.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert_eq!(err.category().to_string(), "storage");
    }

    #[test]
    fn test_unauthorized_message_mentions_reauth() {
        let err = Error::Unauthorized { status: 401 };
        assert!(err.to_string().contains("re-authentication"));
    }
}
