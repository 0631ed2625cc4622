//! Error taxonomy for outbound HTTP calls
//!
//! This module provides the classification vocabulary shared by the retry
//! policy, the circuit breaker, and the request executor:
//!
//! 1. **`ErrorKind`**: exactly one kind per failed outcome, derived from either
//!    the response status code or the transport failure.
//! 2. **`TransportFailure`**: transport-level failure shapes, independent of
//!    the HTTP library in use.
//! 3. **`ErrorClassification` trait**: a standard interface for asking an
//!    error whether it is transient and how severe it is.
//!
//! | Kind | Source | Retryable |
//! |------|--------|-----------|
//! | `ConnectionTimeout` | connect timed out | yes |
//! | `ReadTimeout` | response timed out | yes |
//! | `ConnectionError` | refused/reset/DNS | yes |
//! | `StreamError` | body interrupted mid-transfer | yes |
//! | `ParseError` | malformed structured payload | no |
//! | `AuthenticationError` | 401 | no (forced refresh instead) |
//! | `AuthorizationError` | 403 | no |
//! | `NotFound` | 404 | no |
//! | `RequestTimeout` | 408 | yes |
//! | `RateLimitExceeded` | 429 | yes |
//! | `ServerError` | >= 500 | yes |
//! | `ClientError` | other 4xx | no |
//! | `Unknown` | anything else | no |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classified outcome of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ConnectionTimeout,
    ReadTimeout,
    ConnectionError,
    StreamError,
    ParseError,
    AuthenticationError,
    AuthorizationError,
    NotFound,
    RequestTimeout,
    RateLimitExceeded,
    ServerError,
    ClientError,
    Unknown,
}

impl ErrorKind {
    /// Kinds retried by default.
    pub const TRANSIENT: [ErrorKind; 7] = [
        ErrorKind::ServerError,
        ErrorKind::ConnectionError,
        ErrorKind::ConnectionTimeout,
        ErrorKind::ReadTimeout,
        ErrorKind::StreamError,
        ErrorKind::RequestTimeout,
        ErrorKind::RateLimitExceeded,
    ];

    /// Map a failing status code to its kind.
    ///
    /// Returns `None` for codes below 400, which are not failures.
    pub fn from_status(status: u16) -> Option<Self> {
        let kind = match status {
            401 => Self::AuthenticationError,
            403 => Self::AuthorizationError,
            404 => Self::NotFound,
            408 => Self::RequestTimeout,
            429 => Self::RateLimitExceeded,
            s if s >= 500 => Self::ServerError,
            s if s >= 400 => Self::ClientError,
            _ => return None,
        };
        Some(kind)
    }

    /// Map a transport failure to its kind.
    pub fn from_transport(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::ConnectTimeout => Self::ConnectionTimeout,
            TransportFailure::ReadTimeout => Self::ReadTimeout,
            TransportFailure::Connect => Self::ConnectionError,
            TransportFailure::Stream => Self::StreamError,
            TransportFailure::Decode => Self::ParseError,
            TransportFailure::Other => Self::Unknown,
        }
    }

    /// Stable lowercase label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ConnectionTimeout => "connection_timeout",
            Self::ReadTimeout => "read_timeout",
            Self::ConnectionError => "connection_error",
            Self::StreamError => "stream_error",
            Self::ParseError => "parse_error",
            Self::AuthenticationError => "authentication_error",
            Self::AuthorizationError => "authorization_error",
            Self::NotFound => "not_found",
            Self::RequestTimeout => "request_timeout",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::ServerError => "server_error",
            Self::ClientError => "client_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_ascii_uppercase())
    }
}

/// Transport-level failure shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportFailure {
    /// Timed out while establishing the connection
    ConnectTimeout,
    /// Timed out waiting for or reading the response
    ReadTimeout,
    /// Connection refused, reset, or unresolvable host
    Connect,
    /// Body stream broke mid-transfer
    Stream,
    /// Payload could not be decoded
    Decode,
    Other,
}

/// Trait for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if attempted
    /// again: timeouts, dropped connections, throttling, server faults.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ErrorClassification for ErrorKind {
    fn is_retryable(&self) -> bool {
        Self::TRANSIENT.contains(self)
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound => ErrorSeverity::Info,
            Self::RateLimitExceeded
            | Self::RequestTimeout
            | Self::ConnectionTimeout
            | Self::ReadTimeout
            | Self::StreamError => ErrorSeverity::Warning,
            Self::ConnectionError
            | Self::ServerError
            | Self::ClientError
            | Self::AuthorizationError
            | Self::Unknown => ErrorSeverity::Error,
            Self::AuthenticationError | Self::ParseError => ErrorSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_one_kind_each() {
        assert_eq!(ErrorKind::from_status(401), Some(ErrorKind::AuthenticationError));
        assert_eq!(ErrorKind::from_status(403), Some(ErrorKind::AuthorizationError));
        assert_eq!(ErrorKind::from_status(404), Some(ErrorKind::NotFound));
        assert_eq!(ErrorKind::from_status(408), Some(ErrorKind::RequestTimeout));
        assert_eq!(ErrorKind::from_status(429), Some(ErrorKind::RateLimitExceeded));
        assert_eq!(ErrorKind::from_status(500), Some(ErrorKind::ServerError));
        assert_eq!(ErrorKind::from_status(503), Some(ErrorKind::ServerError));
        assert_eq!(ErrorKind::from_status(400), Some(ErrorKind::ClientError));
        assert_eq!(ErrorKind::from_status(409), Some(ErrorKind::ClientError));
        assert_eq!(ErrorKind::from_status(200), None);
        assert_eq!(ErrorKind::from_status(304), None);
    }

    #[test]
    fn transport_failures_map_to_kinds() {
        assert_eq!(
            ErrorKind::from_transport(TransportFailure::ConnectTimeout),
            ErrorKind::ConnectionTimeout
        );
        assert_eq!(ErrorKind::from_transport(TransportFailure::ReadTimeout), ErrorKind::ReadTimeout);
        assert_eq!(ErrorKind::from_transport(TransportFailure::Connect), ErrorKind::ConnectionError);
        assert_eq!(ErrorKind::from_transport(TransportFailure::Stream), ErrorKind::StreamError);
        assert_eq!(ErrorKind::from_transport(TransportFailure::Decode), ErrorKind::ParseError);
        assert_eq!(ErrorKind::from_transport(TransportFailure::Other), ErrorKind::Unknown);
    }

    #[test]
    fn transient_kinds_are_retryable() {
        for kind in ErrorKind::TRANSIENT {
            assert!(kind.is_retryable(), "{kind} should be retryable");
        }
        assert!(!ErrorKind::AuthenticationError.is_retryable());
        assert!(!ErrorKind::AuthorizationError.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(!ErrorKind::ClientError.is_retryable());
        assert!(!ErrorKind::ParseError.is_retryable());
        assert!(!ErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn display_uses_screaming_case() {
        assert_eq!(ErrorKind::RateLimitExceeded.to_string(), "RATE_LIMIT_EXCEEDED");
        assert_eq!(ErrorKind::ServerError.to_string(), "SERVER_ERROR");
        assert!(ErrorKind::ParseError.is_critical());
    }
}
