//! API-specific error types
//!
//! Every terminal failure names the endpoint key and the URL it hit; page
//! failures additionally carry the offset of the failing page.

use cwpp_common::auth::AuthError;
use cwpp_common::error::{ErrorClassification, ErrorKind, ErrorSeverity};
use cwpp_domain::CwppError;
use thiserror::Error;

/// API operation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The endpoint's circuit is open; the call was never sent
    #[error("Circuit breaker open for {endpoint} ({url})")]
    CircuitOpen { endpoint: String, url: String },

    /// The request failed terminally (non-retryable or retries exhausted)
    #[error("{kind} from {endpoint} ({url}) after {attempts} attempt(s): {message}")]
    Request {
        kind: ErrorKind,
        endpoint: String,
        url: String,
        status: Option<u16>,
        attempts: u32,
        message: String,
    },

    /// No credential could be obtained before the first attempt
    #[error("Authentication failed for {endpoint} ({url}): {source}")]
    Authentication {
        endpoint: String,
        url: String,
        #[source]
        source: AuthError,
    },

    /// The backend rejected the token and logging in again failed
    #[error("Re-authentication failed for {endpoint} ({url}): {source}")]
    Reauthentication {
        endpoint: String,
        url: String,
        #[source]
        source: AuthError,
    },

    /// A page of a paginated fetch failed
    #[error("Page at offset {offset} failed: {source}")]
    Page {
        offset: u64,
        #[source]
        source: Box<ApiError>,
    },

    /// A pagination worker task died before reporting its pages
    #[error("Page worker failed: {0}")]
    Worker(String),

    /// Invalid client configuration or request URL
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Classified kind, if the failure reached the network layer.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Request { kind, .. } => Some(*kind),
            Self::Authentication { .. } | Self::Reauthentication { .. } => {
                Some(ErrorKind::AuthenticationError)
            }
            Self::Page { source, .. } => source.kind(),
            Self::CircuitOpen { .. } | Self::Worker(_) | Self::Config(_) => None,
        }
    }

    /// Endpoint key the failure belongs to.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::CircuitOpen { endpoint, .. }
            | Self::Request { endpoint, .. }
            | Self::Authentication { endpoint, .. }
            | Self::Reauthentication { endpoint, .. } => Some(endpoint),
            Self::Page { source, .. } => source.endpoint(),
            Self::Worker(_) | Self::Config(_) => None,
        }
    }

    /// URL of the failed request.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::CircuitOpen { url, .. }
            | Self::Request { url, .. }
            | Self::Authentication { url, .. }
            | Self::Reauthentication { url, .. } => Some(url),
            Self::Page { source, .. } => source.url(),
            Self::Worker(_) | Self::Config(_) => None,
        }
    }

    /// Offset of the failing page, for paginated fetches.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Page { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// HTTP status of the last attempt, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            Self::Page { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Whether the breaker rejected the call before sending.
    pub fn is_circuit_open(&self) -> bool {
        match self {
            Self::CircuitOpen { .. } => true,
            Self::Page { source, .. } => source.is_circuit_open(),
            _ => false,
        }
    }

    /// Wrap this error as the failure of the page at `offset`.
    pub fn at_offset(self, offset: u64) -> Self {
        Self::Page { offset, source: Box::new(self) }
    }
}

impl ErrorClassification for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Request { kind, .. } => kind.is_retryable(),
            Self::Page { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CircuitOpen { .. } => ErrorSeverity::Warning,
            Self::Request { kind, .. } => kind.severity(),
            Self::Authentication { .. }
            | Self::Reauthentication { .. }
            | Self::Worker(_)
            | Self::Config(_) => ErrorSeverity::Critical,
            Self::Page { source, .. } => source.severity(),
        }
    }
}

impl From<ApiError> for CwppError {
    fn from(err: ApiError) -> Self {
        let message = err.to_string();
        match &err {
            ApiError::CircuitOpen { .. } => Self::Unavailable(message),
            ApiError::Authentication { .. } | ApiError::Reauthentication { .. } => {
                Self::Auth(message)
            }
            ApiError::Config(_) => Self::Config(message),
            ApiError::Worker(_) => Self::Internal(message),
            ApiError::Request { .. } | ApiError::Page { .. } => match err.kind() {
                Some(ErrorKind::ParseError) => Self::Decode(message),
                Some(ErrorKind::NotFound) => Self::NotFound(message),
                Some(ErrorKind::AuthenticationError | ErrorKind::AuthorizationError) => {
                    Self::Auth(message)
                }
                Some(ErrorKind::ClientError) => Self::InvalidInput(message),
                Some(
                    ErrorKind::ServerError
                    | ErrorKind::RateLimitExceeded
                    | ErrorKind::RequestTimeout,
                ) => Self::Unavailable(message),
                Some(
                    ErrorKind::ConnectionError
                    | ErrorKind::ConnectionTimeout
                    | ErrorKind::ReadTimeout
                    | ErrorKind::StreamError,
                ) => Self::Network(message),
                Some(ErrorKind::Unknown) | None => Self::Internal(message),
            },
        }
    }
}
