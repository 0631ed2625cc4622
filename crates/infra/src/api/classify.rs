//! Mapping of HTTP outcomes onto [`ErrorKind`]

use cwpp_common::error::{ErrorKind, TransportFailure};

/// Classify a failed outcome.
///
/// The status code wins when both are present; an outcome with neither a
/// failing status nor a transport failure is `Unknown`.
pub fn classify(status: Option<u16>, transport: Option<TransportFailure>) -> ErrorKind {
    status
        .and_then(ErrorKind::from_status)
        .or_else(|| transport.map(ErrorKind::from_transport))
        .unwrap_or(ErrorKind::Unknown)
}

/// Derive the transport failure shape from a reqwest error.
pub fn transport_failure(error: &reqwest::Error) -> TransportFailure {
    if error.is_connect() && error.is_timeout() {
        TransportFailure::ConnectTimeout
    } else if error.is_timeout() {
        TransportFailure::ReadTimeout
    } else if error.is_connect() || error.is_request() {
        TransportFailure::Connect
    } else if error.is_body() {
        TransportFailure::Stream
    } else if error.is_decode() {
        TransportFailure::Decode
    } else {
        TransportFailure::Other
    }
}

/// Classify a reqwest error, preferring the status it carries, if any.
pub fn classify_reqwest(error: &reqwest::Error) -> ErrorKind {
    classify(error.status().map(|status| status.as_u16()), Some(transport_failure(error)))
}
