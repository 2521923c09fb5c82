//! Error types for the CRM client.
//!
//! # Design
//! Every failure mode of a dispatched call gets its own variant so callers
//! can tell a bad configuration from a network failure from a rejected
//! request. HTTP status failures and decode failures are kept apart: the
//! service frequently answers with non-JSON bodies on error paths, and a
//! status error never attempts a decode. URLs carried by errors have the
//! `hapikey` value redacted.

use std::fmt;

use crate::types::ErrorResponse;

/// Errors returned by the dispatcher and the resource facades.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested API version has no object-path scheme.
    #[error("API version not implemented: {0}")]
    UnsupportedVersion(String),

    /// The host or endpoint could not be turned into an absolute URL.
    #[error("invalid URL {input:?}: {reason}")]
    InvalidUrl { input: String, reason: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The HTTP exchange itself failed (timeout, DNS, refused connection).
    #[error("transport failure ({kind}) for {url}: {message}")]
    Transport {
        url: String,
        kind: TransportErrorKind,
        message: String,
    },

    /// The service answered with a status outside the success allow-list.
    #[error("HTTP {status} {reason} for {url}: {body}")]
    HttpStatus {
        status: u16,
        reason: String,
        url: String,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed for {url}: {message}\n{body}")]
    Decode {
        message: String,
        url: String,
        body: String,
    },
}

/// Coarse cause of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// One of the connect, TLS or total timeouts elapsed.
    Timeout,
    /// Anything else: DNS, refused connection, broken stream, TLS failure.
    Connection,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Connection => write!(f, "connection"),
        }
    }
}

impl ApiError {
    /// HTTP status of an `HttpStatus` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True for 2xx responses rejected by the strict {200, 204} allow-list.
    pub fn is_success_anomaly(&self) -> bool {
        matches!(self.status(), Some(200..=299))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ApiError::Transport {
                kind: TransportErrorKind::Timeout,
                ..
            }
        )
    }

    /// Raw response body carried by status and decode errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::HttpStatus { body, .. } | ApiError::Decode { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The service's structured error body, when the raw body parses as one.
    pub fn error_response(&self) -> Option<ErrorResponse> {
        match self {
            ApiError::HttpStatus { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}
