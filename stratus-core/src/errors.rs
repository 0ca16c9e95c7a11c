//! The typed error taxonomy shared by every provider policy.

use std::fmt;
use thiserror::Error;

/// Closed set of categories a failed exchange classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or disallowed request. Never retried.
    InvalidRequest,
    /// Credentials rejected or session expired.
    AuthorizationFailure,
    /// Target resource absent.
    ResourceNotFound,
    /// Operation conflicts with the current resource state.
    ConflictingState,
    /// Quota or capacity exceeded; the request itself must change.
    InsufficientResources,
    /// Unclassified 5xx.
    ServerError,
    /// Connection-level failure before any response arrived.
    Transport,
    /// A retry was indicated but the payload cannot be safely resent.
    NonReplayable,
}

impl ErrorKind {
    /// Canonical status-code mapping used by the default classifier.
    ///
    /// Unlisted 4xx codes fall back to `InvalidRequest`; vendor code tables
    /// refine them where the provider gives them a meaning.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 405 => ErrorKind::InvalidRequest,
            401 => ErrorKind::AuthorizationFailure,
            404 => ErrorKind::ResourceNotFound,
            409 => ErrorKind::ConflictingState,
            s if s >= 500 => ErrorKind::ServerError,
            _ => ErrorKind::InvalidRequest,
        }
    }

    /// Stable name for logs and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::AuthorizationFailure => "authorization failure",
            ErrorKind::ResourceNotFound => "resource not found",
            ErrorKind::ConflictingState => "conflicting state",
            ErrorKind::InsufficientResources => "insufficient resources",
            ErrorKind::ServerError => "server error",
            ErrorKind::Transport => "transport error",
            ErrorKind::NonReplayable => "request not replayable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of one command.
///
/// Carries a human-readable message plus, where available, the HTTP status
/// and the structured vendor code that drove classification. The vendor
/// code is never the primary contract; callers branch on [`ErrorKind`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ApiError {
    /// Category this failure classifies into.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Status code of the response that produced this error, if any.
    pub status: Option<u16>,
    /// Vendor error code embedded in the response body, if any.
    pub vendor_code: Option<i64>,
}

impl ApiError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            vendor_code: None,
        }
    }

    /// Record the originating status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Record the vendor error code that drove classification.
    #[must_use]
    pub fn with_vendor_code(mut self, code: i64) -> Self {
        self.vendor_code = Some(code);
        self
    }

    /// Classify a bare status code through the canonical mapping.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::from_status(status), message).with_status(status)
    }

    /// An [`ErrorKind::InvalidRequest`] error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// An [`ErrorKind::AuthorizationFailure`] error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthorizationFailure, message)
    }

    /// An [`ErrorKind::ResourceNotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceNotFound, message)
    }

    /// An [`ErrorKind::ConflictingState`] error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConflictingState, message)
    }

    /// An [`ErrorKind::InsufficientResources`] error.
    pub fn insufficient_resources(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientResources, message)
    }

    /// An [`ErrorKind::ServerError`] error.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message).with_status(status)
    }

    /// An [`ErrorKind::Transport`] error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// An [`ErrorKind::NonReplayable`] error.
    pub fn non_replayable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NonReplayable, message)
    }
}

/// Result alias for operations that fail with an [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;
