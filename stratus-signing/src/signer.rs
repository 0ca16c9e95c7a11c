//! The request-signing strategy interface.

use chrono::{DateTime, Utc};
use stratus_core::{Credentials, Request};
use thiserror::Error;

/// Errors from signing.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The request cannot be signed as given.
    #[error("request cannot be signed: {0}")]
    Unsignable(String),
}

/// Strategy that attaches authentication to a request.
///
/// Each provider module supplies one of these. Apart from the injected
/// timestamp, signing is pure: the same request, credentials and instant
/// always produce the same signed request.
pub trait RequestSigner: Send + Sync {
    /// Return a signed variant of `request`.
    fn sign(
        &self,
        request: &Request,
        credentials: &Credentials,
        at: DateTime<Utc>,
    ) -> Result<Request, SigningError>;
}

/// Signer for providers that authenticate only through a session token or
/// not at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSigner;

impl RequestSigner for PassthroughSigner {
    fn sign(
        &self,
        request: &Request,
        _credentials: &Credentials,
        _at: DateTime<Utc>,
    ) -> Result<Request, SigningError> {
        Ok(request.clone())
    }
}
