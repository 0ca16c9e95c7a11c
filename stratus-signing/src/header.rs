//! Header-carried HMAC signer.

use crate::canonical::{http_date, string_to_sign};
use crate::digest::hmac_sha256_base64;
use crate::signer::{RequestSigner, SigningError};
use chrono::{DateTime, Utc};
use stratus_core::{Credentials, Request};

/// Signs requests with an `Authorization` header:
///
/// ```text
/// Authorization: <scheme> identity:base64(hmac-sha256(string-to-sign))
/// Date: <http-date of the signing instant>
/// ```
///
/// The `Date` header carries the instant the canonical string embeds, so
/// the server can recompute the same string.
#[derive(Debug, Clone)]
pub struct HmacHeaderSigner {
    scheme: String,
}

impl HmacHeaderSigner {
    /// Create a signer tagging signatures with `scheme` (e.g. `"STRATUS"`).
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }
}

impl RequestSigner for HmacHeaderSigner {
    fn sign(
        &self,
        request: &Request,
        credentials: &Credentials,
        at: DateTime<Utc>,
    ) -> Result<Request, SigningError> {
        let signature = hmac_sha256_base64(credentials.secret(), &string_to_sign(request, at))?;

        let mut signed = request.clone();
        signed.headers_mut().set("Date", http_date(at));
        signed.headers_mut().set(
            "Authorization",
            format!("{} {}:{}", self.scheme, credentials.identity(), signature),
        );
        Ok(signed)
    }
}
