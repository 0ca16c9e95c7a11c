//! # stratus-signing
//!
//! Request-signing strategies: the [`RequestSigner`] interface the
//! execution engine calls per attempt, an HMAC-SHA256 header signer, and a
//! pre-signed URL signer for temporary links.
//!
//! Signing reads time only through the injected [`Clock`], so a signature
//! is a pure function of `(request, credentials, instant)` and tests can
//! pin the instant.
//!
//! ## Signature-last ordering
//!
//! Pre-signed URLs carry the signature as a query parameter. A base64
//! signature can contain `+`, which the general query-append helper reads
//! as a form-encoded space when it re-normalizes the query. The signature
//! therefore must be the last parameter ever appended; see [`query`] for
//! the two append primitives and [`PresignedUrlSigner`] for the signer that
//! makes the ordering structural.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod canonical;
pub mod clock;
pub mod digest;
pub mod header;
pub mod query;
pub mod signer;

// Re-exports
pub use canonical::{http_date, string_to_sign};
pub use clock::{Clock, FixedClock, SystemClock};
pub use header::HmacHeaderSigner;
pub use query::{append_query_param, append_raw_query_param, PresignedUrlSigner};
pub use signer::{PassthroughSigner, RequestSigner, SigningError};
