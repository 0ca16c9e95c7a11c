//! Query-string parameters and the pre-signed URL signer.
//!
//! Two append primitives with different guarantees:
//!
//! - [`append_raw_query_param`] encodes the new name and value once and
//!   keeps everything already in the query byte-for-byte.
//! - [`append_query_param`] parses and re-writes the whole query: each
//!   existing component is form-decoded (`+` reads as a space) and
//!   re-encoded as strict percent-encoding.
//!
//! A base64 signature value can carry literal `+` characters, which the
//! rewriting helper turns into spaces. The signature therefore must be the
//! last parameter ever appended. [`PresignedUrlSigner`] makes the ordering
//! structural: it appends the signature after every other parameter and
//! returns the finished request.

use crate::digest::hmac_sha256_base64;
use crate::signer::{RequestSigner, SigningError};
use chrono::{DateTime, Duration, Utc};
use std::fmt::Write as _;
use stratus_core::{Credentials, Request};
use url::Url;

/// Percent-encode a query component for direct appending.
///
/// `+` is left intact: this is the encoding a signature value is appended
/// with, and base64 output carries literal `+`.
pub fn encode_query_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'+' => {
                out.push(b as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
    out
}

fn strict_encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
    out
}

fn form_decode_component(value: &str) -> String {
    let spaced = value.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|c| c.into_owned())
        .unwrap_or(spaced)
}

/// Append one query parameter without touching anything already there.
pub fn append_raw_query_param(url: &Url, name: &str, value: &str) -> Url {
    let pair = format!(
        "{}={}",
        encode_query_component(name),
        encode_query_component(value)
    );
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{pair}"),
        _ => pair,
    };
    let mut out = url.clone();
    out.set_query(Some(&query));
    out
}

/// Append one query parameter by parsing and re-writing the whole query.
///
/// Convenient for ordinary request options; ruinous for a signature that
/// was appended with its `+` characters intact (see the module docs).
pub fn append_query_param(url: &Url, name: &str, value: &str) -> Url {
    let mut pairs: Vec<(String, String)> = Vec::new();
    if let Some(existing) = url.query() {
        for piece in existing.split('&').filter(|p| !p.is_empty()) {
            let (n, v) = piece.split_once('=').unwrap_or((piece, ""));
            pairs.push((form_decode_component(n), form_decode_component(v)));
        }
    }
    pairs.push((name.to_string(), value.to_string()));

    let mut query = String::new();
    for (i, (n, v)) in pairs.iter().enumerate() {
        if i > 0 {
            query.push('&');
        }
        let _ = write!(
            query,
            "{}={}",
            strict_encode_component(n),
            strict_encode_component(v)
        );
    }
    let mut out = url.clone();
    out.set_query(Some(&query));
    out
}

/// Signs by query string for temporary, shareable URLs.
///
/// Appends `AccessKey` and `Expires`, then the `Signature` last. The
/// returned request is final; nothing may be appended to its query.
#[derive(Debug, Clone)]
pub struct PresignedUrlSigner {
    validity: Duration,
}

impl PresignedUrlSigner {
    /// Create a signer whose URLs stay valid for `validity` past the
    /// signing instant.
    pub fn new(validity: Duration) -> Self {
        Self { validity }
    }

    /// String the signature covers: method, expiry and path.
    fn string_to_sign(request: &Request, expires: i64) -> String {
        format!(
            "{}\n{}\n{}",
            request.method(),
            expires,
            request.endpoint().path()
        )
    }
}

impl RequestSigner for PresignedUrlSigner {
    fn sign(
        &self,
        request: &Request,
        credentials: &Credentials,
        at: DateTime<Utc>,
    ) -> Result<Request, SigningError> {
        let expires = (at + self.validity).timestamp();
        let signature = hmac_sha256_base64(
            credentials.secret(),
            &Self::string_to_sign(request, expires),
        )?;

        let url = append_query_param(request.endpoint(), "AccessKey", credentials.identity());
        let url = append_query_param(&url, "Expires", &expires.to_string());
        let url = append_raw_query_param(&url, "Signature", &signature);

        let mut signed = request.clone();
        signed.set_endpoint(url);
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use stratus_core::Method;

    #[test]
    fn test_encode_keeps_plus_and_encodes_separators() {
        assert_eq!(encode_query_component("abc+def"), "abc+def");
        assert_eq!(encode_query_component("a b&c=d"), "a%20b%26c%3Dd");
    }

    #[test]
    fn test_raw_append_preserves_existing_bytes() {
        let url = Url::parse("https://cdn.example.com/object?response-content-type=text%2Fplain")
            .unwrap();
        let url = append_raw_query_param(&url, "Signature", "abc+def=");

        assert_eq!(
            url.query(),
            Some("response-content-type=text%2Fplain&Signature=abc+def%3D")
        );
    }

    #[test]
    fn test_signature_survives_when_appended_last() {
        let url = Url::parse("https://cdn.example.com/object").unwrap();
        let url = append_query_param(&url, "response-cache-control", "no-cache");
        let url = append_raw_query_param(&url, "Signature", "abc+def");

        let query = url.query().unwrap();
        assert!(query.contains("response-cache-control=no-cache"));
        assert!(query.ends_with("Signature=abc+def"));
    }

    #[test]
    fn test_appending_after_signature_corrupts_plus() {
        let url = Url::parse("https://cdn.example.com/object").unwrap();
        let url = append_raw_query_param(&url, "Signature", "abc+def");
        assert!(url.query().unwrap().contains("Signature=abc+def"));

        // One more parameter re-normalizes the query: the literal `+` is
        // read back as a form-encoded space. This is the failure the
        // signature-last rule exists to prevent.
        let corrupted = append_query_param(&url, "response-cache-control", "no-cache");
        let query = corrupted.query().unwrap();
        assert!(!query.contains("abc+def"));
        assert!(query.contains("Signature=abc%20def"));
    }

    #[test]
    fn test_presigned_url_puts_signature_last() {
        let signer = PresignedUrlSigner::new(Duration::minutes(15));
        let request = Request::builder(
            Method::Get,
            Url::parse("https://cdn.example.com/bucket/object").unwrap(),
        )
        .build();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let signed = signer
            .sign(&request, &Credentials::new("acct-1", "secret"), at)
            .unwrap();
        let query = signed.endpoint().query().unwrap();

        assert!(query.starts_with("AccessKey=acct-1&Expires="));
        let last = query.rsplit('&').next().unwrap();
        assert!(last.starts_with("Signature="));
    }

    #[test]
    fn test_presigning_is_deterministic() {
        let signer = PresignedUrlSigner::new(Duration::minutes(15));
        let request = Request::builder(
            Method::Get,
            Url::parse("https://cdn.example.com/bucket/object").unwrap(),
        )
        .build();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let creds = Credentials::new("acct-1", "secret");

        let a = signer.sign(&request, &creds, at).unwrap();
        let b = signer.sign(&request, &creds, at).unwrap();
        assert_eq!(a.endpoint(), b.endpoint());
    }
}
