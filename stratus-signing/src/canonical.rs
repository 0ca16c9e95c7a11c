//! Canonical string-to-sign assembly.

use chrono::{DateTime, Utc};
use stratus_core::Request;

/// Format an instant as an HTTP date (`Thu, 01 Jan 1970 00:00:00 GMT`).
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Build the canonical string-to-sign for a request at an instant.
///
/// Layout, one field per line:
///
/// ```text
/// METHOD
/// content-type (empty when absent)
/// http-date
/// path[?query]
/// ```
///
/// The canonical form covers only what the server reconstructs from the
/// received request, so transport-added headers do not perturb the
/// signature.
pub fn string_to_sign(request: &Request, at: DateTime<Utc>) -> String {
    let content_type = request
        .payload()
        .and_then(|p| p.content_type())
        .unwrap_or_default();
    let endpoint = request.endpoint();
    let resource = match endpoint.query() {
        Some(q) if !q.is_empty() => format!("{}?{}", endpoint.path(), q),
        _ => endpoint.path().to_string(),
    };
    format!(
        "{}\n{}\n{}\n{}",
        request.method(),
        content_type,
        http_date(at),
        resource
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use stratus_core::{Method, Payload, Request};
    use url::Url;

    #[test]
    fn test_http_date_format() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(http_date(epoch), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn test_string_to_sign_layout() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let request = Request::builder(
            Method::Put,
            Url::parse("https://storage.example.com/bucket/object?acl=private").unwrap(),
        )
        .payload(Payload::new(&b"data"[..]).with_content_type("application/octet-stream"))
        .build();

        assert_eq!(
            string_to_sign(&request, at),
            "PUT\napplication/octet-stream\nSat, 01 Jun 2024 12:00:00 GMT\n/bucket/object?acl=private"
        );
    }

    #[test]
    fn test_string_to_sign_without_payload() {
        let at = Utc.timestamp_opt(0, 0).unwrap();
        let request =
            Request::builder(Method::Get, Url::parse("https://storage.example.com/bucket").unwrap())
                .build();

        assert_eq!(
            string_to_sign(&request, at),
            "GET\n\nThu, 01 Jan 1970 00:00:00 GMT\n/bucket"
        );
    }
}
