//! HTTP response value type.

use crate::request::{Headers, Payload};
use serde::de::DeserializeOwned;

/// One HTTP response as received from the transport.
///
/// Immutable once built; classifiers consume it read-only.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    message: String,
    headers: Headers,
    payload: Option<Payload>,
}

impl Response {
    /// Start building a response.
    pub fn builder(status: u16) -> ResponseBuilder {
        ResponseBuilder {
            status,
            message: String::new(),
            headers: Headers::new(),
            payload: None,
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Status message / reason phrase.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Response payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Whether the status code is in the 2xx/3xx success range.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily.
    pub fn body_str(&self) -> Option<String> {
        self.payload
            .as_ref()
            .map(|p| String::from_utf8_lossy(p.bytes()).into_owned())
    }

    /// Body parsed as JSON, or `None` when absent or malformed.
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        self.payload
            .as_ref()
            .and_then(|p| serde_json::from_slice(p.bytes()).ok())
    }
}

/// Builder for [`Response`].
#[derive(Debug)]
pub struct ResponseBuilder {
    status: u16,
    message: String,
    headers: Headers,
    payload: Option<Payload>,
}

impl ResponseBuilder {
    /// Set the status message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the payload.
    #[must_use]
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Finish building.
    pub fn build(self) -> Response {
        Response {
            status: self.status,
            message: self.message,
            headers: self.headers,
            payload: self.payload,
        }
    }
}
