//! The transport collaborator: dispatch one request, return one response.

use async_trait::async_trait;
use stratus_core::{Method, Payload, Request, Response};
use thiserror::Error;

/// Connection-level failure raised before any response was received.
#[derive(Debug, Clone, Error)]
pub enum TransportFault {
    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established or was reset.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Any other transport-level failure.
    #[error("transport failure: {0}")]
    Other(String),
}

/// Dispatches a single request.
///
/// Connection pooling, TLS and DNS belong to the implementation behind
/// this trait; the engine only sends requests and receives responses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the raw response.
    async fn dispatch(&self, request: &Request) -> Result<Response, TransportFault>;
}

impl From<reqwest::Error> for TransportFault {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportFault::Timeout
        } else if err.is_connect() {
            TransportFault::Connection(err.to_string())
        } else {
            TransportFault::Other(err.to_string())
        }
    }
}

/// [`Transport`] over a shared reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport over a preconfigured client (timeouts, proxies).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Patch => reqwest::Method::PATCH,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(&self, request: &Request) -> Result<Response, TransportFault> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method()), request.endpoint().clone());

        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        if let Some(payload) = request.payload() {
            if let Some(content_type) = payload.content_type() {
                builder = builder.header("Content-Type", content_type);
            }
            builder = builder.body(payload.bytes().clone());
        }

        let raw = builder.send().await.map_err(TransportFault::from)?;

        let status = raw.status();
        let mut response = Response::builder(status.as_u16())
            .message(status.canonical_reason().unwrap_or_default());
        for (name, value) in raw.headers() {
            if let Ok(value) = value.to_str() {
                response = response.header(name.as_str(), value);
            }
        }
        let content_type = raw
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = raw.bytes().await.map_err(TransportFault::from)?;
        if !body.is_empty() {
            let mut payload = Payload::new(body);
            if let Some(content_type) = content_type {
                payload = payload.with_content_type(content_type);
            }
            response = response.payload(payload);
        }
        Ok(response.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_dispatch_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/servers"))
            .and(header("X-Auth-Token", "sess-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let request = Request::builder(
            Method::Get,
            Url::parse(&format!("{}/v2/servers", server.uri())).unwrap(),
        )
        .header("X-Auth-Token", "sess-1")
        .build();

        let response = transport.dispatch(&request).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.body_str().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_payload_and_content_type_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/servers"))
            .and(header("Content-Type", "application/json"))
            .and(body_string(r#"{"name":"db-1"}"#))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let request = Request::builder(
            Method::Post,
            Url::parse(&format!("{}/v2/servers", server.uri())).unwrap(),
        )
        .payload(Payload::new(&br#"{"name":"db-1"}"#[..]).with_content_type("application/json"))
        .build();

        let response = transport.dispatch(&request).await.unwrap();
        assert_eq!(response.status(), 202);
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such server"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let request = Request::builder(
            Method::Delete,
            Url::parse(&format!("{}/v2/servers/42", server.uri())).unwrap(),
        )
        .build();

        let response = transport.dispatch(&request).await.unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(response.body_str().as_deref(), Some("no such server"));
    }
}
