//! Response classification strategies.

use serde::Deserialize;
use stratus_core::{ApiError, Command, ErrorKind, OperationKind, Response};

/// Maps a raw response to a typed error, and decides which responses count
/// as success in the first place.
///
/// Classification is deterministic and side-effect free: the verdict
/// depends only on the response and the command's logical operation, never
/// on engine state.
pub trait ErrorHandler: Send + Sync {
    /// Whether `response` counts as success for this provider. The default
    /// is the 2xx/3xx success range.
    fn accepts(&self, response: &Response) -> bool {
        response.is_success()
    }

    /// Classify a non-accepted response.
    fn classify(&self, command: &Command, response: &Response) -> ApiError;
}

/// Default classifier: the canonical status-code mapping, with body text
/// folded into the message when present.
#[derive(Debug, Clone, Default)]
pub struct StatusErrorHandler {
    strict_success: bool,
}

impl StatusErrorHandler {
    /// Create the default classifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count only 2xx as success, handing 3xx to the retry handler. Used
    /// when a redirect-following policy is composed in.
    #[must_use]
    pub fn strict_success(mut self) -> Self {
        self.strict_success = true;
        self
    }
}

impl ErrorHandler for StatusErrorHandler {
    fn accepts(&self, response: &Response) -> bool {
        if self.strict_success {
            (200..300).contains(&response.status())
        } else {
            response.is_success()
        }
    }

    fn classify(&self, _command: &Command, response: &Response) -> ApiError {
        let message = match response.body_str() {
            Some(body) if !body.is_empty() => body,
            _ => response.message().to_string(),
        };
        ApiError::from_status(response.status(), message)
    }
}

/// Structured error body many REST APIs embed, e.g.
/// `{"errorcode":431,"errortext":"..."}`. Aliases cover the common field
/// spellings.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Embedded vendor code.
    #[serde(alias = "errorcode", alias = "errorCode")]
    pub code: Option<i64>,
    /// Embedded message.
    #[serde(alias = "errortext", alias = "errorText", alias = "message", alias = "description")]
    pub text: Option<String>,
}

/// One classification rule for an embedded vendor code.
///
/// A rule may be scoped to the command's operation and/or a message
/// substring; unscoped rules act as the fallback for the same code.
#[derive(Debug, Clone)]
pub struct CodeRule {
    code: i64,
    operation: Option<OperationKind>,
    text_contains: Option<String>,
    kind: ErrorKind,
}

impl CodeRule {
    /// Map `code` to `kind` unconditionally.
    pub fn new(code: i64, kind: ErrorKind) -> Self {
        Self {
            code,
            operation: None,
            text_contains: None,
            kind,
        }
    }

    /// Apply this rule only for commands performing `operation`.
    #[must_use]
    pub fn when_operation(mut self, operation: OperationKind) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Apply this rule only when the embedded message contains `needle`
    /// (case-insensitively).
    #[must_use]
    pub fn when_text_contains(mut self, needle: impl Into<String>) -> Self {
        self.text_contains = Some(needle.into());
        self
    }

    fn matches(&self, code: i64, operation: OperationKind, text: &str) -> bool {
        self.code == code
            && self.operation.map_or(true, |scoped| scoped == operation)
            && self.text_contains.as_deref().map_or(true, |needle| {
                text.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
            })
    }
}

/// Ordered vendor-code lookup table: the first matching rule wins, so
/// scoped rules go before their unscoped fallback for the same code.
#[derive(Debug, Clone, Default)]
pub struct ErrorCodeTable {
    rules: Vec<CodeRule>,
}

impl ErrorCodeTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    #[must_use]
    pub fn rule(mut self, rule: CodeRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Resolve a code against the table.
    pub fn resolve(&self, code: i64, operation: OperationKind, text: &str) -> Option<ErrorKind> {
        self.rules
            .iter()
            .find(|rule| rule.matches(code, operation, text))
            .map(|rule| rule.kind)
    }
}

/// Marks structurally-successful responses as failures when the provider
/// reports errors inside a 2xx body.
#[derive(Debug, Clone)]
pub struct FailureMarker {
    pointer: String,
    failure_values: Vec<String>,
}

impl FailureMarker {
    /// Treat a 2xx response as failed when the field at the JSON `pointer`
    /// (e.g. `/status`) holds one of `failure_values`.
    pub fn new(pointer: impl Into<String>, failure_values: Vec<String>) -> Self {
        Self {
            pointer: pointer.into(),
            failure_values,
        }
    }

    fn marks_failure(&self, response: &Response) -> bool {
        let Some(body) = response.json::<serde_json::Value>() else {
            return false;
        };
        match body.pointer(&self.pointer) {
            Some(serde_json::Value::String(value)) => {
                self.failure_values.iter().any(|v| v == value)
            }
            Some(other) => {
                let rendered = other.to_string();
                self.failure_values.iter().any(|v| *v == rendered)
            }
            None => false,
        }
    }
}

/// Classifier driven by a per-provider [`ErrorCodeTable`].
///
/// Parses the structured error body and resolves the embedded code through
/// the table; anything the table does not cover falls back to the
/// canonical status mapping.
#[derive(Debug, Clone, Default)]
pub struct CodeTableErrorHandler {
    table: ErrorCodeTable,
    failure_marker: Option<FailureMarker>,
}

impl CodeTableErrorHandler {
    /// Create a classifier over `table`.
    pub fn new(table: ErrorCodeTable) -> Self {
        Self {
            table,
            failure_marker: None,
        }
    }

    /// Also treat marked 2xx bodies as failures.
    #[must_use]
    pub fn with_failure_marker(mut self, marker: FailureMarker) -> Self {
        self.failure_marker = Some(marker);
        self
    }
}

impl ErrorHandler for CodeTableErrorHandler {
    fn accepts(&self, response: &Response) -> bool {
        if !response.is_success() {
            return false;
        }
        match &self.failure_marker {
            Some(marker) => !marker.marks_failure(response),
            None => true,
        }
    }

    fn classify(&self, command: &Command, response: &Response) -> ApiError {
        let body: Option<ErrorBody> = response.json();
        let text = body
            .as_ref()
            .and_then(|b| b.text.clone())
            .or_else(|| response.body_str().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| response.message().to_string());

        if let Some(code) = body.as_ref().and_then(|b| b.code) {
            if let Some(kind) = self.table.resolve(code, command.operation().kind(), &text) {
                return ApiError::new(kind, text)
                    .with_status(response.status())
                    .with_vendor_code(code);
            }
            if response.is_success() {
                return ApiError::server(response.status(), text).with_vendor_code(code);
            }
            return ApiError::from_status(response.status(), text).with_vendor_code(code);
        }

        if response.is_success() {
            // only reachable through a failure marker
            return ApiError::server(response.status(), text);
        }
        ApiError::from_status(response.status(), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::{Method, Operation, Payload, Request};
    use url::Url;

    fn command(kind: OperationKind) -> Command {
        let method = match kind {
            OperationKind::Delete => Method::Delete,
            OperationKind::Create => Method::Post,
            _ => Method::Get,
        };
        Command::new(
            Operation::new(kind, "volume"),
            Request::builder(method, Url::parse("https://api.example.com/volumes/7").unwrap())
                .build(),
        )
    }

    fn response(status: u16, body: &str) -> Response {
        let mut builder = Response::builder(status);
        if !body.is_empty() {
            builder = builder.payload(Payload::new(body.as_bytes().to_vec()));
        }
        builder.build()
    }

    // The table a CloudStack-style provider would supply as data.
    fn provider_table() -> ErrorCodeTable {
        ErrorCodeTable::new()
            .rule(
                CodeRule::new(431, ErrorKind::ResourceNotFound)
                    .when_operation(OperationKind::Delete)
                    .when_text_contains("does not exist"),
            )
            .rule(CodeRule::new(431, ErrorKind::ConflictingState))
            .rule(CodeRule::new(401, ErrorKind::AuthorizationFailure))
            .rule(CodeRule::new(533, ErrorKind::InsufficientResources))
    }

    #[test]
    fn test_400_and_405_are_invalid_request_regardless_of_body() {
        let handler = StatusErrorHandler::new();
        for status in [400, 405] {
            for body in ["", "anything at all", r#"{"unrelated":true}"#] {
                let error = handler.classify(&command(OperationKind::Get), &response(status, body));
                assert_eq!(error.kind, ErrorKind::InvalidRequest, "status {status}");
            }
        }
    }

    #[test]
    fn test_401_is_authorization_failure() {
        let handler = StatusErrorHandler::new();
        let error = handler.classify(&command(OperationKind::Get), &response(401, ""));
        assert_eq!(error.kind, ErrorKind::AuthorizationFailure);
    }

    #[test]
    fn test_409_is_conflicting_state() {
        let handler = StatusErrorHandler::new();
        let error = handler.classify(&command(OperationKind::Create), &response(409, "in use"));
        assert_eq!(error.kind, ErrorKind::ConflictingState);
        assert_eq!(error.message, "in use");
    }

    #[test]
    fn test_431_on_delete_is_resource_not_found() {
        let handler = CodeTableErrorHandler::new(provider_table());
        let error = handler.classify(
            &command(OperationKind::Delete),
            &response(
                431,
                r#"{"errorcode":431,"errortext":"volume vol-7 does not exist in account acct-1"}"#,
            ),
        );

        assert_eq!(error.kind, ErrorKind::ResourceNotFound);
        assert_eq!(error.vendor_code, Some(431));
        assert_eq!(
            error.message,
            "volume vol-7 does not exist in account acct-1"
        );
    }

    #[test]
    fn test_same_431_elsewhere_is_conflicting_state() {
        let handler = CodeTableErrorHandler::new(provider_table());
        let error = handler.classify(
            &command(OperationKind::Create),
            &response(
                431,
                r#"{"errorcode":431,"errortext":"Method Not Allowed while volume is attached"}"#,
            ),
        );

        assert_eq!(error.kind, ErrorKind::ConflictingState);
        assert_eq!(error.vendor_code, Some(431));
    }

    #[test]
    fn test_vendor_capacity_code_is_insufficient_resources() {
        let handler = CodeTableErrorHandler::new(provider_table());
        let error = handler.classify(
            &command(OperationKind::Create),
            &response(
                533,
                r#"{"errorcode":533,"errortext":"Unable to create a deployment for VM"}"#,
            ),
        );
        assert_eq!(error.kind, ErrorKind::InsufficientResources);
    }

    #[test]
    fn test_unlisted_code_falls_back_to_status_mapping() {
        let handler = CodeTableErrorHandler::new(provider_table());
        let error = handler.classify(
            &command(OperationKind::Get),
            &response(404, r#"{"errorcode":9999,"errortext":"nothing here"}"#),
        );
        assert_eq!(error.kind, ErrorKind::ResourceNotFound);
        assert_eq!(error.vendor_code, Some(9999));
    }

    #[test]
    fn test_silent_200_failure_marker() {
        let handler = CodeTableErrorHandler::new(ErrorCodeTable::new())
            .with_failure_marker(FailureMarker::new("/status", vec!["failure".into()]));

        let failed = response(200, r#"{"status":"failure","message":"zone busy"}"#);
        assert!(!handler.accepts(&failed));
        let error = handler.classify(&command(OperationKind::Update), &failed);
        assert_eq!(error.kind, ErrorKind::ServerError);
        assert_eq!(error.message, "zone busy");

        let succeeded = response(200, r#"{"status":"success"}"#);
        assert!(handler.accepts(&succeeded));
    }

    #[test]
    fn test_strict_success_excludes_redirects() {
        let lenient = StatusErrorHandler::new();
        let strict = StatusErrorHandler::new().strict_success();
        let redirect = response(302, "");

        assert!(lenient.accepts(&redirect));
        assert!(!strict.accepts(&redirect));
    }
}
