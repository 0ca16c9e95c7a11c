//! Commands: one logical exchange with retry bookkeeping.

use crate::errors::ApiError;
use crate::request::Request;

/// Logical verb a command performs against its target resource.
///
/// Classification policies may branch on this: some providers reuse one
/// embedded error code with a meaning that depends on the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Create a resource.
    Create,
    /// Fetch a single resource.
    Get,
    /// List a resource collection.
    List,
    /// Update a resource.
    Update,
    /// Delete a resource.
    Delete,
    /// Anything else.
    Other,
}

/// The logical operation a command represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    kind: OperationKind,
    target: String,
}

impl Operation {
    /// Describe an operation acting on `target` (e.g. `"virtualmachine"`).
    pub fn new(kind: OperationKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }

    /// The verb.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The resource acted on.
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// One logical request/response exchange with retry bookkeeping.
///
/// The failure count only ever grows, and once an error is attached the
/// command is terminal: it is never dispatched again and later attachments
/// are ignored.
#[derive(Debug)]
pub struct Command {
    operation: Operation,
    request: Request,
    failure_count: u32,
    error: Option<ApiError>,
}

impl Command {
    /// Create a command for one logical operation.
    pub fn new(operation: Operation, request: Request) -> Self {
        Self {
            operation,
            request,
            failure_count: 0,
            error: None,
        }
    }

    /// The logical operation this command represents.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// The request the next attempt will send.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Replace the request sent on the next attempt (redirects).
    pub fn replace_request(&mut self, request: Request) {
        self.request = request;
    }

    /// Number of failed attempts so far.
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Record one failed attempt and return the new count.
    pub fn record_failure(&mut self) -> u32 {
        self.failure_count += 1;
        self.failure_count
    }

    /// Whether the request can be safely resent unchanged.
    pub fn is_replayable(&self) -> bool {
        self.request.is_replayable()
    }

    /// Attach the terminal error. The first attachment wins.
    pub fn attach_error(&mut self, error: ApiError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// The terminal error, if the command has failed.
    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// Whether the command has a terminal error attached.
    pub fn is_terminal(&self) -> bool {
        self.error.is_some()
    }
}
