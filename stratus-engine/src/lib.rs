//! # stratus-engine
//!
//! The provider-agnostic command execution engine: dispatch a command,
//! classify the outcome, and retry or surface a typed error.
//!
//! ## Core Concepts
//!
//! - **[`CommandEngine`]**: the dispatch → classify → retry-or-fail loop
//! - **[`ErrorHandler`]**: maps a raw response to the typed error taxonomy
//! - **[`RetryHandler`]**: decides whether a failed attempt is resubmitted
//! - **[`Transport`]**: the HTTP collaborator behind a narrow trait
//! - **[`ClientContext`]**: owned session state plus close-time cleanup
//!
//! One generic engine is parameterized by three small strategy objects
//! (error handler, retry handler, request signer) per provider, instead of
//! one handler hierarchy per vendor. Vendor policy lives in data (an
//! [`ErrorCodeTable`] of embedded-code rules) and in which handlers get
//! composed, not in engine logic.
//!
//! ## Example
//!
//! ```ignore
//! use stratus_engine::prelude::*;
//!
//! let engine = CommandEngine::builder(transport, credentials)
//!     .retry_handler(DelegatingRetryHandler::default())
//!     .build();
//!
//! let mut command = Command::new(operation, request);
//! let response = engine.execute(&mut command).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod classify;
pub mod context;
pub mod engine;
pub mod eventual;
pub mod retry;
pub mod transport;
pub mod wait;

// Re-exports
pub use classify::{
    CodeRule, CodeTableErrorHandler, ErrorBody, ErrorCodeTable, ErrorHandler, FailureMarker,
    StatusErrorHandler,
};
pub use context::{ClientContext, CloseHook, ContextConfig};
pub use engine::{
    CommandEngine, CommandEngineBuilder, ExecutionError, SessionAuth, TokenPlacement,
};
pub use eventual::{await_available, get_or_fetch_existing, PollSettings};
pub use retry::{
    AttemptOutcome, BackoffLimitedRetryHandler, DelegatingRetryHandler, NeverRetry,
    RedirectionRetryHandler, RetryDecision, RetryHandler, SessionExpiryRetryHandler,
    DEFAULT_MAX_RETRIES,
};
pub use transport::{HttpTransport, Transport, TransportFault};
pub use wait::{retry_after, WaitStrategy};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        BackoffLimitedRetryHandler, ClientContext, CommandEngine, DelegatingRetryHandler,
        ErrorCodeTable, ErrorHandler, ExecutionError, HttpTransport, RetryDecision, RetryHandler,
        SessionExpiryRetryHandler, StatusErrorHandler, Transport, WaitStrategy,
    };
}
