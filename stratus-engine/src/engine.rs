//! The command execution engine.

use crate::classify::{ErrorHandler, StatusErrorHandler};
use crate::retry::{AttemptOutcome, DelegatingRetryHandler, RetryDecision, RetryHandler};
use crate::transport::Transport;
use std::fmt;
use std::sync::Arc;
use stratus_core::{ApiError, Command, Credentials, Request, Response};
use stratus_session::SessionCache;
use stratus_signing::{append_query_param, Clock, PassthroughSigner, RequestSigner, SystemClock};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Failure surface of [`CommandEngine::execute`].
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The command failed; the same error is attached to the command for
    /// post-hoc inspection.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The caller cancelled the command between attempts. No error is
    /// attached to the command.
    #[error("command cancelled")]
    Cancelled,
}

/// Where a session token rides on the wire.
#[derive(Debug, Clone)]
pub enum TokenPlacement {
    /// `<name>: <prefix><token>`
    Header {
        /// Header name, e.g. `X-Auth-Token`.
        name: String,
        /// Value prefix, e.g. `Bearer `. May be empty.
        prefix: String,
    },
    /// `?<name>=<token>`, appended per attempt.
    QueryParam {
        /// Parameter name, e.g. `sessionkey`.
        name: String,
    },
}

impl TokenPlacement {
    /// Conventional `Authorization: Bearer <token>` header.
    pub fn bearer() -> Self {
        Self::Header {
            name: "Authorization".into(),
            prefix: "Bearer ".into(),
        }
    }

    /// Plain token header.
    pub fn header(name: impl Into<String>) -> Self {
        Self::Header {
            name: name.into(),
            prefix: String::new(),
        }
    }

    /// Query parameter.
    pub fn query(name: impl Into<String>) -> Self {
        Self::QueryParam { name: name.into() }
    }

    fn apply(&self, request: &mut Request, token: &str) {
        match self {
            Self::Header { name, prefix } => {
                request
                    .headers_mut()
                    .set(name.clone(), format!("{prefix}{token}"));
            }
            Self::QueryParam { name } => {
                let endpoint = append_query_param(request.endpoint(), name, token);
                request.set_endpoint(endpoint);
            }
        }
    }
}

/// Session-token authentication for an engine: which cache to consult and
/// how the token rides on the request.
pub struct SessionAuth {
    cache: Arc<dyn SessionCache>,
    placement: TokenPlacement,
}

impl SessionAuth {
    /// Attach tokens from `cache` at `placement`.
    pub fn new(cache: Arc<dyn SessionCache>, placement: TokenPlacement) -> Self {
        Self { cache, placement }
    }
}

impl fmt::Debug for SessionAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionAuth")
            .field("placement", &self.placement)
            .finish()
    }
}

/// Orchestrates dispatch → classify → retry-or-fail for one provider.
///
/// One generic engine, parameterized by the three per-provider strategies
/// (error handler, retry handler, request signer) plus the transport and
/// an optional session-token source. Attempts within one command are
/// strictly sequential; the command's failure count and terminal error
/// remain inspectable after the call returns.
pub struct CommandEngine {
    transport: Arc<dyn Transport>,
    errors: Arc<dyn ErrorHandler>,
    retry: Arc<dyn RetryHandler>,
    signer: Arc<dyn RequestSigner>,
    clock: Arc<dyn Clock>,
    credentials: Credentials,
    session: Option<SessionAuth>,
}

impl fmt::Debug for CommandEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEngine")
            .field("credentials", &self.credentials)
            .field("session", &self.session)
            .finish()
    }
}

impl CommandEngine {
    /// Start building an engine over `transport` for `credentials`.
    pub fn builder(transport: Arc<dyn Transport>, credentials: Credentials) -> CommandEngineBuilder {
        CommandEngineBuilder {
            transport,
            credentials,
            errors: None,
            retry: None,
            signer: None,
            clock: None,
            session: None,
        }
    }

    /// Execute to completion. Equivalent to [`execute_cancellable`] with a
    /// token that never fires.
    ///
    /// [`execute_cancellable`]: Self::execute_cancellable
    pub async fn execute(&self, command: &mut Command) -> Result<Response, ExecutionError> {
        self.execute_cancellable(command, &CancellationToken::new())
            .await
    }

    /// Execute, checking `cancel` before every resubmission.
    ///
    /// On failure the terminal [`ApiError`] is both returned and attached
    /// to the command; cancellation returns without attaching anything.
    pub async fn execute_cancellable(
        &self,
        command: &mut Command,
        cancel: &CancellationToken,
    ) -> Result<Response, ExecutionError> {
        loop {
            let request = self.prepare(command).await?;
            debug!(
                method = %request.method(),
                endpoint = %request.endpoint(),
                failures = command.failure_count(),
                "dispatching command"
            );

            let outcome = self.transport.dispatch(&request).await;
            match outcome {
                Ok(response) if self.errors.accepts(&response) => {
                    debug!(status = response.status(), "command succeeded");
                    return Ok(response);
                }
                Ok(response) => {
                    let decision = self
                        .retry
                        .should_retry(command, AttemptOutcome::Response(&response))
                        .await;
                    if decision.is_retry() {
                        self.before_resubmit(command, cancel, decision).await?;
                        continue;
                    }
                    let error = self.errors.classify(command, &response);
                    return Err(self.terminate(command, error));
                }
                Err(fault) => {
                    let decision = self
                        .retry
                        .should_retry(command, AttemptOutcome::Transport(&fault))
                        .await;
                    if decision.is_retry() {
                        self.before_resubmit(command, cancel, decision).await?;
                        continue;
                    }
                    return Err(self.terminate(command, ApiError::transport(fault.to_string())));
                }
            }
        }
    }

    fn terminate(&self, command: &mut Command, error: ApiError) -> ExecutionError {
        warn!(%error, failures = command.failure_count(), "command failed");
        command.attach_error(error.clone());
        error.into()
    }

    async fn before_resubmit(
        &self,
        command: &mut Command,
        cancel: &CancellationToken,
        decision: RetryDecision,
    ) -> Result<(), ExecutionError> {
        if !command.is_replayable() {
            return Err(self.terminate(
                command,
                ApiError::non_replayable("retry indicated but the payload cannot be resent"),
            ));
        }
        if cancel.is_cancelled() {
            debug!("command cancelled before resubmission");
            return Err(ExecutionError::Cancelled);
        }
        if let RetryDecision::Retry { delay: Some(delay) } = decision {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    /// Build the request for one attempt: attach the session token, then
    /// sign.
    async fn prepare(&self, command: &mut Command) -> Result<Request, ExecutionError> {
        let mut request = command.request().clone();

        if let Some(session) = &self.session {
            let token = match session.cache.get_or_load(&self.credentials).await {
                Ok(token) => token,
                Err(error) => {
                    // the renewal cycle itself failed; nothing left to retry
                    return Err(self.terminate(command, ApiError::authorization(error.to_string())));
                }
            };
            session.placement.apply(&mut request, token.value());
        }

        match self.signer.sign(&request, &self.credentials, self.clock.now()) {
            Ok(signed) => Ok(signed),
            Err(error) => Err(self.terminate(
                command,
                ApiError::invalid_request(format!("signing failed: {error}")),
            )),
        }
    }
}

/// Builder for [`CommandEngine`].
pub struct CommandEngineBuilder {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    errors: Option<Arc<dyn ErrorHandler>>,
    retry: Option<Arc<dyn RetryHandler>>,
    signer: Option<Arc<dyn RequestSigner>>,
    clock: Option<Arc<dyn Clock>>,
    session: Option<SessionAuth>,
}

impl fmt::Debug for CommandEngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEngineBuilder")
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl CommandEngineBuilder {
    /// Set the response classifier. Defaults to [`StatusErrorHandler`].
    #[must_use]
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.errors = Some(Arc::new(handler));
        self
    }

    /// Set the retry policy. Defaults to [`DelegatingRetryHandler`] with
    /// backoff on server errors.
    #[must_use]
    pub fn retry_handler(mut self, handler: impl RetryHandler + 'static) -> Self {
        self.retry = Some(Arc::new(handler));
        self
    }

    /// Set the request signer. Defaults to [`PassthroughSigner`].
    #[must_use]
    pub fn signer(mut self, signer: impl RequestSigner + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Set the signing clock. Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Attach session-token authentication.
    #[must_use]
    pub fn session_auth(mut self, session: SessionAuth) -> Self {
        self.session = Some(session);
        self
    }

    /// Finish building.
    pub fn build(self) -> CommandEngine {
        CommandEngine {
            transport: self.transport,
            credentials: self.credentials,
            errors: self
                .errors
                .unwrap_or_else(|| Arc::new(StatusErrorHandler::new())),
            retry: self
                .retry
                .unwrap_or_else(|| Arc::new(DelegatingRetryHandler::default())),
            signer: self.signer.unwrap_or_else(|| Arc::new(PassthroughSigner)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            session: self.session,
        }
    }
}
