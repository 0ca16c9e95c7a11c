//! Retry strategies consulted after every failed attempt.

use crate::transport::TransportFault;
use crate::wait::{self, WaitStrategy};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use stratus_core::{Command, Credentials, Response};
use stratus_session::SessionCache;
use tracing::{debug, warn};
use url::Url;

/// Default bound on retries per command.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// What a failed attempt produced.
#[derive(Debug, Clone, Copy)]
pub enum AttemptOutcome<'a> {
    /// A response outside the accepted range.
    Response(&'a Response),
    /// A connection-level fault before any response.
    Transport(&'a TransportFault),
}

/// Verdict for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Resubmit, after an optional delay.
    Retry {
        /// How long to wait before resubmitting.
        delay: Option<Duration>,
    },
    /// Give up; the error handler classifies the outcome.
    Stop,
}

impl RetryDecision {
    /// Retry immediately.
    pub fn retry() -> Self {
        Self::Retry { delay: None }
    }

    /// Retry after `delay`.
    pub fn retry_after(delay: Duration) -> Self {
        Self::Retry { delay: Some(delay) }
    }

    /// Whether this verdict resubmits.
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }
}

/// Strategy deciding whether a failed command is resubmitted.
///
/// A handler that claims an outcome records the failure on the command and
/// allows the retry while the new count stays within its bound, so five
/// retries succeed and the sixth check is terminal at the default bound.
/// Side effects a retry depends on (session invalidation, endpoint
/// rewrite) happen before the verdict is returned.
#[async_trait]
pub trait RetryHandler: Send + Sync {
    /// Decide whether to resubmit `command` after `outcome`.
    async fn should_retry(
        &self,
        command: &mut Command,
        outcome: AttemptOutcome<'_>,
    ) -> RetryDecision;
}

/// Terminal on every failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

#[async_trait]
impl RetryHandler for NeverRetry {
    async fn should_retry(
        &self,
        _command: &mut Command,
        _outcome: AttemptOutcome<'_>,
    ) -> RetryDecision {
        RetryDecision::Stop
    }
}

/// Retries server errors (5xx), throttling (429) and transport faults with
/// bounded backoff, honoring `Retry-After` when the server sends one.
#[derive(Debug, Clone)]
pub struct BackoffLimitedRetryHandler {
    max_retries: u32,
    strategy: WaitStrategy,
}

impl Default for BackoffLimitedRetryHandler {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            strategy: WaitStrategy::default(),
        }
    }
}

impl BackoffLimitedRetryHandler {
    /// Create a handler with an explicit bound and wait strategy.
    pub fn new(max_retries: u32, strategy: WaitStrategy) -> Self {
        Self {
            max_retries,
            strategy,
        }
    }

    fn retryable_status(status: u16) -> bool {
        status == 429 || (500..=599).contains(&status)
    }
}

#[async_trait]
impl RetryHandler for BackoffLimitedRetryHandler {
    async fn should_retry(
        &self,
        command: &mut Command,
        outcome: AttemptOutcome<'_>,
    ) -> RetryDecision {
        let retry_after = match outcome {
            AttemptOutcome::Response(response) if Self::retryable_status(response.status()) => {
                wait::retry_after(response)
            }
            AttemptOutcome::Transport(_) => None,
            AttemptOutcome::Response(_) => return RetryDecision::Stop,
        };

        let failures = command.record_failure();
        if failures > self.max_retries {
            debug!(failures, max_retries = self.max_retries, "retries exhausted");
            return RetryDecision::Stop;
        }
        RetryDecision::retry_after(self.strategy.calculate(failures, retry_after))
    }
}

/// Invalidates the session and retries when the server reports 401.
///
/// Invalidation happens before the verdict so the next attempt forces
/// re-authentication. The store's idempotent invalidation and single-flight
/// loading keep a stampede of concurrent 401s down to one login.
pub struct SessionExpiryRetryHandler {
    cache: Arc<dyn SessionCache>,
    credentials: Credentials,
    max_retries: u32,
}

impl SessionExpiryRetryHandler {
    /// Create a handler invalidating `credentials` in `cache` on 401.
    pub fn new(cache: Arc<dyn SessionCache>, credentials: Credentials) -> Self {
        Self {
            cache,
            credentials,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the retry bound.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl fmt::Debug for SessionExpiryRetryHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionExpiryRetryHandler")
            .field("credentials", &self.credentials)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[async_trait]
impl RetryHandler for SessionExpiryRetryHandler {
    async fn should_retry(
        &self,
        command: &mut Command,
        outcome: AttemptOutcome<'_>,
    ) -> RetryDecision {
        let AttemptOutcome::Response(response) = outcome else {
            return RetryDecision::Stop;
        };
        if response.status() != 401 {
            return RetryDecision::Stop;
        }

        self.cache.invalidate(&self.credentials);
        let failures = command.record_failure();
        if failures > self.max_retries {
            warn!(failures, "session renewal did not clear 401");
            return RetryDecision::Stop;
        }
        debug!(failures, "session invalidated, retrying");
        RetryDecision::retry()
    }
}

/// Follows `Location` on 3xx responses by rewriting the command's
/// endpoint.
#[derive(Debug, Clone)]
pub struct RedirectionRetryHandler {
    max_retries: u32,
}

impl Default for RedirectionRetryHandler {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RedirectionRetryHandler {
    /// Create a handler following at most `max_retries` redirects.
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }
}

#[async_trait]
impl RetryHandler for RedirectionRetryHandler {
    async fn should_retry(
        &self,
        command: &mut Command,
        outcome: AttemptOutcome<'_>,
    ) -> RetryDecision {
        let AttemptOutcome::Response(response) = outcome else {
            return RetryDecision::Stop;
        };
        if !(300..400).contains(&response.status()) {
            return RetryDecision::Stop;
        }
        let Some(location) = response.headers().get("Location") else {
            return RetryDecision::Stop;
        };
        let target = match Url::parse(location) {
            Ok(url) => url,
            Err(_) => match command.request().endpoint().join(location) {
                Ok(url) => url,
                Err(_) => return RetryDecision::Stop,
            },
        };

        let failures = command.record_failure();
        if failures > self.max_retries {
            debug!(failures, "redirect limit reached");
            return RetryDecision::Stop;
        }
        debug!(%target, "following redirect");
        let mut request = command.request().clone();
        request.set_endpoint(target);
        command.replace_request(request);
        RetryDecision::retry()
    }
}

/// Routes each outcome to the handler responsible for its status class:
/// 3xx to the redirect handler, 401 to the session handler, 5xx/429 and
/// transport faults to the server-error handler. Unrouted outcomes stop.
pub struct DelegatingRetryHandler {
    redirect: Option<Box<dyn RetryHandler>>,
    unauthorized: Option<Box<dyn RetryHandler>>,
    server_error: Option<Box<dyn RetryHandler>>,
}

impl DelegatingRetryHandler {
    /// Create a router with no handlers attached.
    pub fn new() -> Self {
        Self {
            redirect: None,
            unauthorized: None,
            server_error: None,
        }
    }

    /// Handle 3xx outcomes with `handler`.
    #[must_use]
    pub fn on_redirect(mut self, handler: impl RetryHandler + 'static) -> Self {
        self.redirect = Some(Box::new(handler));
        self
    }

    /// Handle 401 outcomes with `handler`.
    #[must_use]
    pub fn on_unauthorized(mut self, handler: impl RetryHandler + 'static) -> Self {
        self.unauthorized = Some(Box::new(handler));
        self
    }

    /// Handle 5xx/429 and transport outcomes with `handler`.
    #[must_use]
    pub fn on_server_error(mut self, handler: impl RetryHandler + 'static) -> Self {
        self.server_error = Some(Box::new(handler));
        self
    }
}

impl Default for DelegatingRetryHandler {
    fn default() -> Self {
        Self::new().on_server_error(BackoffLimitedRetryHandler::default())
    }
}

impl fmt::Debug for DelegatingRetryHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingRetryHandler")
            .field("redirect", &self.redirect.is_some())
            .field("unauthorized", &self.unauthorized.is_some())
            .field("server_error", &self.server_error.is_some())
            .finish()
    }
}

#[async_trait]
impl RetryHandler for DelegatingRetryHandler {
    async fn should_retry(
        &self,
        command: &mut Command,
        outcome: AttemptOutcome<'_>,
    ) -> RetryDecision {
        let handler = match outcome {
            AttemptOutcome::Transport(_) => self.server_error.as_ref(),
            AttemptOutcome::Response(response) => match response.status() {
                status if (300..400).contains(&status) => self.redirect.as_ref(),
                401 => self.unauthorized.as_ref(),
                429 => self.server_error.as_ref(),
                status if status >= 500 => self.server_error.as_ref(),
                _ => None,
            },
        };
        match handler {
            Some(handler) => handler.should_retry(command, outcome).await,
            None => RetryDecision::Stop,
        }
    }
}
