//! Eventual-consistency helpers for resource creation.
//!
//! Providers acknowledge a create long before the resource is usable, and
//! some report "already exists" for a create that effectively succeeded
//! earlier. These helpers wrap both patterns: the creation call itself is
//! never retried, only the probe loops.

use std::future::Future;
use std::time::Duration;
use stratus_core::{ApiError, ApiResult, ErrorKind};
use tracing::debug;

/// Poll cadence and deadline for availability waits.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Time between probes.
    pub interval: Duration,
    /// Give up after this long.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl PollSettings {
    /// Create settings with an explicit cadence and deadline.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Create a resource, treating a conflicting-state failure as "already
/// exists" and returning the fetched existing resource instead.
pub async fn get_or_fetch_existing<T, C, CF, G, GF>(create: C, fetch: G) -> ApiResult<T>
where
    C: FnOnce() -> CF,
    CF: Future<Output = ApiResult<T>>,
    G: FnOnce() -> GF,
    GF: Future<Output = ApiResult<T>>,
{
    match create().await {
        Ok(created) => Ok(created),
        Err(error) if error.kind == ErrorKind::ConflictingState => {
            debug!(%error, "resource already exists, fetching it instead");
            fetch().await
        }
        Err(error) => Err(error),
    }
}

/// Probe until `ready` holds, tolerating not-found as "not yet visible".
///
/// Bounded by the poll deadline; running out of time reports a
/// conflicting-state error naming the wait.
pub async fn await_available<T, P, PF, R>(
    settings: PollSettings,
    mut probe: P,
    ready: R,
) -> ApiResult<T>
where
    P: FnMut() -> PF,
    PF: Future<Output = ApiResult<T>>,
    R: Fn(&T) -> bool,
{
    let deadline = tokio::time::Instant::now() + settings.timeout;
    loop {
        match probe().await {
            Ok(resource) if ready(&resource) => return Ok(resource),
            Ok(_) => {}
            Err(error) if error.kind == ErrorKind::ResourceNotFound => {}
            Err(error) => return Err(error),
        }
        if tokio::time::Instant::now() + settings.interval > deadline {
            return Err(ApiError::conflict(format!(
                "resource did not become available within {:?}",
                settings.timeout
            )));
        }
        tokio::time::sleep(settings.interval).await;
    }
}
