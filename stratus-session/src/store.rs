//! The credentials-keyed session cache.

use crate::token::SessionToken;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stratus_core::Credentials;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

/// Errors from session establishment.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The server rejected the login.
    #[error("login rejected: {0}")]
    LoginRejected(String),

    /// The login call failed before a verdict (connection loss, timeout).
    #[error("login failed: {0}")]
    LoginFailed(String),
}

/// The external re-authentication collaborator.
#[async_trait]
pub trait SessionLoader: Send + Sync {
    /// Perform a login and return a fresh session token.
    async fn login(&self, credentials: &Credentials) -> Result<SessionToken, SessionError>;
}

/// A cache of session tokens keyed by credentials.
///
/// These three operations are all the execution engine requires of a
/// session backing store.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Return the cached token for `credentials`, logging in on a miss.
    async fn get_or_load(&self, credentials: &Credentials) -> Result<SessionToken, SessionError>;

    /// Drop the cached token for `credentials`. Idempotent and a no-op for
    /// absent keys.
    fn invalidate(&self, credentials: &Credentials);

    /// Drop every cached token.
    fn invalidate_all(&self);
}

/// In-memory [`SessionCache`] with per-key single-flight loading.
///
/// Concurrent `get_or_load` calls for one key share a single login call and
/// all receive its token. `invalidate` drops only a *completed* entry: an
/// in-flight login is left alone, since its result is already a fresh token
/// for every waiter. That is what collapses a stampede of concurrent
/// invalidate-and-reload cycles (a batch of commands all hitting 401) into
/// one login on the wire.
pub struct LoadingSessionStore {
    loader: Arc<dyn SessionLoader>,
    entries: Mutex<HashMap<Credentials, Arc<OnceCell<SessionToken>>>>,
}

impl LoadingSessionStore {
    /// Create a store backed by `loader`.
    pub fn new(loader: Arc<dyn SessionLoader>) -> Self {
        Self {
            loader,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn cell_for(&self, credentials: &Credentials) -> Arc<OnceCell<SessionToken>> {
        let mut entries = self.entries.lock();
        entries
            .entry(credentials.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}

impl fmt::Debug for LoadingSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingSessionStore")
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

#[async_trait]
impl SessionCache for LoadingSessionStore {
    async fn get_or_load(&self, credentials: &Credentials) -> Result<SessionToken, SessionError> {
        let cell = self.cell_for(credentials);
        let token = cell
            .get_or_try_init(|| async {
                debug!(identity = credentials.identity(), "establishing session");
                self.loader.login(credentials).await
            })
            .await?;
        Ok(token.clone())
    }

    fn invalidate(&self, credentials: &Credentials) {
        let mut entries = self.entries.lock();
        if let Some(cell) = entries.get(credentials) {
            if cell.initialized() {
                debug!(identity = credentials.identity(), "invalidating session");
                entries.remove(credentials);
            }
        }
    }

    fn invalidate_all(&self) {
        self.entries.lock().retain(|_, cell| !cell.initialized());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    struct CountingLoader {
        logins: AtomicU32,
        delay: Duration,
        fail_first: bool,
    }

    impl CountingLoader {
        fn new() -> Self {
            Self {
                logins: AtomicU32::new(0),
                delay: Duration::ZERO,
                fail_first: false,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new()
            }
        }

        fn count(&self) -> u32 {
            self.logins.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionLoader for CountingLoader {
        async fn login(&self, credentials: &Credentials) -> Result<SessionToken, SessionError> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(SessionError::LoginFailed("connection reset".into()));
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(SessionToken::new(format!(
                "sess-{}-{}",
                credentials.identity(),
                n
            )))
        }
    }

    fn creds() -> Credentials {
        Credentials::new("acct-1", "secret")
    }

    #[tokio::test]
    async fn test_get_or_load_caches() {
        let loader = Arc::new(CountingLoader::new());
        let store = LoadingSessionStore::new(loader.clone());

        let first = store.get_or_load(&creds()).await.unwrap();
        let second = store.get_or_load(&creds()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(loader.count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let loader = Arc::new(CountingLoader::new());
        let store = LoadingSessionStore::new(loader.clone());

        let first = store.get_or_load(&creds()).await.unwrap();
        store.invalidate(&creds());
        let second = store.get_or_load(&creds()).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(loader.count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_absent_key_is_noop() {
        let loader = Arc::new(CountingLoader::new());
        let store = LoadingSessionStore::new(loader.clone());

        store.invalidate(&creds());
        store.invalidate(&creds());
        assert_eq!(loader.count(), 0);
    }

    #[tokio::test]
    async fn test_double_invalidate_equals_single() {
        let loader = Arc::new(CountingLoader::new());
        let store = LoadingSessionStore::new(loader.clone());

        store.get_or_load(&creds()).await.unwrap();
        store.invalidate(&creds());
        store.invalidate(&creds());
        store.get_or_load(&creds()).await.unwrap();

        assert_eq!(loader.count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_collapse_to_one_login() {
        let loader = Arc::new(CountingLoader::slow(Duration::from_millis(50)));
        let store = Arc::new(LoadingSessionStore::new(loader.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.get_or_load(&creds()).await.unwrap()
            }));
        }

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap());
        }

        assert_eq!(loader.count(), 1);
        assert!(tokens.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_renewal_collapses_to_one_login() {
        let loader = Arc::new(CountingLoader::slow(Duration::from_millis(100)));
        let store = Arc::new(LoadingSessionStore::new(loader.clone()));

        // Seed the cache, as if every command had been using this token.
        store.get_or_load(&creds()).await.unwrap();
        assert_eq!(loader.count(), 1);

        // Eight commands observe 401 at once: each invalidates and reloads.
        let barrier = Arc::new(Barrier::new(8));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                store.invalidate(&creds());
                store.get_or_load(&creds()).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // One seed login plus exactly one renewal.
        assert_eq!(loader.count(), 2);
    }

    #[tokio::test]
    async fn test_failed_login_is_not_cached() {
        let loader = Arc::new(CountingLoader {
            fail_first: true,
            ..CountingLoader::new()
        });
        let store = LoadingSessionStore::new(loader.clone());

        assert!(store.get_or_load(&creds()).await.is_err());
        let token = store.get_or_load(&creds()).await.unwrap();

        assert_eq!(token.value(), "sess-acct-1-1");
        assert_eq!(loader.count(), 2);
    }
}
