//! # stratus-session
//!
//! The credentials→session-token cache shared by every command a client
//! context issues.
//!
//! A session token stands in for re-authentication on every call. Tokens are
//! created lazily on first use, invalidated explicitly when the server
//! reports them expired, and re-created lazily on the next use. The store
//! guarantees at most one in-flight login per credentials key: concurrent
//! callers that all miss (or all invalidate at once after a batch of 401s)
//! share a single login call and its resulting token.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod store;
pub mod token;

// Re-exports
pub use store::{LoadingSessionStore, SessionCache, SessionError, SessionLoader};
pub use token::SessionToken;
