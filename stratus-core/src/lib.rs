//! # stratus-core
//!
//! Value types shared by every stratus crate: commands, requests and
//! responses, credentials, and the typed error taxonomy that provider
//! policies classify into.
//!
//! This crate has no I/O dependencies. The execution engine, session store
//! and signers build on these types; vendor modules supply the policy
//! objects that consume them.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod command;
pub mod credentials;
pub mod errors;
pub mod request;
pub mod response;

// Re-exports
pub use command::{Command, Operation, OperationKind};
pub use credentials::{Credentials, CredentialsError};
pub use errors::{ApiError, ApiResult, ErrorKind};
pub use request::{Headers, Method, Payload, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};
