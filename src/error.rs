//! Error types for preflight validation
//!
//! Two kinds of failure flow through this crate: remote-lookup failures,
//! which are memoized by the inventory cache and therefore carry a small
//! `Clone`-able error type, and validation failures, which are aggregated
//! into a [`ValidationErrors`](crate::diagnostics::ValidationErrors) list
//! rather than raised one at a time.

use thiserror::Error;

use crate::diagnostics::ValidationErrors;

/// Main error type for preflight operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A remote inventory or DNS lookup failed
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// A session scoped to a region could not be constructed
    #[error("session error for region {region}: {message}")]
    Session {
        /// Region the session was scoped to
        region: String,
        /// Description of what failed
        message: String,
    },

    /// The install configuration failed validation
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl Error {
    /// Create a session error for the given region
    pub fn session(region: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Session {
            region: region.into(),
            message: message.into(),
        }
    }
}

/// A failed remote lookup.
///
/// Lookup failures are memoized by the inventory cache for the duration of
/// a validation run, so every waiter on the same lookup receives the same
/// error. That is why this type is `Clone`, unlike [`Error`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{what} lookup failed: {message}")]
pub struct LookupError {
    /// Which lookup failed (e.g. "private subnets", "hosted zone")
    pub what: String,
    /// Description of the failure, safe to render to an end user
    pub message: String,
}

impl LookupError {
    /// Create a lookup error for the named lookup
    pub fn new(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            message: message.into(),
        }
    }
}
