#![forbid(unsafe_code)]

//! Errors surfaced by store operations.
//!
//! Path traversal never fails: reads of missing slots yield `None` and
//! writes through non-containers replace them. The only fallible call is
//! initialization.

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// `init` was called on a store that was already initialized. The
    /// existing state is left untouched.
    #[error("state already initialized")]
    AlreadyInitialized,
}

/// Result alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
