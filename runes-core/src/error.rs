//! Error types.
//!
//! The signal graph and the reconciler do not fail under correct use. The only
//! recoverable failures come from looking up signals by name.

use thiserror::Error;

/// Errors raised by the named signal registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The key is not a valid signal identifier.
    #[error("invalid signal key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// No signal was declared under this key.
    #[error("no signal declared under key {0:?}")]
    UnknownKey(String),

    /// A signal was already declared under this key.
    #[error("signal key {0:?} is already declared")]
    DuplicateKey(String),

    /// The signal exists but holds a different value type.
    #[error("signal {key:?} holds `{actual}`, not `{requested}`")]
    TypeMismatch {
        key: String,
        requested: &'static str,
        actual: &'static str,
    },
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
