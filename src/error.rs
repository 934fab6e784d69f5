//! Error types.
//!
//! Three failure categories are distinguished (callers are expected to react
//! differently to each):
//!
//! - [`TreeError::InvariantViolated`] - a caller bug: unsorted or duplicated
//!   batch keys, an unsupported stream key width. Reported synchronously with
//!   no partial mutation of the tree.
//! - [`TreeError::Corrupted`] - a structural invariant of a tree failed,
//!   meaning an implementation bug or externally corrupted persisted state.
//! - [`TreeError::Parse`] / [`TreeError::Io`] - boundary failures while
//!   reading key streams or CSV state dumps; the core itself performs no I/O.
//!
//! Errors are never caught and masked internally, and there are no retries.

use std::fmt;

/// Error type for all fallible operations in this crate.
#[derive(Debug)]
pub enum TreeError {
    /// A caller-side precondition does not hold.
    InvariantViolated(String),

    /// A structural invariant of a tree does not hold.
    Corrupted(String),

    /// A CSV line or stream frame could not be decoded.
    Parse(String),

    /// An underlying read failed.
    Io(std::io::Error),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvariantViolated(msg) => write!(f, "invariant violated: {msg}"),

            Self::Corrupted(msg) => write!(f, "tree corrupted: {msg}"),

            Self::Parse(msg) => write!(f, "parse error: {msg}"),

            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TreeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Convenience alias for results carrying a [`TreeError`].
pub type TreeResult<T> = Result<T, TreeError>;
