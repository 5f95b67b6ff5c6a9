//! Error types for the value and shape algebra.
//!
//! Every fallible construction returns [`HdlResult`]. The variants of
//! [`HdlError`] mirror the failure classes callers need to tell apart: a wrong
//! kind of argument, a value outside its domain, an out-of-range index, a
//! malformed pattern or initializer, and a self-referential cast chain.
//! Warnings escalated by a deny filter surface as [`HdlError::Denied`].

use aion_diagnostics::Diagnostic;
use std::fmt;

/// Convenience alias used throughout the crate.
pub type HdlResult<T> = Result<T, HdlError>;

/// Errors raised while building shapes, values, formats and statements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HdlError {
    /// An argument of the wrong kind, or an object that cannot be cast.
    #[error("{reason}")]
    Type {
        /// The exact message.
        reason: String,
    },

    /// An argument of the right kind whose value is not acceptable.
    #[error("{reason}")]
    Value {
        /// The exact message.
        reason: String,
    },

    /// An index or slice bound outside of the indexed value.
    #[error("{reason}")]
    Index {
        /// The exact message.
        reason: String,
    },

    /// A malformed pattern or an initializer that contradicts its shape.
    #[error("{reason}")]
    Syntax {
        /// The exact message.
        reason: String,
    },

    /// A castable object that resolves to itself.
    #[error("{reason}")]
    Recursion {
        /// The exact message.
        reason: String,
    },

    /// A warning that the active diagnostic filter turned into an error.
    #[error("{}", .0.message)]
    Denied(Diagnostic),
}

/// The failure class of an [`HdlError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`HdlError::Type`].
    Type,
    /// See [`HdlError::Value`].
    Value,
    /// See [`HdlError::Index`].
    Index,
    /// See [`HdlError::Syntax`].
    Syntax,
    /// See [`HdlError::Recursion`].
    Recursion,
    /// See [`HdlError::Denied`].
    Denied,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Type => "type error",
            ErrorKind::Value => "value error",
            ErrorKind::Index => "index error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::Recursion => "recursion error",
            ErrorKind::Denied => "denied warning",
        };
        f.write_str(name)
    }
}

impl HdlError {
    /// Creates a [`HdlError::Type`].
    pub fn type_error(reason: impl Into<String>) -> Self {
        HdlError::Type {
            reason: reason.into(),
        }
    }

    /// Creates a [`HdlError::Value`].
    pub fn value_error(reason: impl Into<String>) -> Self {
        HdlError::Value {
            reason: reason.into(),
        }
    }

    /// Creates a [`HdlError::Index`].
    pub fn index_error(reason: impl Into<String>) -> Self {
        HdlError::Index {
            reason: reason.into(),
        }
    }

    /// Creates a [`HdlError::Syntax`].
    pub fn syntax_error(reason: impl Into<String>) -> Self {
        HdlError::Syntax {
            reason: reason.into(),
        }
    }

    /// Creates a [`HdlError::Recursion`].
    pub fn recursion_error(reason: impl Into<String>) -> Self {
        HdlError::Recursion {
            reason: reason.into(),
        }
    }

    /// Returns the failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HdlError::Type { .. } => ErrorKind::Type,
            HdlError::Value { .. } => ErrorKind::Value,
            HdlError::Index { .. } => ErrorKind::Index,
            HdlError::Syntax { .. } => ErrorKind::Syntax,
            HdlError::Recursion { .. } => ErrorKind::Recursion,
            HdlError::Denied(_) => ErrorKind::Denied,
        }
    }
}
