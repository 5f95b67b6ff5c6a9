//! Diagnostic severities and how reporting levels act on them.

use crate::filter::Level;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is.
///
/// Construction-time checks only ever raise warnings; a warning becomes an
/// error when the caller's filter denies its code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but legal; the operation that raised it completed.
    Warning,
    /// A denied warning, or a definite problem.
    Error,
}

impl Severity {
    /// Returns `true` if this severity is [`Error`](Severity::Error).
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// Returns the error severity. Errors stay errors.
    pub fn escalated(self) -> Severity {
        Severity::Error
    }

    /// Applies a reporting level, returning `None` when the diagnostic is
    /// allowed and therefore dropped.
    pub fn under(self, level: Level) -> Option<Severity> {
        match level {
            Level::Allow => None,
            Level::Warn => Some(self),
            Level::Deny => Some(self.escalated()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}
