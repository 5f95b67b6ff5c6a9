//! Structured diagnostic messages with severity, codes, and caller locations.

use crate::code::DiagnosticCode;
use crate::filter::DiagnosticFilter;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structured diagnostic message with an optional caller location.
///
/// Diagnostics are the mechanism for reporting suspicious constructs to the
/// user without aborting the operation that found them. Each diagnostic includes:
/// - A severity level and unique code
/// - A primary message
/// - The `file:line:column` of the user code that triggered it, when known
/// - Optional notes and help text
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique code identifying the type of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The user source location that triggered the diagnostic, as `file:line:column`.
    pub location: Option<String>,
    /// Explanatory footnotes (e.g., "note: ...").
    pub notes: Vec<String>,
    /// Actionable suggestions (e.g., "help: ...").
    pub help: Vec<String>,
}

impl Diagnostic {
    fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a new error diagnostic with the given code and message.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Creates a new warning diagnostic with the given code and message.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Attaches the location of the user code that triggered this diagnostic.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    /// Returns a copy of this diagnostic promoted to [`Severity::Error`].
    pub fn escalated(mut self) -> Self {
        self.severity = self.severity.escalated();
        self
    }

    /// Applies `filter` to this diagnostic's code.
    ///
    /// Returns `None` if the code is allowed, and the diagnostic escalated to
    /// an error if the code is denied.
    pub fn filtered(mut self, filter: &DiagnosticFilter) -> Option<Self> {
        self.severity = self.severity.under(filter.level(self.code))?;
        Some(self)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, "\n  --> {location}")?;
        }
        for note in &self.notes {
            write!(f, "\n  = note: {note}")?;
        }
        for help in &self.help {
            write!(f, "\n  = help: {help}")?;
        }
        Ok(())
    }
}
