//! Structured diagnostics with severity levels, codes, and caller-controlled filtering.
//!
//! This crate provides [`Diagnostic`] messages identified by a [`DiagnosticCode`],
//! the thread-safe [`DiagnosticSink`] that accumulates them, and the
//! [`DiagnosticFilter`] that lets a caller allow, report, or deny each code
//! independently.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod filter;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use filter::{DiagnosticFilter, Level};
pub use severity::Severity;
pub use sink::DiagnosticSink;
