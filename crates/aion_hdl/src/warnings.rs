//! Advisory warnings and the scoped channel that collects them.
//!
//! Warning codes `W301`--`W306` flag constructs that are legal but almost
//! certainly mistakes. Raising one never aborts construction by itself: the
//! innermost [`capture`] scope on the current thread decides, through its
//! [`DiagnosticFilter`], whether the warning is dropped, recorded, or turned
//! into [`HdlError::Denied`]. With no scope active the warning is logged
//! through `tracing`.

use crate::error::{HdlError, HdlResult};
use aion_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticFilter, DiagnosticSink};
use std::cell::RefCell;
use std::panic::Location;
use std::rc::Rc;

/// A constant equals the non-inclusive end of its range shape.
pub const W301: DiagnosticCode = DiagnosticCode::warning(301);

/// A signed initial value for an unsigned signal.
pub const W302: DiagnosticCode = DiagnosticCode::warning(302);

/// An initial value that does not fit the signal shape and gets truncated.
pub const W303: DiagnosticCode = DiagnosticCode::warning(303);

/// A bare integer (other than 0 or 1) used as a concatenation argument.
pub const W304: DiagnosticCode = DiagnosticCode::warning(304);

/// An enumerated value without a defined shape used as a concatenation argument.
pub const W305: DiagnosticCode = DiagnosticCode::warning(305);

/// A match pattern that is not representable in the matched value's shape.
pub const W306: DiagnosticCode = DiagnosticCode::warning(306);

struct Scope {
    filter: DiagnosticFilter,
    sink: Rc<DiagnosticSink>,
}

thread_local! {
    static SCOPES: RefCell<Vec<Scope>> = const { RefCell::new(Vec::new()) };
}

struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}

/// Runs `f` with a warning scope governed by `filter`.
///
/// Returns the result of `f` together with every warning recorded inside the
/// scope, in emission order. Denied warnings are recorded as errors and also
/// returned to the code that raised them as [`HdlError::Denied`]. Scopes nest;
/// only the innermost one sees a warning.
pub fn capture<R>(filter: DiagnosticFilter, f: impl FnOnce() -> R) -> (R, Vec<Diagnostic>) {
    let sink = Rc::new(DiagnosticSink::new());
    SCOPES.with(|scopes| {
        scopes.borrow_mut().push(Scope {
            filter,
            sink: Rc::clone(&sink),
        })
    });
    let guard = ScopeGuard;
    let result = f();
    drop(guard);
    (result, sink.take_all())
}

/// Shorthand for [`capture`] with a filter that records every warning.
pub fn collect<R>(f: impl FnOnce() -> R) -> (R, Vec<Diagnostic>) {
    capture(DiagnosticFilter::new(), f)
}

/// Raises a warning with `code` and `message` at the caller's location.
#[track_caller]
pub(crate) fn emit(code: DiagnosticCode, message: impl Into<String>) -> HdlResult<()> {
    let location = Location::caller();
    let diag = Diagnostic::warning(code, message).with_location(format!(
        "{}:{}:{}",
        location.file(),
        location.line(),
        location.column()
    ));
    SCOPES.with(|scopes| {
        let scopes = scopes.borrow();
        let Some(scope) = scopes.last() else {
            tracing::warn!(code = %diag.code, location = ?diag.location, "{}", diag.message);
            return Ok(());
        };
        let Some(diag) = diag.filtered(&scope.filter) else {
            return Ok(());
        };
        scope.sink.emit(diag.clone());
        if diag.severity.is_error() {
            Err(HdlError::Denied(diag))
        } else {
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_diagnostics::{Level, Severity};

    #[test]
    fn warn_records() {
        let (result, diags) = collect(|| emit(W304, "bare integer"));
        assert!(result.is_ok());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, W304);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert!(diags[0].location.as_deref().unwrap().contains("warnings.rs"));
    }

    #[test]
    fn allow_drops() {
        let filter = DiagnosticFilter::new().allow(W304);
        let (result, diags) = capture(filter, || emit(W304, "bare integer"));
        assert!(result.is_ok());
        assert!(diags.is_empty());
    }

    #[test]
    fn deny_errors_and_records() {
        let filter = DiagnosticFilter::new().deny(W306);
        let (result, diags) = capture(filter, || emit(W306, "never true"));
        match result {
            Err(HdlError::Denied(diag)) => {
                assert_eq!(diag.code, W306);
                assert!(diag.severity.is_error());
            }
            other => panic!("expected denial, got {other:?}"),
        }
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn innermost_scope_wins() {
        let ((inner, inner_diags), outer_diags) = collect(|| {
            capture(DiagnosticFilter::with_default(Level::Allow), || {
                emit(W301, "fencepost")
            })
        });
        assert!(inner.is_ok());
        assert!(inner_diags.is_empty());
        assert!(outer_diags.is_empty());
    }

    #[test]
    fn scope_is_popped_after_capture() {
        let _ = collect(|| emit(W302, "signed"));
        SCOPES.with(|scopes| assert!(scopes.borrow().is_empty()));
    }

    #[test]
    fn unscoped_emit_is_ok() {
        assert!(emit(W303, "truncated").is_ok());
    }
}
