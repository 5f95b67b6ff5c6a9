//! Per-code reporting levels for diagnostics.

use crate::code::DiagnosticCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a diagnostic with a given code should be handled when it is raised.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Silently discard the diagnostic.
    Allow,
    /// Record the diagnostic and continue.
    #[default]
    Warn,
    /// Turn the diagnostic into a hard error.
    Deny,
}

/// Maps diagnostic codes to reporting [`Level`]s.
///
/// Codes without an explicit override use the filter's default level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticFilter {
    /// The level applied to codes with no override.
    #[serde(default)]
    pub default: Level,
    /// Explicit per-code levels, keyed by the code's display form (e.g. `"W304"`).
    #[serde(default)]
    pub overrides: BTreeMap<String, Level>,
}

impl DiagnosticFilter {
    /// Creates a filter that reports every code at [`Level::Warn`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter whose default level is `level`.
    pub fn with_default(level: Level) -> Self {
        Self {
            default: level,
            overrides: BTreeMap::new(),
        }
    }

    /// Overrides the level for one code.
    pub fn set(mut self, code: DiagnosticCode, level: Level) -> Self {
        self.overrides.insert(code.to_string(), level);
        self
    }

    /// Shorthand for `set(code, Level::Allow)`.
    pub fn allow(self, code: DiagnosticCode) -> Self {
        self.set(code, Level::Allow)
    }

    /// Shorthand for `set(code, Level::Deny)`.
    pub fn deny(self, code: DiagnosticCode) -> Self {
        self.set(code, Level::Deny)
    }

    /// Returns the effective level for `code`.
    pub fn level(&self, code: DiagnosticCode) -> Level {
        self.overrides
            .get(&code.to_string())
            .copied()
            .unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_warn() {
        let filter = DiagnosticFilter::new();
        assert_eq!(filter.level(DiagnosticCode::warning(304)), Level::Warn);
    }

    #[test]
    fn overrides_take_precedence() {
        let filter = DiagnosticFilter::with_default(Level::Allow)
            .deny(DiagnosticCode::warning(306))
            .set(DiagnosticCode::warning(302), Level::Warn);
        assert_eq!(filter.level(DiagnosticCode::warning(306)), Level::Deny);
        assert_eq!(filter.level(DiagnosticCode::warning(302)), Level::Warn);
        assert_eq!(filter.level(DiagnosticCode::warning(301)), Level::Allow);
    }

    #[test]
    fn allow_override() {
        let filter = DiagnosticFilter::new().allow(DiagnosticCode::warning(304));
        assert_eq!(filter.level(DiagnosticCode::warning(304)), Level::Allow);
        assert_eq!(filter.level(DiagnosticCode::warning(305)), Level::Warn);
    }

    #[test]
    fn deserialize_from_json() {
        let json = r#"{"default":"allow","overrides":{"W304":"deny"}}"#;
        let filter: DiagnosticFilter = serde_json::from_str(json).unwrap();
        assert_eq!(filter.level(DiagnosticCode::warning(304)), Level::Deny);
        assert_eq!(filter.level(DiagnosticCode::warning(301)), Level::Allow);
    }

    #[test]
    fn deserialize_missing_fields_uses_defaults() {
        let filter: DiagnosticFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, DiagnosticFilter::new());
    }
}
