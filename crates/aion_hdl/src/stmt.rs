//! Statements: assignment, switch, print and formal properties.
//!
//! Statements are leaves of a behavioral description; control flow above a
//! single switch lives outside this crate.

use crate::cast::ValueLike;
use crate::error::HdlResult;
use crate::format::{Format, FormatArg};
use crate::switch::{normalize_patterns, Pattern};
use crate::value::Value;
use std::fmt;

/// Drives `lhs` with `rhs`.
#[derive(Clone, Debug)]
pub struct Assign {
    lhs: Value,
    rhs: Value,
}

impl Assign {
    /// Creates an assignment.
    pub fn new(lhs: impl Into<ValueLike>, rhs: impl Into<ValueLike>) -> HdlResult<Assign> {
        Ok(Assign {
            lhs: Value::cast(lhs)?,
            rhs: Value::cast(rhs)?,
        })
    }

    /// Returns the assigned value.
    pub fn lhs(&self) -> &Value {
        &self.lhs
    }

    /// Returns the driving value.
    pub fn rhs(&self) -> &Value {
        &self.rhs
    }
}

impl fmt::Display for Assign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(eq {} {})", self.lhs, self.rhs)
    }
}

impl Value {
    /// Builds the statement driving `self` with `rhs`.
    pub fn assign(&self, rhs: impl Into<ValueLike>) -> HdlResult<Assign> {
        Assign::new(self.clone(), rhs)
    }
}

/// Executes the statements of the first case whose patterns match `test`.
#[derive(Clone, Debug)]
pub struct Switch {
    test: Value,
    cases: Vec<(Option<Vec<String>>, Vec<Statement>)>,
}

impl Switch {
    /// Creates a switch, normalizing every pattern against `test`'s shape.
    ///
    /// A case without patterns is the default case.
    #[track_caller]
    pub fn new(
        test: impl Into<ValueLike>,
        cases: Vec<(Option<Vec<Pattern>>, Vec<Statement>)>,
    ) -> HdlResult<Switch> {
        let test = Value::cast(test)?;
        let shape = test.shape();
        let mut normalized = Vec::with_capacity(cases.len());
        for (patterns, body) in cases {
            let patterns = match patterns {
                Some(patterns) => Some(normalize_patterns(&patterns, shape)?),
                None => None,
            };
            normalized.push((patterns, body));
        }
        Ok(Switch {
            test,
            cases: normalized,
        })
    }

    /// Returns the value the patterns are matched against.
    pub fn test(&self) -> &Value {
        &self.test
    }

    /// Returns the normalized cases in priority order.
    pub fn cases(&self) -> &[(Option<Vec<String>>, Vec<Statement>)] {
        &self.cases
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(switch {}", self.test)?;
        for (patterns, body) in &self.cases {
            match patterns {
                Some(patterns) if patterns.is_empty() => f.write_str(" (case")?,
                Some(patterns) => write!(f, " (case {}", patterns.join(" "))?,
                None => f.write_str(" (default")?,
            }
            for stmt in body {
                write!(f, " {stmt}")?;
            }
            f.write_str(")")?;
        }
        f.write_str(")")
    }
}

/// Prints its arguments at runtime.
#[derive(Clone, Debug)]
pub struct Print {
    message: Format,
}

impl Print {
    /// Prints `args` separated by spaces and followed by a newline.
    #[track_caller]
    pub fn new(args: Vec<FormatArg>) -> HdlResult<Print> {
        Print::with_separators(args, " ", "\n")
    }

    /// Prints `args` separated by `sep` and followed by `end`.
    ///
    /// String arguments are printed verbatim; everything else is formatted
    /// with an empty specifier.
    #[track_caller]
    pub fn with_separators(args: Vec<FormatArg>, sep: &str, end: &str) -> HdlResult<Print> {
        let escape = |text: &str| text.replace('{', "{{").replace('}', "}}");
        let mut template = String::new();
        let mut format_args = Vec::new();
        for (index, arg) in args.into_iter().enumerate() {
            if index > 0 {
                template.push_str(&escape(sep));
            }
            match arg {
                FormatArg::Str(text) => template.push_str(&escape(&text)),
                other => {
                    template.push_str("{}");
                    format_args.push(other);
                }
            }
        }
        template.push_str(&escape(end));
        Ok(Print {
            message: Format::new(&template, format_args)?,
        })
    }

    /// Returns the compiled message.
    pub fn message(&self) -> &Format {
        &self.message
    }
}

impl fmt::Display for Print {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(print {})", self.message)
    }
}

/// The flavor of a formal property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// The test must always hold.
    Assert,
    /// The test is assumed to always hold.
    Assume,
    /// The test must be reachable.
    Cover,
}

impl PropertyKind {
    fn keyword(self) -> &'static str {
        match self {
            PropertyKind::Assert => "assert",
            PropertyKind::Assume => "assume",
            PropertyKind::Cover => "cover",
        }
    }
}

/// A formal property with an optional message.
#[derive(Clone, Debug)]
pub struct Property {
    kind: PropertyKind,
    test: Value,
    message: Option<Format>,
}

impl Property {
    /// Creates a property of `kind` over `test`.
    pub fn new(kind: PropertyKind, test: impl Into<ValueLike>) -> HdlResult<Property> {
        Ok(Property {
            kind,
            test: Value::cast(test)?,
            message: None,
        })
    }

    /// Creates an assertion.
    pub fn assert(test: impl Into<ValueLike>) -> HdlResult<Property> {
        Property::new(PropertyKind::Assert, test)
    }

    /// Creates an assumption.
    pub fn assume(test: impl Into<ValueLike>) -> HdlResult<Property> {
        Property::new(PropertyKind::Assume, test)
    }

    /// Creates a cover property.
    pub fn cover(test: impl Into<ValueLike>) -> HdlResult<Property> {
        Property::new(PropertyKind::Cover, test)
    }

    /// Attaches a message printed when the property fails.
    pub fn with_message(mut self, message: Format) -> Property {
        self.message = Some(message);
        self
    }

    /// Attaches a literal message.
    pub fn with_text(self, text: &str) -> Property {
        self.with_message(Format::text(text))
    }

    /// Returns the property flavor.
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Returns the tested value.
    pub fn test(&self) -> &Value {
        &self.test
    }

    /// Returns the message, if any.
    pub fn message(&self) -> Option<&Format> {
        self.message.as_ref()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {}", self.kind.keyword(), self.test)?;
        if let Some(message) = &self.message {
            write!(f, " {message}")?;
        }
        f.write_str(")")
    }
}

/// Any statement.
#[derive(Clone, Debug)]
pub enum Statement {
    /// An assignment.
    Assign(Assign),
    /// A switch.
    Switch(Switch),
    /// A print.
    Print(Print),
    /// A formal property.
    Property(Property),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign(s) => write!(f, "{s}"),
            Statement::Switch(s) => write!(f, "{s}"),
            Statement::Print(s) => write!(f, "{s}"),
            Statement::Property(s) => write!(f, "{s}"),
        }
    }
}

impl From<Assign> for Statement {
    fn from(stmt: Assign) -> Self {
        Statement::Assign(stmt)
    }
}

impl From<Switch> for Statement {
    fn from(stmt: Switch) -> Self {
        Statement::Switch(stmt)
    }
}

impl From<Print> for Statement {
    fn from(stmt: Print) -> Self {
        Statement::Print(stmt)
    }
}

impl From<Property> for Statement {
    fn from(stmt: Property) -> Self {
        Statement::Property(stmt)
    }
}
