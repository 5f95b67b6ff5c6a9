//! The value AST.
//!
//! [`Value`] is a closed enum over every expression node. Children are owned,
//! so an expression is a tree; signals are the only shared leaves and compare
//! by identity. Shapes are computed on demand from the node and its children
//! and never fail, because every fallible check happens when the node is
//! built. `Display` renders the canonical prefix-notation form, such as
//! `(+ (const 4'd0) (sig a))`.
//!
//! `Value` deliberately implements neither `PartialEq` nor `Hash`: comparison
//! methods such as [`Value::eq`] build expressions instead of answering
//! questions about them.

use crate::cast::ValueLike;
use crate::error::{HdlError, HdlResult};
use crate::shape::{bits_for, unsigned, Shape};
use crate::warnings::{self, W304, W305};
use num_bigint::BigInt;
use std::fmt;

pub use crate::const_value::Const;
pub use crate::ops::{Op, Operator};
pub use crate::signal::Signal;
pub use crate::slice::{Part, Slice};
pub use crate::switch::SwitchValue;

/// An expression producing a bit vector.
#[derive(Clone, Debug)]
pub enum Value {
    /// A constant.
    Const(Const),
    /// A named storage cell.
    Signal(Signal),
    /// The clock of a domain.
    ClockSignal(ClockSignal),
    /// The reset of a domain.
    ResetSignal(ResetSignal),
    /// The initialization flag.
    Initial(Initial),
    /// A static bit range.
    Slice(Slice),
    /// A dynamically offset bit range.
    Part(Part),
    /// A concatenation, least significant part first.
    Concat(Concat),
    /// A unary or binary operator.
    Operator(Operator),
    /// A multiplexer keyed by bit patterns.
    SwitchValue(SwitchValue),
}

impl Value {
    /// Returns the shape of the value.
    pub fn shape(&self) -> Shape {
        match self {
            Value::Const(c) => c.shape(),
            Value::Signal(s) => s.shape(),
            Value::ClockSignal(_) | Value::ResetSignal(_) | Value::Initial(_) => unsigned(1),
            Value::Slice(s) => unsigned(s.stop() - s.start()),
            Value::Part(p) => unsigned(p.width()),
            Value::Concat(c) => c.shape(),
            Value::Operator(o) => o.shape(),
            Value::SwitchValue(s) => s.shape(),
        }
    }

    /// Returns the width of the value in bits.
    pub fn width(&self) -> usize {
        self.shape().width()
    }

    /// Returns the constant this value is, if it is a plain constant.
    pub fn as_const(&self) -> Option<&Const> {
        match self {
            Value::Const(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the signal this value is, if it is a plain signal.
    pub fn as_signal(&self) -> Option<&Signal> {
        match self {
            Value::Signal(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(c) => write!(f, "{c}"),
            Value::Signal(s) => write!(f, "{s}"),
            Value::ClockSignal(s) => write!(f, "{s}"),
            Value::ResetSignal(s) => write!(f, "{s}"),
            Value::Initial(s) => write!(f, "{s}"),
            Value::Slice(s) => write!(f, "{s}"),
            Value::Part(p) => write!(f, "{p}"),
            Value::Concat(c) => write!(f, "{c}"),
            Value::Operator(o) => write!(f, "{o}"),
            Value::SwitchValue(s) => write!(f, "{s}"),
        }
    }
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Const(Const::of(value))
                }
            }
        )*
    };
}

value_from_int!(i32, i64, u32, u64, usize, BigInt);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Const(Const::of(u8::from(value)))
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl From<&Signal> for Value {
    fn from(signal: &Signal) -> Self {
        Value::Signal(signal.clone())
    }
}

macro_rules! value_from_node {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Value {
                fn from(node: $variant) -> Self {
                    Value::$variant(node)
                }
            }
        )*
    };
}

value_from_node!(
    Const,
    Signal,
    ClockSignal,
    ResetSignal,
    Initial,
    Slice,
    Part,
    Concat,
    Operator,
    SwitchValue
);

/// Concatenation of values; the first part occupies the least significant bits.
#[derive(Clone, Debug)]
pub struct Concat {
    parts: Vec<Value>,
}

impl Concat {
    /// Concatenates already-cast parts without raising any warning.
    pub fn new(parts: Vec<Value>) -> Concat {
        Concat { parts }
    }

    /// Returns the parts, least significant first.
    pub fn parts(&self) -> &[Value] {
        &self.parts
    }

    /// Returns the shape: unsigned, as wide as all parts together.
    pub fn shape(&self) -> Shape {
        unsigned(self.parts.iter().map(Value::width).sum())
    }
}

impl fmt::Display for Concat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(cat ")?;
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str(")")
    }
}

/// Concatenates value-like arguments.
///
/// Bare integers other than 0 and 1 raise warning `W304`, and members of
/// enumerations without a declared shape raise `W305`, since their width is
/// an accident of their value. The concatenation is still built.
#[track_caller]
pub fn cat<I>(args: I) -> HdlResult<Value>
where
    I: IntoIterator,
    I::Item: Into<ValueLike>,
{
    let mut parts = Vec::new();
    for (index, arg) in args.into_iter().enumerate() {
        let arg = arg.into();
        match &arg {
            ValueLike::Int(v) if *v != BigInt::from(0) && *v != BigInt::from(1) => {
                warnings::emit(
                    W304,
                    format!(
                        "Argument #{} of Cat() is a bare integer {v} used in bit vector context; \
                         specify the width explicitly using C({v}, {})",
                        index + 1,
                        bits_for(v, false)
                    ),
                )?;
            }
            ValueLike::Member(member) if !member.is_typed() => {
                warnings::emit(
                    W305,
                    format!(
                        "Argument #{} of Cat() is an enumerated value {member} without a defined \
                         shape used in bit vector context; define the enumeration by inheriting \
                         from the class in amaranth.lib.enum and specifying the 'shape=' keyword \
                         argument",
                        index + 1
                    ),
                )?;
            }
            _ => {}
        }
        parts.push(Value::cast(arg)?);
    }
    Ok(Value::Concat(Concat::new(parts)))
}

fn check_domain(domain: &str, what: &str) -> HdlResult<()> {
    if domain == "comb" {
        return Err(HdlError::value_error(format!(
            "Domain '{domain}' does not have a {what}"
        )));
    }
    Ok(())
}

/// The clock signal of a clock domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockSignal {
    domain: String,
}

impl ClockSignal {
    /// Refers to the clock of `domain`. The `comb` domain has no clock.
    pub fn new(domain: impl Into<String>) -> HdlResult<ClockSignal> {
        let domain = domain.into();
        check_domain(&domain, "clock")?;
        Ok(ClockSignal { domain })
    }

    /// Returns the domain name.
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Default for ClockSignal {
    fn default() -> Self {
        ClockSignal {
            domain: "sync".to_string(),
        }
    }
}

impl fmt::Display for ClockSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(clk {})", self.domain)
    }
}

/// The reset signal of a clock domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetSignal {
    domain: String,
    allow_reset_less: bool,
}

impl ResetSignal {
    /// Refers to the reset of `domain`. The `comb` domain has no reset.
    pub fn new(domain: impl Into<String>) -> HdlResult<ResetSignal> {
        let domain = domain.into();
        check_domain(&domain, "reset")?;
        Ok(ResetSignal {
            domain,
            allow_reset_less: false,
        })
    }

    /// Permits referring to the reset of a domain that has none.
    pub fn allow_reset_less(mut self, allow: bool) -> ResetSignal {
        self.allow_reset_less = allow;
        self
    }

    /// Returns the domain name.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns `true` if a reset-less domain is acceptable.
    pub fn is_reset_less_allowed(&self) -> bool {
        self.allow_reset_less
    }
}

impl Default for ResetSignal {
    fn default() -> Self {
        ResetSignal {
            domain: "sync".to_string(),
            allow_reset_less: false,
        }
    }
}

impl fmt::Display for ResetSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(rst {})", self.domain)
    }
}

/// Asserted during the first cycle after initialization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Initial;

impl fmt::Display for Initial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(initial)")
    }
}
