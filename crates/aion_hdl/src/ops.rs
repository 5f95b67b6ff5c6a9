//! Operators and their shape inference.
//!
//! Arithmetic and bitwise operators are available through `std::ops` on
//! [`Value`], `&Value`, [`Signal`] and `&Signal`, with any value-convertible
//! right-hand side and with integers on the left. Shifts by a value return
//! `HdlResult<Value>` because a signed shift amount is rejected. Comparisons
//! and reductions are inherent methods, since `==` and friends are reserved for
//! Rust's own equality.

use crate::error::{HdlError, HdlResult};
use crate::shape::{unsigned, Shape};
use crate::signal::Signal;
use crate::slice::Slice;
use crate::switch::mux;
use crate::value::Value;
use std::fmt;
use std::ops;

/// An operator kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// Bitwise inversion, `~`.
    Invert,
    /// Arithmetic negation, unary `-`.
    Neg,
    /// Reduction to a single bit that is set if any bit is set.
    Bool,
    /// OR reduction.
    Any,
    /// AND reduction.
    All,
    /// XOR reduction.
    XorReduce,
    /// Reinterpretation as unsigned.
    AsUnsigned,
    /// Reinterpretation as signed.
    AsSigned,
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division rounding toward negative infinity.
    FloorDiv,
    /// Remainder matching [`Op::FloorDiv`].
    Mod,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Left shift by a value.
    Shl,
    /// Right shift by a value.
    Shr,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl Op {
    /// Returns the token used in the canonical representation.
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Invert => "~",
            Op::Neg | Op::Sub => "-",
            Op::Bool => "b",
            Op::Any => "r|",
            Op::All => "r&",
            Op::XorReduce => "r^",
            Op::AsUnsigned => "u",
            Op::AsSigned => "s",
            Op::Add => "+",
            Op::Mul => "*",
            Op::FloorDiv => "//",
            Op::Mod => "%",
            Op::And => "&",
            Op::Or => "|",
            Op::Xor => "^",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }

    /// Returns the number of operands.
    pub fn arity(self) -> usize {
        match self {
            Op::Invert
            | Op::Neg
            | Op::Bool
            | Op::Any
            | Op::All
            | Op::XorReduce
            | Op::AsUnsigned
            | Op::AsSigned => 1,
            _ => 2,
        }
    }
}

/// An operator applied to its operands.
#[derive(Clone, Debug)]
pub struct Operator {
    op: Op,
    operands: Vec<Value>,
}

impl Operator {
    pub(crate) fn unary(op: Op, operand: Value) -> Value {
        debug_assert_eq!(op.arity(), 1);
        Value::Operator(Operator {
            op,
            operands: vec![operand],
        })
    }

    pub(crate) fn binary(op: Op, lhs: Value, rhs: Value) -> Value {
        debug_assert_eq!(op.arity(), 2);
        Value::Operator(Operator {
            op,
            operands: vec![lhs, rhs],
        })
    }

    /// Returns the operator kind.
    pub fn op(&self) -> Op {
        self.op
    }

    /// Returns the operands in order.
    pub fn operands(&self) -> &[Value] {
        &self.operands
    }

    /// Infers the result shape from the operand shapes.
    pub fn shape(&self) -> Shape {
        let a = self.operands[0].shape();
        if let [_] = self.operands.as_slice() {
            return match self.op {
                Op::Invert => a,
                Op::Neg => Shape::raw(a.width() + 1, true),
                Op::AsUnsigned => a.with_signed(false),
                Op::AsSigned => a.with_signed(true),
                _ => unsigned(1),
            };
        }
        let b = self.operands[1].shape();
        match self.op {
            Op::Add => {
                let o = Shape::unify([a, b]);
                Shape::raw(o.width() + 1, o.signed())
            }
            Op::Sub => Shape::raw(Shape::unify([a, b]).width() + 1, true),
            Op::Mul => Shape::raw(a.width() + b.width(), a.signed() || b.signed()),
            Op::FloorDiv => Shape::raw(
                a.width() + usize::from(b.signed()),
                a.signed() || b.signed(),
            ),
            Op::Mod => b,
            Op::And | Op::Or | Op::Xor => Shape::unify([a, b]),
            Op::Shl => {
                let extra = u32::try_from(b.width())
                    .ok()
                    .and_then(|w| 1usize.checked_shl(w))
                    .map_or(usize::MAX, |p| p - 1);
                Shape::raw(a.width().saturating_add(extra), a.signed())
            }
            Op::Shr => a,
            _ => unsigned(1),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.op.symbol())?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        f.write_str(")")
    }
}

fn shift(op: Op, lhs: Value, amount: Value) -> HdlResult<Value> {
    if amount.shape().signed() {
        return Err(HdlError::type_error("Shift amount must be unsigned"));
    }
    Ok(Operator::binary(op, lhs, amount))
}

impl Value {
    /// Builds `self == rhs`.
    pub fn eq(&self, rhs: impl Into<Value>) -> Value {
        Operator::binary(Op::Eq, self.clone(), rhs.into())
    }

    /// Builds `self != rhs`.
    pub fn ne(&self, rhs: impl Into<Value>) -> Value {
        Operator::binary(Op::Ne, self.clone(), rhs.into())
    }

    /// Builds `self < rhs`.
    pub fn lt(&self, rhs: impl Into<Value>) -> Value {
        Operator::binary(Op::Lt, self.clone(), rhs.into())
    }

    /// Builds `self <= rhs`.
    pub fn le(&self, rhs: impl Into<Value>) -> Value {
        Operator::binary(Op::Le, self.clone(), rhs.into())
    }

    /// Builds `self > rhs`.
    pub fn gt(&self, rhs: impl Into<Value>) -> Value {
        Operator::binary(Op::Gt, self.clone(), rhs.into())
    }

    /// Builds `self >= rhs`.
    pub fn ge(&self, rhs: impl Into<Value>) -> Value {
        Operator::binary(Op::Ge, self.clone(), rhs.into())
    }

    /// Builds a one-bit value that is set if any bit of `self` is set.
    pub fn bool(&self) -> Value {
        Operator::unary(Op::Bool, self.clone())
    }

    /// OR-reduces all bits.
    pub fn any(&self) -> Value {
        Operator::unary(Op::Any, self.clone())
    }

    /// AND-reduces all bits.
    pub fn all(&self) -> Value {
        Operator::unary(Op::All, self.clone())
    }

    /// XOR-reduces all bits.
    pub fn xor(&self) -> Value {
        Operator::unary(Op::XorReduce, self.clone())
    }

    /// Reinterprets the bits as unsigned.
    pub fn as_unsigned(&self) -> Value {
        Operator::unary(Op::AsUnsigned, self.clone())
    }

    /// Reinterprets the bits as signed. Zero-width values have no sign bit.
    pub fn as_signed(&self) -> HdlResult<Value> {
        if self.width() == 0 {
            return Err(HdlError::value_error("Cannot create a 0-width signed value"));
        }
        Ok(Operator::unary(Op::AsSigned, self.clone()))
    }

    /// Builds the absolute value, which is always unsigned and as wide as
    /// `self`.
    pub fn abs(&self) -> Value {
        if !self.shape().signed() {
            return self.clone();
        }
        let width = self.width();
        let negated = -self;
        Value::Slice(Slice::unchecked(mux(self.ge(0), self.clone(), negated), 0, width))
    }
}

macro_rules! binary_ops {
    ($($trait:ident :: $method:ident => $op:expr),* $(,)?) => {
        $(
            impl<T: Into<Value>> ops::$trait<T> for Value {
                type Output = Value;

                fn $method(self, rhs: T) -> Value {
                    Operator::binary($op, self, rhs.into())
                }
            }

            impl<T: Into<Value>> ops::$trait<T> for &Value {
                type Output = Value;

                fn $method(self, rhs: T) -> Value {
                    Operator::binary($op, self.clone(), rhs.into())
                }
            }

            impl<T: Into<Value>> ops::$trait<T> for Signal {
                type Output = Value;

                fn $method(self, rhs: T) -> Value {
                    Operator::binary($op, Value::Signal(self), rhs.into())
                }
            }

            impl<T: Into<Value>> ops::$trait<T> for &Signal {
                type Output = Value;

                fn $method(self, rhs: T) -> Value {
                    Operator::binary($op, Value::Signal(self.clone()), rhs.into())
                }
            }

            binary_ops!(@reflected $trait :: $method => $op; i32, i64, u32, u64);
        )*
    };
    (@reflected $trait:ident :: $method:ident => $op:expr; $($int:ty),*) => {
        $(
            impl ops::$trait<Value> for $int {
                type Output = Value;

                fn $method(self, rhs: Value) -> Value {
                    Operator::binary($op, Value::from(self), rhs)
                }
            }

            impl ops::$trait<&Value> for $int {
                type Output = Value;

                fn $method(self, rhs: &Value) -> Value {
                    Operator::binary($op, Value::from(self), rhs.clone())
                }
            }
        )*
    };
}

binary_ops! {
    Add::add => Op::Add,
    Sub::sub => Op::Sub,
    Mul::mul => Op::Mul,
    Div::div => Op::FloorDiv,
    Rem::rem => Op::Mod,
    BitAnd::bitand => Op::And,
    BitOr::bitor => Op::Or,
    BitXor::bitxor => Op::Xor,
}

macro_rules! shift_ops {
    ($($trait:ident :: $method:ident => $op:expr),* $(,)?) => {
        $(
            impl<T: Into<Value>> ops::$trait<T> for Value {
                type Output = HdlResult<Value>;

                fn $method(self, rhs: T) -> HdlResult<Value> {
                    shift($op, self, rhs.into())
                }
            }

            impl<T: Into<Value>> ops::$trait<T> for &Value {
                type Output = HdlResult<Value>;

                fn $method(self, rhs: T) -> HdlResult<Value> {
                    shift($op, self.clone(), rhs.into())
                }
            }

            impl ops::$trait<Value> for i32 {
                type Output = HdlResult<Value>;

                fn $method(self, rhs: Value) -> HdlResult<Value> {
                    shift($op, Value::from(self), rhs)
                }
            }
        )*
    };
}

shift_ops! {
    Shl::shl => Op::Shl,
    Shr::shr => Op::Shr,
}

impl ops::Not for Value {
    type Output = Value;

    fn not(self) -> Value {
        Operator::unary(Op::Invert, self)
    }
}

impl ops::Not for &Value {
    type Output = Value;

    fn not(self) -> Value {
        Operator::unary(Op::Invert, self.clone())
    }
}

impl ops::Neg for Value {
    type Output = Value;

    fn neg(self) -> Value {
        Operator::unary(Op::Neg, self)
    }
}

impl ops::Neg for &Value {
    type Output = Value;

    fn neg(self) -> Value {
        Operator::unary(Op::Neg, self.clone())
    }
}
