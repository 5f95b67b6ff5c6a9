//! Compile-time constants.

use crate::cast::{ShapeLike, ValueLike};
use crate::error::{HdlError, HdlResult};
use crate::shape::Shape;
use crate::value::Value;
use crate::warnings::{self, W301};
use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A constant bit vector.
///
/// The payload is normalized into the two's-complement range of the shape at
/// construction, so two constants compare equal exactly when their shapes and
/// bit patterns agree. Unlike other values, constants hash structurally.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Const {
    value: BigInt,
    shape: Shape,
}

impl Const {
    /// Creates a constant in the narrowest shape that holds `value`.
    pub fn of(value: impl Into<BigInt>) -> Const {
        let value = value.into();
        let shape = Shape::of_int(&value);
        Const { value, shape }
    }

    /// Creates a constant of `shape`, wrapping `value` into its range.
    pub fn with_shape(value: BigInt, shape: Shape) -> Const {
        let value = normalize(value, shape);
        Const { value, shape }
    }

    /// Creates a constant from any shape-like object.
    ///
    /// A bare width produces a signed shape when `value` is negative. A range
    /// whose non-inclusive end equals `value` raises warning `W301`.
    #[track_caller]
    pub fn new(value: impl Into<BigInt>, shape: impl Into<ShapeLike>) -> HdlResult<Const> {
        let value = value.into();
        let shape = match shape.into() {
            ShapeLike::Int(width) => Shape::new(width, value.sign() == Sign::Minus)?,
            ShapeLike::Range(range) => {
                if BigInt::from(range.stop()) == value {
                    warnings::emit(
                        W301,
                        format!(
                            "Value {value} equals the non-inclusive end of the constant shape \
                             {range}; this is likely an off-by-one error"
                        ),
                    )?;
                }
                Shape::of_range(&range)
            }
            other => Shape::cast(other)?,
        };
        Ok(Const::with_shape(value, shape))
    }

    /// Folds a constant-castable expression into a constant.
    ///
    /// Constants, and concatenations and slices built only from constants,
    /// are constant-castable. The result of folding a concatenation or a slice
    /// is unsigned.
    pub fn cast(obj: impl Into<ValueLike>) -> HdlResult<Const> {
        let value = Value::cast(obj)?;
        fold(&value).ok_or_else(|| {
            HdlError::type_error(format!(
                "Value {value} cannot be converted to an Amaranth constant"
            ))
        })
    }

    /// Returns the normalized integer payload.
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    /// Returns the shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Returns the width in bits.
    pub fn width(&self) -> usize {
        self.shape.width()
    }

    /// Returns the payload reinterpreted as an unsigned bit pattern.
    pub fn bits(&self) -> BigInt {
        normalize(self.value.clone(), self.shape.with_signed(false))
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.shape.signed() { "s" } else { "" };
        write!(f, "(const {}'{}d{})", self.shape.width(), sign, self.value)
    }
}

fn normalize(value: BigInt, shape: Shape) -> BigInt {
    let width = shape.width();
    if width == 0 {
        return BigInt::from(0);
    }
    let modulus = BigInt::from(1) << width;
    let wrapped = ((value % &modulus) + &modulus) % &modulus;
    if shape.signed() && wrapped >= (&modulus >> 1usize) {
        wrapped - modulus
    } else {
        wrapped
    }
}

fn fold(value: &Value) -> Option<Const> {
    match value {
        Value::Const(c) => Some(c.clone()),
        Value::Concat(concat) => {
            let mut folded = BigInt::from(0);
            let mut width = 0;
            for part in concat.parts() {
                let c = fold(part)?;
                folded |= c.bits() << width;
                width += c.width();
            }
            Some(Const::with_shape(folded, Shape::raw(width, false)))
        }
        Value::Slice(slice) => {
            let c = fold(slice.value())?;
            let bits = c.bits() >> slice.start();
            Some(Const::with_shape(
                bits,
                Shape::raw(slice.stop() - slice.start(), false),
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::shape::{range, signed, unsigned};
    use crate::value::cat;
    use aion_diagnostics::DiagnosticFilter;

    #[test]
    fn natural_shapes() {
        assert_eq!(Const::of(0).shape(), unsigned(1));
        assert_eq!(Const::of(1).shape(), unsigned(1));
        assert_eq!(Const::of(10).shape(), unsigned(4));
        assert_eq!(Const::of(-10).shape(), signed(5));
    }

    #[test]
    fn explicit_shapes() {
        assert_eq!(Const::new(1, 4).unwrap().shape(), unsigned(4));
        assert_eq!(Const::new(-1, 4).unwrap().shape(), signed(4));
        assert_eq!(Const::new(1, signed(4)).unwrap().shape(), signed(4));
        assert_eq!(Const::new(0, unsigned(0)).unwrap().shape(), unsigned(0));
        assert_eq!(
            Const::new(1, -1).unwrap_err().to_string(),
            "Width of an unsigned value must be zero or a positive integer, not -1"
        );
    }

    #[test]
    fn normalization() {
        assert_eq!(*Const::new(0b10110, signed(5)).unwrap().value(), BigInt::from(-10));
        assert_eq!(*Const::new(0b10000, signed(4)).unwrap().value(), BigInt::from(0));
        assert_eq!(*Const::new(-16, 4).unwrap().value(), BigInt::from(0));
        assert_eq!(*Const::new(-1, unsigned(2)).unwrap().value(), BigInt::from(3));
    }

    #[test]
    fn repr() {
        assert_eq!(Const::of(10).to_string(), "(const 4'd10)");
        assert_eq!(Const::of(-10).to_string(), "(const 5'sd-10)");
        assert_eq!(Const::new(0, 0).unwrap().to_string(), "(const 0'd0)");
    }

    #[test]
    fn fencepost_warning() {
        let (result, diags) = warnings::collect(|| Const::new(10, range(0, 10)));
        assert_eq!(result.unwrap().shape(), unsigned(4));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, W301);
        assert_eq!(
            diags[0].message,
            "Value 10 equals the non-inclusive end of the constant shape range(0, 10); this is \
             likely an off-by-one error"
        );
    }

    #[test]
    fn fencepost_warning_denied() {
        let filter = DiagnosticFilter::new().deny(W301);
        let (result, _) = warnings::capture(filter, || Const::new(10, range(0, 10)));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Denied);
    }

    #[test]
    fn fold_slice() {
        let c = Const::new(0x1234, 16).unwrap();
        let a = Const::cast(Value::from(c).slice(4..12).unwrap()).unwrap();
        assert_eq!(*a.value(), BigInt::from(0x23));
        assert_eq!(a.shape(), unsigned(8));
        let c = Const::new(-4, signed(8)).unwrap();
        let a = Const::cast(Value::from(c).slice(1..6).unwrap()).unwrap();
        assert_eq!(*a.value(), BigInt::from(0x1e));
        assert_eq!(a.shape(), unsigned(5));
    }

    #[test]
    fn fold_concat() {
        let parts = [
            Const::new(1, 1).unwrap(),
            Const::new(0, 1).unwrap(),
            Const::new(3, 2).unwrap(),
            Const::new(2, 2).unwrap(),
        ];
        let a = Const::cast(cat(parts).unwrap()).unwrap();
        assert_eq!(*a.value(), BigInt::from(0x2d));
        assert_eq!(a.shape(), unsigned(6));
        let a = Const::cast(cat([Const::new(-4, 8).unwrap(), Const::new(-3, 8).unwrap()]).unwrap())
            .unwrap();
        assert_eq!(*a.value(), BigInt::from(0xfdfc));
        assert_eq!(a.shape(), unsigned(16));
    }

    #[test]
    fn hash_is_structural() {
        use std::collections::HashSet;
        let set: HashSet<Const> = [Const::of(3), Const::new(3, 2).unwrap(), Const::new(3, 4).unwrap()]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn serde_roundtrip() {
        let c = Const::new(-10, signed(8)).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: Const = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
