//! Bit-vector shapes: a width paired with a signedness.
//!
//! A [`Shape`] describes how the bits of a value are interpreted. Shapes are
//! small `Copy` values compared and hashed structurally. This module also
//! holds [`IntRange`], the integer range a shape can be derived from, and the
//! [`bits_for`] / [`Shape::unify`] helpers every shape inference rule builds on.

use crate::error::{HdlError, HdlResult};
use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The width and signedness of a bit vector.
///
/// A signed shape is at least one bit wide; an unsigned shape may be zero bits
/// wide. The default shape is `unsigned(1)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Shape {
    width: usize,
    signed: bool,
}

impl Shape {
    /// Creates a shape from a width that may come from untrusted arithmetic.
    ///
    /// Negative widths and zero-width signed shapes are rejected with a
    /// [`HdlError::Type`].
    pub fn new(width: i64, signed: bool) -> HdlResult<Shape> {
        if signed && width <= 0 {
            return Err(HdlError::type_error(format!(
                "Width of a signed value must be a positive integer, not {width}"
            )));
        }
        if width < 0 {
            return Err(HdlError::type_error(format!(
                "Width of an unsigned value must be zero or a positive integer, not {width}"
            )));
        }
        Ok(Shape::raw(width as usize, signed))
    }

    pub(crate) const fn raw(width: usize, signed: bool) -> Shape {
        Shape { width, signed }
    }

    /// Returns the number of bits.
    pub fn width(self) -> usize {
        self.width
    }

    /// Returns `true` if the bits are interpreted as two's complement.
    pub fn signed(self) -> bool {
        self.signed
    }

    /// Returns the same width with the given signedness.
    pub(crate) fn with_signed(self, signed: bool) -> Shape {
        Shape::raw(self.width, signed)
    }

    /// Returns the narrowest shape that holds `value` exactly.
    ///
    /// Non-negative values get an unsigned shape at least one bit wide;
    /// negative values get a signed shape.
    pub fn of_int(value: &BigInt) -> Shape {
        Shape::raw(bits_for(value, false), value.sign() == Sign::Minus)
    }

    /// Returns the narrowest shape that holds every element of `range`.
    ///
    /// An empty range and the range containing only zero yield `unsigned(0)`.
    pub fn of_range(range: &IntRange) -> Shape {
        let (Some(first), Some(last)) = (range.first(), range.last()) else {
            return unsigned(0);
        };
        let signed = first < 0 || last < 0;
        let width = if first == 0 && last == 0 {
            0
        } else {
            bits_for(&BigInt::from(first), signed).max(bits_for(&BigInt::from(last), signed))
        };
        Shape::raw(width, signed)
    }

    /// Returns the narrowest shape that every shape in `shapes` converts into
    /// without loss.
    ///
    /// Unsigned members are given an extra bit when any member is signed, so
    /// that they remain non-negative after sign extension. An empty input
    /// yields `unsigned(0)`.
    pub fn unify(shapes: impl IntoIterator<Item = Shape>) -> Shape {
        let mut has_signed = false;
        let mut signed_width = 0;
        let mut unsigned_width = 0;
        for shape in shapes {
            if shape.signed {
                has_signed = true;
                signed_width = signed_width.max(shape.width);
            } else {
                unsigned_width = unsigned_width.max(shape.width);
            }
        }
        if has_signed {
            Shape::raw((unsigned_width + 1).max(signed_width), true)
        } else {
            Shape::raw(unsigned_width, false)
        }
    }

    /// Returns the smallest value representable in this shape.
    pub fn min_value(self) -> BigInt {
        if self.signed {
            -(BigInt::from(1) << (self.width - 1))
        } else {
            BigInt::from(0)
        }
    }

    /// Returns the largest value representable in this shape.
    pub fn max_value(self) -> BigInt {
        if self.signed {
            (BigInt::from(1) << (self.width - 1)) - 1
        } else {
            (BigInt::from(1) << self.width) - 1
        }
    }

    /// Returns `true` if `value` is representable in this shape without wrapping.
    pub fn contains(self, value: &BigInt) -> bool {
        *value >= self.min_value() && *value <= self.max_value()
    }
}

impl Default for Shape {
    fn default() -> Self {
        unsigned(1)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.signed {
            write!(f, "signed({})", self.width)
        } else {
            write!(f, "unsigned({})", self.width)
        }
    }
}

/// Shorthand for an unsigned shape of `width` bits.
pub fn unsigned(width: usize) -> Shape {
    Shape::raw(width, false)
}

/// Shorthand for a signed shape of `width` bits.
///
/// # Panics
///
/// Panics if `width` is zero; use [`Shape::new`] for widths that are not
/// known to be positive.
pub fn signed(width: usize) -> Shape {
    assert!(width > 0, "Width of a signed value must be a positive integer, not 0");
    Shape::raw(width, true)
}

/// Returns the number of bits needed to represent `value`.
///
/// Negative values and `require_sign_bit` both reserve a sign bit. Zero needs
/// one bit.
pub fn bits_for(value: &BigInt, require_sign_bit: bool) -> usize {
    let (bits, sign_bit) = if value.sign() == Sign::Plus {
        (value.bits() as usize, require_sign_bit)
    } else {
        let magnitude = -value;
        let bits = if magnitude.sign() == Sign::NoSign {
            0
        } else {
            (magnitude - 1u32).bits() as usize
        };
        (bits, true)
    };
    bits + usize::from(sign_bit)
}

/// A stepped half-open range of integers.
///
/// Iteration, length and membership follow the usual `start..stop` semantics
/// generalized to any non-zero step, including negative ones.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct IntRange {
    start: i64,
    stop: i64,
    step: i64,
}

impl IntRange {
    /// Creates the range `start..stop` with step 1.
    pub fn new(start: i64, stop: i64) -> IntRange {
        IntRange {
            start,
            stop,
            step: 1,
        }
    }

    /// Creates a range with an explicit step.
    ///
    /// A zero step is rejected with a [`HdlError::Value`].
    pub fn with_step(start: i64, stop: i64, step: i64) -> HdlResult<IntRange> {
        if step == 0 {
            return Err(HdlError::value_error("range() arg 3 must not be zero"));
        }
        Ok(IntRange { start, stop, step })
    }

    /// Returns the first bound.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Returns the non-inclusive end.
    pub fn stop(&self) -> i64 {
        self.stop
    }

    /// Returns the step.
    pub fn step(&self) -> i64 {
        self.step
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let len = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / (-step) + 1
        } else {
            0
        };
        len as usize
    }

    /// Returns `true` if the range has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the first element, if any.
    pub fn first(&self) -> Option<i64> {
        (!self.is_empty()).then_some(self.start)
    }

    /// Returns the last element, if any.
    pub fn last(&self) -> Option<i64> {
        let len = self.len();
        (len > 0).then(|| (self.start as i128 + (len as i128 - 1) * self.step as i128) as i64)
    }

    /// Returns `true` if `value` is an element of the range.
    pub fn contains(&self, value: &BigInt) -> bool {
        let (Some(first), Some(last)) = (self.first(), self.last()) else {
            return false;
        };
        let (low, high) = if self.step > 0 { (first, last) } else { (last, first) };
        let Ok(value) = i64::try_from(value) else {
            return false;
        };
        value >= low && value <= high && (value as i128 - self.start as i128) % self.step as i128 == 0
    }

    /// Iterates over the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.len()).map(move |i| (self.start as i128 + i as i128 * self.step as i128) as i64)
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.step == 1 {
            write!(f, "range({}, {})", self.start, self.stop)
        } else {
            write!(f, "range({}, {}, {})", self.start, self.stop, self.step)
        }
    }
}

/// Shorthand for [`IntRange::new`].
pub fn range(start: i64, stop: i64) -> IntRange {
    IntRange::new(start, stop)
}
