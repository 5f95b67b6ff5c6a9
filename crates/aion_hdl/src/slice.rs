//! Static and dynamic bit selection.
//!
//! Integer indices and slice bounds follow the usual conventions for
//! sequences: negative positions count from the most significant end, and
//! stepped slices are clamped to the value before being materialized.

use crate::const_value::Const;
use crate::error::{HdlError, HdlResult};
use crate::ops::{Op, Operator};
use crate::shape::unsigned;
use crate::signal::Signal;
use crate::value::{Concat, Value};
use std::fmt;
use std::ops::{Bound, Range, RangeBounds, RangeFrom, RangeFull, RangeTo};

/// A static half-open range of bits.
#[derive(Clone, Debug)]
pub struct Slice {
    value: Box<Value>,
    start: usize,
    stop: usize,
}

impl Slice {
    /// Slices `value` from `start` to `stop`.
    ///
    /// Negative bounds count from the end. Bounds outside of the value, and a
    /// start past the stop, are rejected with [`HdlError::Index`].
    pub fn new(value: impl Into<Value>, start: i64, stop: i64) -> HdlResult<Slice> {
        let value = value.into();
        let n = value.width() as i64;
        if !(-n..=n).contains(&start) {
            return Err(HdlError::index_error(format!(
                "Cannot start slice {start} bits into {n}-bit value"
            )));
        }
        let start = if start < 0 { start + n } else { start };
        if !(-n..=n).contains(&stop) {
            return Err(HdlError::index_error(format!(
                "Cannot stop slice {stop} bits into {n}-bit value"
            )));
        }
        let stop = if stop < 0 { stop + n } else { stop };
        if start > stop {
            return Err(HdlError::index_error(format!(
                "Slice start {start} must be less than slice stop {stop}"
            )));
        }
        Ok(Slice::unchecked(value, start as usize, stop as usize))
    }

    pub(crate) fn unchecked(value: Value, start: usize, stop: usize) -> Slice {
        debug_assert!(start <= stop && stop <= value.width());
        Slice {
            value: Box::new(value),
            start,
            stop,
        }
    }

    /// Returns the sliced value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the first bit, inclusive.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Returns the last bit, exclusive.
    pub fn stop(&self) -> usize {
        self.stop
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(slice {} {}:{})", self.value, self.start, self.stop)
    }
}

/// A range of bits selected by a dynamic offset.
///
/// The selected bits start at `offset * stride` and span `width` bits.
#[derive(Clone, Debug)]
pub struct Part {
    value: Box<Value>,
    offset: Box<Value>,
    width: usize,
    stride: usize,
}

impl Part {
    /// Selects `width` bits of `value` at `offset * stride`.
    pub fn new(
        value: impl Into<Value>,
        offset: impl Into<Value>,
        width: i64,
        stride: i64,
    ) -> HdlResult<Part> {
        if width < 0 {
            return Err(HdlError::type_error(format!(
                "Part width must be a non-negative integer, not {width}"
            )));
        }
        if stride <= 0 {
            return Err(HdlError::type_error(format!(
                "Part stride must be a positive integer, not {stride}"
            )));
        }
        let offset = offset.into();
        if offset.shape().signed() {
            return Err(HdlError::type_error("Part offset must be unsigned"));
        }
        Ok(Part {
            value: Box::new(value.into()),
            offset: Box::new(offset),
            width: width as usize,
            stride: stride as usize,
        })
    }

    /// Returns the value bits are selected from.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the dynamic offset, counted in strides.
    pub fn offset(&self) -> &Value {
        &self.offset
    }

    /// Returns the number of selected bits.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of bits per offset step.
    pub fn stride(&self) -> usize {
        self.stride
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(part {} {} {} {})",
            self.value, self.offset, self.width, self.stride
        )
    }
}

/// The forms a value can be indexed with.
#[derive(Clone, Debug)]
pub enum Index {
    /// A single bit; negative positions count from the end.
    Bit(i64),
    /// A range of bits with an optional start, stop and a step.
    Range {
        /// First position, or the natural start for `step` when absent.
        start: Option<i64>,
        /// Position to stop before, or the natural end when absent.
        stop: Option<i64>,
        /// Distance between selected bits; never zero.
        step: i64,
    },
    /// A dynamic value, which cannot be used as an index.
    Value(Value),
}

impl Index {
    /// Builds a stepped range index.
    pub fn stepped(start: Option<i64>, stop: Option<i64>, step: i64) -> Index {
        Index::Range { start, stop, step }
    }
}

impl From<i32> for Index {
    fn from(bit: i32) -> Self {
        Index::Bit(bit.into())
    }
}

impl From<i64> for Index {
    fn from(bit: i64) -> Self {
        Index::Bit(bit)
    }
}

macro_rules! index_from_ranges {
    ($($int:ty),*) => {
        $(
            impl From<Range<$int>> for Index {
                fn from(range: Range<$int>) -> Self {
                    Index::stepped(Some(range.start.into()), Some(range.end.into()), 1)
                }
            }

            impl From<RangeFrom<$int>> for Index {
                fn from(range: RangeFrom<$int>) -> Self {
                    Index::stepped(Some(range.start.into()), None, 1)
                }
            }

            impl From<RangeTo<$int>> for Index {
                fn from(range: RangeTo<$int>) -> Self {
                    Index::stepped(None, Some(range.end.into()), 1)
                }
            }
        )*
    };
}

index_from_ranges!(i32, i64);

impl From<RangeFull> for Index {
    fn from(_: RangeFull) -> Self {
        Index::stepped(None, None, 1)
    }
}

impl From<Value> for Index {
    fn from(value: Value) -> Self {
        Index::Value(value)
    }
}

impl From<&Signal> for Index {
    fn from(signal: &Signal) -> Self {
        Index::Value(Value::Signal(signal.clone()))
    }
}

/// Resolves optional slice bounds against a sequence of `len` items, the way
/// `slice.indices()` does.
pub(crate) fn indices(
    start: Option<i64>,
    stop: Option<i64>,
    step: i64,
    len: i64,
) -> HdlResult<(i64, i64, i64)> {
    if step == 0 {
        return Err(HdlError::value_error("slice step cannot be zero"));
    }
    let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
    let clamp = |bound: i64| {
        if bound < 0 {
            (bound + len).max(lower)
        } else {
            bound.min(upper)
        }
    };
    let start = start.map_or(if step < 0 { upper } else { lower }, clamp);
    let stop = stop.map_or(if step < 0 { lower } else { upper }, clamp);
    Ok((start, stop, step))
}

/// Iterates over `range(start, stop, step)`.
pub(crate) fn stepped(start: i64, stop: i64, step: i64) -> impl Iterator<Item = i64> {
    let mut next = start;
    std::iter::from_fn(move || {
        let more = if step > 0 { next < stop } else { next > stop };
        more.then(|| {
            let current = next;
            next += step;
            current
        })
    })
}

pub(crate) fn bounds(range: &impl RangeBounds<i64>) -> (Option<i64>, Option<i64>) {
    let start = match range.start_bound() {
        Bound::Included(&s) => Some(s),
        Bound::Excluded(&s) => Some(s.checked_add(1).unwrap_or(i64::MAX)),
        Bound::Unbounded => None,
    };
    let stop = match range.end_bound() {
        Bound::Excluded(&e) => Some(e),
        Bound::Included(&-1) => None,
        Bound::Included(&e) => e.checked_add(1),
        Bound::Unbounded => None,
    };
    (start, stop)
}

fn as_offset(c: &Const) -> i64 {
    i64::try_from(c.value()).unwrap_or(if c.value().sign() == num_bigint::Sign::Minus {
        i64::MIN
    } else {
        i64::MAX
    })
}

impl Value {
    /// Selects one bit.
    pub fn bit(&self, index: i64) -> HdlResult<Value> {
        let n = self.width() as i64;
        if !(-n..n).contains(&index) {
            return Err(HdlError::index_error(format!(
                "Index {index} is out of bounds for a {n}-bit value"
            )));
        }
        let index = (if index < 0 { index + n } else { index }) as usize;
        Ok(Value::Slice(Slice::unchecked(self.clone(), index, index + 1)))
    }

    /// Selects a contiguous range of bits. Bounds are clamped to the value.
    pub fn slice(&self, range: impl RangeBounds<i64>) -> HdlResult<Value> {
        self.slice_step(range, 1)
    }

    /// Selects every `step`-th bit in `range`.
    ///
    /// A step other than 1 yields a concatenation of single-bit slices in
    /// iteration order, so a negative step reverses the bits.
    pub fn slice_step(&self, range: impl RangeBounds<i64>, step: i64) -> HdlResult<Value> {
        let (start, stop) = bounds(&range);
        self.index(Index::stepped(start, stop, step))
    }

    /// Indexes the value with a bit position or a range.
    pub fn index(&self, index: impl Into<Index>) -> HdlResult<Value> {
        match index.into() {
            Index::Bit(bit) => self.bit(bit),
            Index::Range { start, stop, step } => {
                let (start, stop, step) = indices(start, stop, step, self.width() as i64)?;
                if step == 1 {
                    return Ok(Value::Slice(Slice::new(self.clone(), start, stop)?));
                }
                let parts = stepped(start, stop, step)
                    .map(|i| Value::Slice(Slice::unchecked(self.clone(), i as usize, i as usize + 1)))
                    .collect();
                Ok(Value::Concat(Concat::new(parts)))
            }
            Index::Value(_) => Err(HdlError::type_error(
                "Cannot index value with a value; use Value.bit_select() instead",
            )),
        }
    }

    fn clamped(&self, start: Option<i64>, stop: Option<i64>) -> Value {
        let n = self.width() as i64;
        let clamp = |bound: i64| if bound < 0 { (bound + n).max(0) } else { bound.min(n) };
        let start = start.map_or(0, clamp);
        let stop = stop.map_or(n, clamp).max(start);
        Value::Slice(Slice::unchecked(self.clone(), start as usize, stop as usize))
    }

    /// Selects `width` bits starting at bit `offset`.
    ///
    /// A constant offset produces a [`Slice`]; any other offset produces a
    /// [`Part`] with stride 1.
    pub fn bit_select(&self, offset: impl Into<Value>, width: i64) -> HdlResult<Value> {
        if width < 0 {
            return Err(HdlError::type_error(format!(
                "Part width must be a non-negative integer, not {width}"
            )));
        }
        let offset = offset.into();
        if let Value::Const(c) = &offset {
            let start = as_offset(c);
            return Ok(self.clamped(Some(start), Some(start.saturating_add(width))));
        }
        Ok(Value::Part(Part::new(self.clone(), offset, width, 1)?))
    }

    /// Selects the `offset`-th word of `width` bits.
    ///
    /// A constant offset produces a [`Slice`]; any other offset produces a
    /// [`Part`] whose stride is `width`.
    pub fn word_select(&self, offset: impl Into<Value>, width: i64) -> HdlResult<Value> {
        if width <= 0 {
            return Err(HdlError::type_error(format!(
                "Word width must be a positive integer, not {width}"
            )));
        }
        let offset = offset.into();
        if let Value::Const(c) = &offset {
            let word = as_offset(c);
            let start = word.saturating_mul(width);
            return Ok(self.clamped(Some(start), Some(start.saturating_add(width))));
        }
        Ok(Value::Part(Part::new(self.clone(), offset, width, width)?))
    }

    /// Shifts left by a constant amount, widening the value.
    ///
    /// A negative amount shifts right instead. Signed values stay signed.
    pub fn shift_left(&self, amount: i64) -> Value {
        if amount < 0 {
            return self.shift_right(amount.checked_neg().unwrap_or(i64::MAX));
        }
        let zeroes = Const::with_shape(0.into(), unsigned(amount as usize));
        let shifted = Value::Concat(Concat::new(vec![Value::Const(zeroes), self.clone()]));
        if self.shape().signed() {
            Operator::unary(Op::AsSigned, shifted)
        } else {
            shifted
        }
    }

    /// Shifts right by a constant amount, narrowing the value.
    ///
    /// A negative amount shifts left instead. Signed values keep at least
    /// their sign bit.
    pub fn shift_right(&self, amount: i64) -> Value {
        if amount < 0 {
            return self.shift_left(amount.checked_neg().unwrap_or(i64::MAX));
        }
        if self.shape().signed() {
            let amount = amount.min(self.width() as i64 - 1);
            Operator::unary(Op::AsSigned, self.clamped(Some(amount), None))
        } else {
            self.clamped(Some(amount), None)
        }
    }

    /// Rotates left by a constant amount. Negative amounts rotate right.
    pub fn rotate_left(&self, amount: i64) -> Value {
        let amount = self.rotation(amount);
        Value::Concat(Concat::new(vec![
            self.clamped(Some(-amount), None),
            self.clamped(None, Some(-amount)),
        ]))
    }

    /// Rotates right by a constant amount. Negative amounts rotate left.
    pub fn rotate_right(&self, amount: i64) -> Value {
        let amount = self.rotation(amount);
        Value::Concat(Concat::new(vec![
            self.clamped(Some(amount), None),
            self.clamped(None, Some(amount)),
        ]))
    }

    fn rotation(&self, amount: i64) -> i64 {
        match self.width() as i64 {
            0 => amount,
            n => amount.rem_euclid(n),
        }
    }

    /// Concatenates `count` copies of the value.
    pub fn replicate(&self, count: i64) -> HdlResult<Value> {
        if count < 0 {
            return Err(HdlError::type_error(format!(
                "Replication count must be a non-negative integer, not {count}"
            )));
        }
        let parts = (0..count).map(|_| self.clone()).collect();
        Ok(Value::Concat(Concat::new(parts)))
    }
}
