//! IO values: ports connected to the outside of a design, and the slices and
//! concatenations built from them.
//!
//! IO values are not [`Value`]s; they can only be connected, never computed
//! with. Every bit of a port may carry an opaque metadata string, which
//! follows the bit through slicing and concatenation.

use crate::cast::ValueLike;
use crate::error::{HdlError, HdlResult};
use crate::slice::{bounds, indices, stepped, Index};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeBounds;
use std::sync::Arc;

#[derive(Debug)]
struct IoPortData {
    width: usize,
    name: String,
    attrs: BTreeMap<String, String>,
    metadata: Vec<Option<String>>,
}

/// A port of the design. Clones refer to the same port.
#[derive(Clone, Debug)]
pub struct IoPort(Arc<IoPortData>);

impl IoPort {
    /// Starts building a port `width` bits wide.
    pub fn new(width: usize) -> IoPortBuilder {
        IoPortBuilder {
            width,
            name: "$port".to_owned(),
            attrs: BTreeMap::new(),
            metadata: None,
        }
    }

    /// Returns the port name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the width in bits.
    pub fn width(&self) -> usize {
        self.0.width
    }

    /// Returns the backend attributes.
    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.0.attrs
    }

    /// Returns the metadata of every bit.
    pub fn metadata(&self) -> &[Option<String>] {
        &self.0.metadata
    }
}

impl PartialEq for IoPort {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for IoPort {}

impl fmt::Display for IoPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(io-port {})", self.0.name)
    }
}

/// Builder for [`IoPort`].
#[derive(Debug)]
pub struct IoPortBuilder {
    width: usize,
    name: String,
    attrs: BTreeMap<String, String>,
    metadata: Option<Vec<Option<String>>>,
}

impl IoPortBuilder {
    /// Sets the port name.
    pub fn name(mut self, name: impl Into<String>) -> IoPortBuilder {
        self.name = name.into();
        self
    }

    /// Adds a backend attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> IoPortBuilder {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Sets per-bit metadata; there must be exactly one entry per bit.
    pub fn metadata<M: Into<String>>(mut self, metadata: impl IntoIterator<Item = M>) -> IoPortBuilder {
        self.metadata = Some(metadata.into_iter().map(|m| Some(m.into())).collect());
        self
    }

    /// Creates the port.
    pub fn build(self) -> HdlResult<IoPort> {
        let metadata = match self.metadata {
            Some(metadata) if metadata.len() != self.width => {
                return Err(HdlError::value_error(format!(
                    "Metadata length ({}) doesn't match port width ({})",
                    metadata.len(),
                    self.width
                )))
            }
            Some(metadata) => metadata,
            None => vec![None; self.width],
        };
        Ok(IoPort(Arc::new(IoPortData {
            width: self.width,
            name: self.name,
            attrs: self.attrs,
            metadata,
        })))
    }
}

/// A static range of bits of an IO value.
#[derive(Clone, Debug)]
pub struct IoSlice {
    value: Box<IoValue>,
    start: usize,
    stop: usize,
}

impl IoSlice {
    /// Slices `value` from `start` to `stop`; negative bounds count from the end.
    pub fn new(value: impl Into<IoValue>, start: i64, stop: i64) -> HdlResult<IoSlice> {
        let value = value.into();
        let n = value.width() as i64;
        if !(-n..=n).contains(&start) {
            return Err(HdlError::index_error(format!(
                "Cannot start slice {start} bits into {n}-bit IO value"
            )));
        }
        let start = if start < 0 { start + n } else { start };
        if !(-n..=n).contains(&stop) {
            return Err(HdlError::index_error(format!(
                "Cannot stop slice {stop} bits into {n}-bit IO value"
            )));
        }
        let stop = if stop < 0 { stop + n } else { stop };
        if start > stop {
            return Err(HdlError::index_error(format!(
                "Slice start {start} must be less than slice stop {stop}"
            )));
        }
        Ok(IoSlice {
            value: Box::new(value),
            start: start as usize,
            stop: stop as usize,
        })
    }

    /// Returns the sliced value.
    pub fn value(&self) -> &IoValue {
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

impl fmt::Display for IoSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(io-slice {} {}:{})", self.value, self.start, self.stop)
    }
}

/// Concatenation of IO values, least significant part first.
#[derive(Clone, Debug, Default)]
pub struct IoConcat {
    parts: Vec<IoValue>,
}

impl IoConcat {
    /// Returns the parts.
    pub fn parts(&self) -> &[IoValue] {
        &self.parts
    }
}

impl fmt::Display for IoConcat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(io-cat ")?;
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str(")")
    }
}

/// Any IO value.
#[derive(Clone, Debug)]
pub enum IoValue {
    /// A port.
    Port(IoPort),
    /// A static slice.
    Slice(IoSlice),
    /// A concatenation.
    Concat(IoConcat),
}

/// Something that may be cast to an [`IoValue`].
#[derive(Clone, Debug)]
pub enum IoLike {
    /// An IO value.
    Io(IoValue),
    /// An ordinary value, castable only if it has no bits.
    Value(ValueLike),
}

impl IoValue {
    /// Casts `obj` to an IO value.
    ///
    /// A zero-width value is accepted as an empty concatenation.
    pub fn cast(obj: impl Into<IoLike>) -> HdlResult<IoValue> {
        match obj.into() {
            IoLike::Io(value) => Ok(value),
            IoLike::Value(value) => match Value::cast(value.clone()) {
                Ok(v) if v.width() == 0 => Ok(IoValue::Concat(IoConcat::default())),
                _ => Err(HdlError::type_error(format!(
                    "Object {value} cannot be converted to an IO value"
                ))),
            },
        }
    }

    /// Returns the width in bits.
    pub fn width(&self) -> usize {
        match self {
            IoValue::Port(p) => p.width(),
            IoValue::Slice(s) => s.stop - s.start,
            IoValue::Concat(c) => c.parts.iter().map(IoValue::width).sum(),
        }
    }

    /// Returns the metadata of every bit, least significant first.
    pub fn metadata(&self) -> Vec<Option<String>> {
        match self {
            IoValue::Port(p) => p.metadata().to_vec(),
            IoValue::Slice(s) => s.value.metadata()[s.start..s.stop].to_vec(),
            IoValue::Concat(c) => c.parts.iter().flat_map(IoValue::metadata).collect(),
        }
    }

    /// Indexes the value with a bit position or a range.
    pub fn index(&self, index: impl Into<Index>) -> HdlResult<IoValue> {
        let n = self.width() as i64;
        match index.into() {
            Index::Bit(bit) => {
                if !(-n..n).contains(&bit) {
                    return Err(HdlError::index_error(format!(
                        "Index {bit} is out of bounds for a {n}-bit IO value"
                    )));
                }
                let bit = if bit < 0 { bit + n } else { bit };
                Ok(IoValue::Slice(IoSlice::new(self.clone(), bit, bit + 1)?))
            }
            Index::Range { start, stop, step } => {
                let (start, stop, step) = indices(start, stop, step, n)?;
                if step == 1 {
                    return Ok(IoValue::Slice(IoSlice::new(self.clone(), start, stop)?));
                }
                let parts = stepped(start, stop, step)
                    .map(|i| IoSlice::new(self.clone(), i, i + 1).map(IoValue::Slice))
                    .collect::<HdlResult<Vec<_>>>()?;
                Ok(IoValue::Concat(IoConcat { parts }))
            }
            Index::Value(_) => Err(HdlError::type_error("Cannot index IO value with a value")),
        }
    }

    /// Selects a contiguous range of bits. Bounds are clamped to the value.
    pub fn slice(&self, range: impl RangeBounds<i64>) -> HdlResult<IoValue> {
        self.slice_step(range, 1)
    }

    /// Selects every `step`-th bit in `range`.
    pub fn slice_step(&self, range: impl RangeBounds<i64>, step: i64) -> HdlResult<IoValue> {
        let (start, stop) = bounds(&range);
        self.index(Index::stepped(start, stop, step))
    }
}

impl fmt::Display for IoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoValue::Port(p) => write!(f, "{p}"),
            IoValue::Slice(s) => write!(f, "{s}"),
            IoValue::Concat(c) => write!(f, "{c}"),
        }
    }
}

/// Concatenates IO values, least significant first.
pub fn io_cat<I>(parts: I) -> HdlResult<IoValue>
where
    I: IntoIterator,
    I::Item: Into<IoLike>,
{
    let parts = parts
        .into_iter()
        .map(IoValue::cast)
        .collect::<HdlResult<Vec<_>>>()?;
    Ok(IoValue::Concat(IoConcat { parts }))
}

impl From<IoPort> for IoValue {
    fn from(port: IoPort) -> Self {
        IoValue::Port(port)
    }
}

impl From<&IoPort> for IoValue {
    fn from(port: &IoPort) -> Self {
        IoValue::Port(port.clone())
    }
}

impl From<IoSlice> for IoValue {
    fn from(slice: IoSlice) -> Self {
        IoValue::Slice(slice)
    }
}

impl From<IoConcat> for IoValue {
    fn from(concat: IoConcat) -> Self {
        IoValue::Concat(concat)
    }
}

macro_rules! io_like_from_io {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for IoLike {
                fn from(value: $ty) -> Self {
                    IoLike::Io(value.into())
                }
            }
        )*
    };
}

io_like_from_io!(IoValue, IoPort, &IoPort, IoSlice, IoConcat);

impl From<ValueLike> for IoLike {
    fn from(value: ValueLike) -> Self {
        IoLike::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::signal::Signal;
    use crate::value::Concat;

    fn meta(value: &IoValue) -> Vec<String> {
        value.metadata().into_iter().map(|m| m.unwrap_or_default()).collect()
    }

    fn port8() -> IoPort {
        IoPort::new(8)
            .name("a")
            .metadata(["a", "b", "c", "d", "e", "f", "g", "h"])
            .build()
            .unwrap()
    }

    #[test]
    fn ioport() {
        let a = IoPort::new(4).name("a").build().unwrap();
        assert_eq!(a.width(), 4);
        assert!(a.attrs().is_empty());
        assert_eq!(a.metadata(), [None, None, None, None]);
        assert_eq!(a.to_string(), "(io-port a)");
        let b = IoPort::new(3)
            .name("b")
            .attr("a", "b")
            .metadata(["x", "y", "z"])
            .build()
            .unwrap();
        assert_eq!(b.width(), 3);
        assert_eq!(b.attrs().get("a").map(String::as_str), Some("b"));
        assert_eq!(meta(&b.clone().into()), ["x", "y", "z"]);
        assert_eq!(b.to_string(), "(io-port b)");
        assert_eq!(IoPort::new(1).build().unwrap().name(), "$port");
    }

    #[test]
    fn ioport_wrong() {
        let err = IoPort::new(2).metadata(["a", "b", "c"]).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        assert_eq!(err.to_string(), "Metadata length (3) doesn't match port width (2)");
    }

    #[test]
    fn ioslice_extreme_bounds_clamp() {
        let a = IoValue::from(port8());
        let s = a.slice(3..=i64::MAX).unwrap();
        assert_eq!(s.to_string(), "(io-slice (io-port a) 3:8)");
        assert_eq!(a.slice_step(0..=i64::MAX, 4).unwrap().width(), 2);
    }

    #[test]
    fn ioslice() {
        let a = IoValue::from(port8());
        let s = a.slice(2..5).unwrap();
        assert_eq!(s.width(), 3);
        assert_eq!(meta(&s), ["c", "d", "e"]);
        assert_eq!(s.to_string(), "(io-slice (io-port a) 2:5)");
        let s = a.slice(-5..-2).unwrap();
        assert_eq!(meta(&s), ["d", "e", "f"]);
        assert_eq!(s.to_string(), "(io-slice (io-port a) 3:6)");
        let s = IoValue::from(IoSlice::new(a.clone(), -5, -2).unwrap());
        assert_eq!(meta(&s), ["d", "e", "f"]);
        assert_eq!(s.to_string(), "(io-slice (io-port a) 3:6)");
        let s = a.index(5).unwrap();
        assert_eq!(meta(&s), ["f"]);
        assert_eq!(s.to_string(), "(io-slice (io-port a) 5:6)");
        let s = a.index(-1).unwrap();
        assert_eq!(meta(&s), ["h"]);
        assert_eq!(s.to_string(), "(io-slice (io-port a) 7:8)");
        let s = a.slice_step(.., 2).unwrap();
        assert_eq!(s.width(), 4);
        assert_eq!(meta(&s), ["a", "c", "e", "g"]);
        assert_eq!(
            s.to_string(),
            "(io-cat (io-slice (io-port a) 0:1) (io-slice (io-port a) 2:3) \
             (io-slice (io-port a) 4:5) (io-slice (io-port a) 6:7))"
        );
    }

    #[test]
    fn ioslice_wrong() {
        let a = IoValue::from(IoPort::new(8).name("a").build().unwrap());
        assert_eq!(
            a.index(8).unwrap_err().to_string(),
            "Index 8 is out of bounds for a 8-bit IO value"
        );
        assert_eq!(a.index(-9).unwrap_err().kind(), ErrorKind::Index);
        assert_eq!(IoSlice::new(a.clone(), 0, 9).unwrap_err().kind(), ErrorKind::Index);
        assert_eq!(IoSlice::new(a.clone(), -10, 8).unwrap_err().kind(), ErrorKind::Index);
        assert_eq!(
            a.slice(5..3).unwrap_err().to_string(),
            "Slice start 5 must be less than slice stop 3"
        );
        let s = Signal::new(1).build().unwrap();
        assert_eq!(a.index(&s).unwrap_err().kind(), ErrorKind::Type);
    }

    #[test]
    fn iocat() {
        let a = IoPort::new(3).name("a").metadata(["a", "b", "c"]).build().unwrap();
        let b = IoPort::new(2).name("b").metadata(["x", "y"]).build().unwrap();
        let c = io_cat([&a, &b]).unwrap();
        assert_eq!(c.width(), 5);
        assert_eq!(meta(&c), ["a", "b", "c", "x", "y"]);
        assert_eq!(c.to_string(), "(io-cat (io-port a) (io-port b))");
        let empty = io_cat(Vec::<IoValue>::new()).unwrap();
        let c = io_cat([IoValue::from(&a), empty.clone()]).unwrap();
        assert_eq!(c.width(), 3);
        assert_eq!(meta(&c), ["a", "b", "c"]);
        assert_eq!(c.to_string(), "(io-cat (io-port a) (io-cat ))");
        let c = io_cat([IoValue::from(&a), empty.slice(..).unwrap()]).unwrap();
        assert_eq!(c.width(), 3);
    }

    #[test]
    fn iocat_accepts_zero_width_values() {
        let a = IoPort::new(3).name("a").build().unwrap();
        let empty = Value::Concat(Concat::new(vec![]));
        let zero_width = empty.slice(..).unwrap();
        let c = io_cat([IoLike::from(&a), IoLike::from(ValueLike::from(zero_width))]).unwrap();
        assert_eq!(c.to_string(), "(io-cat (io-port a) (io-cat ))");
    }

    #[test]
    fn iocat_wrong() {
        let a = IoPort::new(3).name("a").build().unwrap();
        let b = Signal::new(1).name("b").build().unwrap();
        let err = io_cat([IoLike::from(&a), IoLike::from(ValueLike::from(&b))]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.to_string(), "Object (sig b) cannot be converted to an IO value");
    }
}
