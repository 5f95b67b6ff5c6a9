//! Arrays of values indexable by a dynamic value.
//!
//! An [`Array`] is an ordinary mutable list until the first time it is
//! indexed with a value that is not a constant. From then on it is frozen:
//! the multiplexer that indexing produces describes the elements as they
//! were, so further mutation would silently change nothing in hardware.

use crate::cast::{ShapeLike, ValueCastable, ValueLike};
use crate::const_value::Const;
use crate::error::{HdlError, HdlResult};
use crate::repr::to_binary;
use crate::shape::Shape;
use crate::signal::Signal;
use crate::slice::Index;
use crate::switch::SwitchValue;
use crate::value::Value;
use num_bigint::BigInt;
use parking_lot::RwLock;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// A named tuple of elements, accessible by field name or position.
#[derive(Clone, Debug)]
pub struct Record {
    name: String,
    fields: Vec<(String, Element)>,
}

impl Record {
    /// Creates a record type instance named `name`.
    pub fn new<N, E>(name: impl Into<String>, fields: impl IntoIterator<Item = (N, E)>) -> Record
    where
        N: Into<String>,
        E: Into<Element>,
    {
        Record {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(n, e)| (n.into(), e.into()))
                .collect(),
        }
    }

    /// Returns the field called `name`.
    pub fn field(&self, name: &str) -> Option<&Element> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Returns the field at `index`.
    pub fn get(&self, index: usize) -> Option<&Element> {
        self.fields.get(index).map(|(_, e)| e)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (name, element)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={element}")?;
        }
        f.write_str(")")
    }
}

/// An element of an [`Array`].
#[derive(Clone, Debug)]
pub enum Element {
    /// An integer.
    Int(BigInt),
    /// A value.
    Value(Value),
    /// A nested array.
    Array(Array),
    /// A record whose fields can be reached through a proxy.
    Record(Record),
    /// A proxy produced by indexing a nested array with a value.
    Proxy(ArrayProxy),
}

impl Element {
    /// Casts the element to a value.
    pub fn to_value(&self) -> HdlResult<Value> {
        match self {
            Element::Int(v) => Ok(Value::Const(Const::of(v.clone()))),
            Element::Value(v) => Ok(v.clone()),
            Element::Proxy(p) => p.as_value(),
            Element::Array(_) | Element::Record(_) => Err(HdlError::type_error(format!(
                "Object {self} cannot be converted to an Amaranth value"
            ))),
        }
    }

    #[track_caller]
    fn item(&self, index: &ValueLike) -> HdlResult<Element> {
        match (self, index) {
            (Element::Array(array), ValueLike::Int(i)) => {
                let i = position(i, array.len())?;
                array.get(i).ok_or_else(|| out_of_range(i))
            }
            (Element::Array(array), index) => Ok(Element::Proxy(array.select(index.clone())?)),
            (Element::Proxy(proxy), index) => Ok(Element::Proxy(proxy.item(index.clone())?)),
            (Element::Record(record), ValueLike::Int(i)) => {
                let i = position(i, record.fields.len())?;
                record.get(i).cloned().ok_or_else(|| out_of_range(i))
            }
            (element, ValueLike::Int(i)) => {
                let i = i64::try_from(i).map_err(|_| out_of_range(i))?;
                Ok(Element::Value(element.to_value()?.index(i)?))
            }
            (element, index) => {
                let index = Value::cast(index.clone())?;
                Ok(Element::Value(element.to_value()?.index(Index::Value(index))?))
            }
        }
    }

    fn field(&self, name: &str) -> HdlResult<Element> {
        match self {
            Element::Record(record) => record.field(name).cloned().ok_or_else(|| {
                HdlError::type_error(format!("{record} has no field '{name}'"))
            }),
            Element::Proxy(proxy) => Ok(Element::Proxy(proxy.field(name)?)),
            other => Err(HdlError::type_error(format!(
                "{other} has no field '{name}'"
            ))),
        }
    }
}

fn position(index: &BigInt, len: usize) -> HdlResult<usize> {
    let signed = i64::try_from(index).map_err(|_| out_of_range(index))?;
    let len = len as i64;
    let resolved = if signed < 0 { signed + len } else { signed };
    if !(0..len).contains(&resolved) {
        return Err(out_of_range(index));
    }
    Ok(resolved as usize)
}

fn out_of_range(index: impl fmt::Display) -> HdlError {
    HdlError::index_error(format!("Array index {index} is out of range"))
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Int(v) => write!(f, "{v}"),
            Element::Value(v) => write!(f, "{v}"),
            Element::Array(a) => write!(f, "{a}"),
            Element::Record(r) => write!(f, "{r}"),
            Element::Proxy(p) => write!(f, "{p}"),
        }
    }
}

macro_rules! element_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Element {
                fn from(value: $ty) -> Self {
                    Element::Int(BigInt::from(value))
                }
            }
        )*
    };
}

element_from_int!(i32, i64, u32, u64, usize, BigInt);

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Element::Value(value)
    }
}

impl From<Const> for Element {
    fn from(value: Const) -> Self {
        Element::Value(Value::Const(value))
    }
}

impl From<Signal> for Element {
    fn from(signal: Signal) -> Self {
        Element::Value(Value::Signal(signal))
    }
}

impl From<&Signal> for Element {
    fn from(signal: &Signal) -> Self {
        Element::Value(Value::Signal(signal.clone()))
    }
}

impl From<Array> for Element {
    fn from(array: Array) -> Self {
        Element::Array(array)
    }
}

impl From<Record> for Element {
    fn from(record: Record) -> Self {
        Element::Record(record)
    }
}

impl From<ArrayProxy> for Element {
    fn from(proxy: ArrayProxy) -> Self {
        Element::Proxy(proxy)
    }
}

#[derive(Debug)]
struct ArrayState {
    elements: Vec<Element>,
    frozen_at: Option<&'static Location<'static>>,
}

/// A list of elements that can be indexed with a value.
///
/// Clones share the same storage, so freezing one freezes them all.
#[derive(Clone, Debug)]
pub struct Array {
    state: Arc<RwLock<ArrayState>>,
}

impl Array {
    /// Creates a mutable array.
    pub fn new<E: Into<Element>>(elements: impl IntoIterator<Item = E>) -> Array {
        Array {
            state: Arc::new(RwLock::new(ArrayState {
                elements: elements.into_iter().map(Into::into).collect(),
                frozen_at: None,
            })),
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.state.read().elements.len()
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the element at `index`.
    pub fn get(&self, index: usize) -> Option<Element> {
        self.state.read().elements.get(index).cloned()
    }

    /// Returns a copy of every element.
    pub fn to_vec(&self) -> Vec<Element> {
        self.state.read().elements.clone()
    }

    /// Returns `true` once the array has been indexed with a non-constant value.
    pub fn is_frozen(&self) -> bool {
        self.state.read().frozen_at.is_some()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Element>) -> R) -> HdlResult<R> {
        let mut state = self.state.write();
        if let Some(location) = state.frozen_at {
            return Err(HdlError::value_error(format!(
                "Array can no longer be mutated after it was indexed with a value at {}:{}",
                location.file(),
                location.line()
            )));
        }
        Ok(f(&mut state.elements))
    }

    /// Replaces the element at `index`.
    pub fn set(&self, index: usize, element: impl Into<Element>) -> HdlResult<()> {
        let element = element.into();
        self.mutate(|elements| match elements.get_mut(index) {
            Some(slot) => {
                *slot = element;
                Ok(())
            }
            None => Err(out_of_range(index)),
        })?
    }

    /// Removes and returns the element at `index`.
    pub fn remove(&self, index: usize) -> HdlResult<Element> {
        self.mutate(|elements| {
            if index < elements.len() {
                Ok(elements.remove(index))
            } else {
                Err(out_of_range(index))
            }
        })?
    }

    /// Inserts an element before `index`, or at the end if `index` is past it.
    pub fn insert(&self, index: usize, element: impl Into<Element>) -> HdlResult<()> {
        let element = element.into();
        self.mutate(|elements| {
            let index = index.min(elements.len());
            elements.insert(index, element);
        })
    }

    /// Appends an element.
    pub fn push(&self, element: impl Into<Element>) -> HdlResult<()> {
        let element = element.into();
        self.mutate(|elements| elements.push(element))
    }

    /// Indexes the array with a value, producing a proxy for the selected element.
    ///
    /// Indexing with anything other than a constant freezes the array and
    /// remembers the caller's location for later mutation errors.
    #[track_caller]
    pub fn select(&self, index: impl Into<ValueLike>) -> HdlResult<ArrayProxy> {
        let index = Value::cast(index)?;
        if Const::cast(index.clone()).is_err() {
            let mut state = self.state.write();
            if state.frozen_at.is_none() {
                let location = Location::caller();
                tracing::debug!(
                    file = location.file(),
                    line = location.line(),
                    "array indexed with a value; freezing"
                );
                state.frozen_at = Some(location);
            }
        }
        Ok(ArrayProxy {
            array: self.clone(),
            index,
        })
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.write_str(if state.frozen_at.is_some() {
            "(array ["
        } else {
            "(array mutable ["
        })?;
        for (i, element) in state.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        f.write_str("])")
    }
}

/// The element of an [`Array`] selected by a value.
///
/// Item and field access on a proxy map through every element, producing
/// another proxy over the results with the same index.
#[derive(Clone, Debug)]
pub struct ArrayProxy {
    array: Array,
    index: Value,
}

impl ArrayProxy {
    /// Returns the array the proxy selects from.
    pub fn array(&self) -> &Array {
        &self.array
    }

    /// Returns the index value.
    pub fn index(&self) -> &Value {
        &self.index
    }

    fn derive(&self, elements: Vec<Element>) -> ArrayProxy {
        let array = Array::new(elements);
        array.state.write().frozen_at = self.array.state.read().frozen_at;
        ArrayProxy {
            array,
            index: self.index.clone(),
        }
    }

    /// Indexes every element with `index`.
    #[track_caller]
    pub fn item(&self, index: impl Into<ValueLike>) -> HdlResult<ArrayProxy> {
        let index = index.into();
        let elements = self.array.to_vec();
        let mut mapped = Vec::with_capacity(elements.len());
        for element in &elements {
            mapped.push(element.item(&index)?);
        }
        Ok(self.derive(mapped))
    }

    /// Selects the field `name` of every element.
    pub fn field(&self, name: &str) -> HdlResult<ArrayProxy> {
        let mapped = self
            .array
            .to_vec()
            .iter()
            .map(|element| element.field(name))
            .collect::<HdlResult<Vec<_>>>()?;
        Ok(self.derive(mapped))
    }

    /// Returns the shape that holds every element.
    pub fn shape(&self) -> HdlResult<Shape> {
        let shapes = self
            .array
            .to_vec()
            .iter()
            .map(|element| Ok(element.to_value()?.shape()))
            .collect::<HdlResult<Vec<_>>>()?;
        Ok(Shape::unify(shapes))
    }

    /// Builds the multiplexer that selects among the elements.
    ///
    /// Elements past the range of the index are unreachable and omitted.
    pub fn as_value(&self) -> HdlResult<Value> {
        let width = self.index.width();
        let limit = u32::try_from(width)
            .ok()
            .and_then(|w| 1usize.checked_shl(w))
            .unwrap_or(usize::MAX);
        let cases = self
            .array
            .to_vec()
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, element)| {
                let key = to_binary(&BigInt::from(i), width);
                Ok((Some(vec![key]), element.to_value()?))
            })
            .collect::<HdlResult<Vec<_>>>()?;
        Ok(Value::SwitchValue(SwitchValue::from_keys(
            self.index.clone(),
            cases,
        )))
    }
}

impl ValueCastable for ArrayProxy {
    fn shape(&self) -> HdlResult<ShapeLike> {
        Ok(ShapeLike::Shape(ArrayProxy::shape(self)?))
    }

    fn as_value(&self) -> HdlResult<ValueLike> {
        Ok(ValueLike::Value(ArrayProxy::as_value(self)?))
    }
}

impl From<ArrayProxy> for ValueLike {
    fn from(proxy: ArrayProxy) -> Self {
        ValueLike::Castable(Arc::new(proxy))
    }
}

impl fmt::Display for ArrayProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(proxy {} {})", self.array, self.index)
    }
}
