//! The casting protocol: turning domain objects into shapes and values.
//!
//! [`ShapeLike`] and [`ValueLike`] enumerate everything the algebra accepts
//! where a shape or a value is expected. User types take part through the
//! [`ShapeCastable`] and [`ValueCastable`] traits. Resolution of castable
//! objects is iterative and tracks the objects already visited, so a chain
//! that loops back on itself fails with [`HdlError::Recursion`] instead of
//! overflowing the stack.

use crate::enums::{EnumMember, EnumType};
use crate::error::{HdlError, HdlResult};
use crate::format::{Format, FormatLike};
use crate::repr;
use crate::shape::{IntRange, Shape};
use crate::value::{Const, Signal, Value};
use num_bigint::BigInt;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A user type that describes a shape.
///
/// Only [`as_shape`](ShapeCastable::as_shape) is required. The other methods
/// have defaults suitable for a shape with no custom value representation.
pub trait ShapeCastable: fmt::Debug + Send + Sync {
    /// Returns the shape-like object this type resolves to.
    fn as_shape(&self) -> ShapeLike;

    /// Converts a signal initializer into a constant-castable value.
    ///
    /// The default treats a missing initializer as zero and passes any other
    /// initializer through.
    fn const_value(&self, init: Option<&ValueLike>) -> HdlResult<ValueLike> {
        Ok(init.cloned().unwrap_or_else(|| ValueLike::Int(BigInt::from(0))))
    }

    /// Wraps a raw value of this shape into the type's value representation.
    fn call(&self, value: Value) -> HdlResult<ValueLike> {
        Ok(ValueLike::Value(value))
    }

    /// Decodes a bit pattern into the type's constant representation.
    fn from_bits(&self, bits: BigInt) -> HdlResult<ValueLike> {
        Ok(ValueLike::Int(bits))
    }

    /// Produces the formatter used to print a value of this shape with `spec`.
    fn format(&self, value: ValueLike, spec: &str) -> HdlResult<FormatLike> {
        let format = Format::new(&format!("{{:{spec}}}"), vec![Value::cast(value)?.into()])?;
        Ok(FormatLike::Format(format))
    }
}

/// A user type that stands for a value.
pub trait ValueCastable: fmt::Debug + Send + Sync {
    /// Returns the shape of the value, possibly a [`ShapeCastable`].
    fn shape(&self) -> HdlResult<ShapeLike>;

    /// Returns the value-like object this type resolves to.
    fn as_value(&self) -> HdlResult<ValueLike>;
}

fn identity<T: ?Sized>(obj: &Arc<T>) -> usize {
    Arc::as_ptr(obj) as *const () as usize
}

/// Anything that can be cast to a [`Shape`].
#[derive(Clone, Debug)]
pub enum ShapeLike {
    /// A shape, cast to itself.
    Shape(Shape),
    /// A width, cast to an unsigned shape.
    Int(i64),
    /// A range, cast to the narrowest shape holding every element.
    Range(IntRange),
    /// An enumeration, cast to its declared or narrowest member shape.
    Enum(Arc<EnumType>),
    /// A user shape.
    Castable(Arc<dyn ShapeCastable>),
    /// An object with no shape interpretation, carried by its textual form.
    Other(String),
}

impl ShapeLike {
    /// Returns `true` if casting this object to a shape can succeed.
    ///
    /// Negative widths, enumerations with non-constant members and foreign
    /// objects are not shape-like.
    pub fn is_shape_like(&self) -> bool {
        match self {
            ShapeLike::Shape(_) | ShapeLike::Range(_) | ShapeLike::Castable(_) => true,
            ShapeLike::Int(width) => *width >= 0,
            ShapeLike::Enum(ty) => ty.is_castable(),
            ShapeLike::Other(_) => false,
        }
    }
}

impl fmt::Display for ShapeLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeLike::Shape(s) => write!(f, "{s}"),
            ShapeLike::Int(w) => write!(f, "{w}"),
            ShapeLike::Range(r) => write!(f, "{r}"),
            ShapeLike::Enum(e) => write!(f, "{e}"),
            ShapeLike::Castable(c) => write!(f, "{c:?}"),
            ShapeLike::Other(s) => f.write_str(s),
        }
    }
}

impl From<Shape> for ShapeLike {
    fn from(shape: Shape) -> Self {
        ShapeLike::Shape(shape)
    }
}

impl From<i32> for ShapeLike {
    fn from(width: i32) -> Self {
        ShapeLike::Int(width.into())
    }
}

impl From<i64> for ShapeLike {
    fn from(width: i64) -> Self {
        ShapeLike::Int(width)
    }
}

impl From<usize> for ShapeLike {
    fn from(width: usize) -> Self {
        ShapeLike::Int(width as i64)
    }
}

impl From<IntRange> for ShapeLike {
    fn from(range: IntRange) -> Self {
        ShapeLike::Range(range)
    }
}

impl From<Arc<EnumType>> for ShapeLike {
    fn from(ty: Arc<EnumType>) -> Self {
        ShapeLike::Enum(ty)
    }
}

impl From<&Arc<EnumType>> for ShapeLike {
    fn from(ty: &Arc<EnumType>) -> Self {
        ShapeLike::Enum(Arc::clone(ty))
    }
}

impl From<Arc<dyn ShapeCastable>> for ShapeLike {
    fn from(castable: Arc<dyn ShapeCastable>) -> Self {
        ShapeLike::Castable(castable)
    }
}

impl Shape {
    /// Casts a shape-like object to a [`Shape`].
    ///
    /// Shape-castable objects are resolved repeatedly until a plain shape-like
    /// object is reached; revisiting an object fails with
    /// [`HdlError::Recursion`].
    pub fn cast(obj: impl Into<ShapeLike>) -> HdlResult<Shape> {
        let mut obj = obj.into();
        let mut seen = HashSet::new();
        loop {
            match obj {
                ShapeLike::Shape(shape) => return Ok(shape),
                ShapeLike::Int(width) => return Shape::new(width, false),
                ShapeLike::Range(range) => return Ok(Shape::of_range(&range)),
                ShapeLike::Enum(ty) => return ty.shape(),
                ShapeLike::Other(text) => {
                    return Err(HdlError::type_error(format!(
                        "Object {text} cannot be converted to an Amaranth shape"
                    )))
                }
                ShapeLike::Castable(castable) => {
                    if !seen.insert(identity(&castable)) {
                        return Err(HdlError::recursion_error(format!(
                            "Shape-castable object {castable:?} casts to itself"
                        )));
                    }
                    tracing::trace!(object = ?castable, "resolving shape-castable object");
                    obj = castable.as_shape();
                }
            }
        }
    }
}

/// Anything that can be cast to a [`Value`].
#[derive(Clone, Debug)]
pub enum ValueLike {
    /// An integer, cast to a constant of its narrowest shape.
    Int(BigInt),
    /// A boolean, cast to a one-bit constant.
    Bool(bool),
    /// A string, which is never castable but is accepted by some consumers.
    Str(String),
    /// A value, cast to itself.
    Value(Value),
    /// An enumeration member, cast to a constant in its enumeration's shape.
    Member(EnumMember),
    /// A user value.
    Castable(Arc<dyn ValueCastable>),
}

impl ValueLike {
    /// Returns `true` if casting this object to a value can succeed.
    pub fn is_value_like(&self) -> bool {
        match self {
            ValueLike::Int(_) | ValueLike::Bool(_) | ValueLike::Value(_) | ValueLike::Castable(_) => {
                true
            }
            ValueLike::Member(m) => m.enum_type().is_castable(),
            ValueLike::Str(_) => false,
        }
    }
}

impl fmt::Display for ValueLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueLike::Int(v) => write!(f, "{v}"),
            ValueLike::Bool(true) => f.write_str("True"),
            ValueLike::Bool(false) => f.write_str("False"),
            ValueLike::Str(s) => f.write_str(&repr::quote(s)),
            ValueLike::Value(v) => write!(f, "{v}"),
            ValueLike::Member(m) => write!(f, "{m}"),
            ValueLike::Castable(c) => write!(f, "{c:?}"),
        }
    }
}

macro_rules! value_like_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ValueLike {
                fn from(value: $ty) -> Self {
                    ValueLike::Int(BigInt::from(value))
                }
            }
        )*
    };
}

value_like_from_int!(i32, i64, u32, u64, usize);

impl From<BigInt> for ValueLike {
    fn from(value: BigInt) -> Self {
        ValueLike::Int(value)
    }
}

impl From<bool> for ValueLike {
    fn from(value: bool) -> Self {
        ValueLike::Bool(value)
    }
}

impl From<&str> for ValueLike {
    fn from(value: &str) -> Self {
        ValueLike::Str(value.to_string())
    }
}

impl From<String> for ValueLike {
    fn from(value: String) -> Self {
        ValueLike::Str(value)
    }
}

impl From<Value> for ValueLike {
    fn from(value: Value) -> Self {
        ValueLike::Value(value)
    }
}

impl From<&Value> for ValueLike {
    fn from(value: &Value) -> Self {
        ValueLike::Value(value.clone())
    }
}

impl From<Const> for ValueLike {
    fn from(value: Const) -> Self {
        ValueLike::Value(Value::Const(value))
    }
}

impl From<Signal> for ValueLike {
    fn from(value: Signal) -> Self {
        ValueLike::Value(Value::Signal(value))
    }
}

impl From<&Signal> for ValueLike {
    fn from(value: &Signal) -> Self {
        ValueLike::Value(Value::Signal(value.clone()))
    }
}

impl From<EnumMember> for ValueLike {
    fn from(member: EnumMember) -> Self {
        ValueLike::Member(member)
    }
}

impl From<Arc<dyn ValueCastable>> for ValueLike {
    fn from(castable: Arc<dyn ValueCastable>) -> Self {
        ValueLike::Castable(castable)
    }
}

impl Value {
    /// Casts a value-like object to a [`Value`].
    ///
    /// Integers and booleans become constants of their narrowest shape,
    /// enumeration members become constants of their enumeration's shape, and
    /// value-castable objects are resolved repeatedly; revisiting an object
    /// fails with [`HdlError::Recursion`].
    pub fn cast(obj: impl Into<ValueLike>) -> HdlResult<Value> {
        let mut obj = obj.into();
        let mut seen = HashSet::new();
        loop {
            match obj {
                ValueLike::Value(value) => return Ok(value),
                ValueLike::Int(v) => return Ok(Value::Const(Const::of(v))),
                ValueLike::Bool(b) => return Ok(Value::Const(Const::of(u8::from(b)))),
                ValueLike::Member(member) => return Ok(Value::Const(member.to_const()?)),
                ValueLike::Str(_) => {
                    return Err(HdlError::type_error(format!(
                        "Object {obj} cannot be converted to an Amaranth value"
                    )))
                }
                ValueLike::Castable(castable) => {
                    if !seen.insert(identity(&castable)) {
                        return Err(HdlError::recursion_error(format!(
                            "Value-castable object {castable:?} casts to itself"
                        )));
                    }
                    tracing::trace!(object = ?castable, "resolving value-castable object");
                    obj = castable.as_value()?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::shape::{range, signed, unsigned};
    use parking_lot::Mutex;

    #[derive(Debug)]
    struct MockShape {
        dest: Mutex<Option<ShapeLike>>,
    }

    impl MockShape {
        fn new(dest: impl Into<ShapeLike>) -> Arc<MockShape> {
            Arc::new(MockShape {
                dest: Mutex::new(Some(dest.into())),
            })
        }
    }

    impl ShapeCastable for MockShape {
        fn as_shape(&self) -> ShapeLike {
            self.dest
                .lock()
                .clone()
                .unwrap_or_else(|| ShapeLike::Other("None".to_string()))
        }
    }

    #[derive(Debug)]
    struct MockValue {
        dest: Mutex<Option<ValueLike>>,
    }

    impl ValueCastable for MockValue {
        fn shape(&self) -> HdlResult<ShapeLike> {
            let dest = self.as_value()?;
            Ok(Value::cast(dest)?.shape().into())
        }

        fn as_value(&self) -> HdlResult<ValueLike> {
            Ok(self.dest.lock().clone().unwrap_or(ValueLike::Int(0.into())))
        }
    }

    #[test]
    fn cast_shape_and_int() {
        assert_eq!(Shape::cast(unsigned(1)).unwrap(), unsigned(1));
        assert_eq!(Shape::cast(signed(2)).unwrap(), signed(2));
        assert_eq!(Shape::cast(0).unwrap(), unsigned(0));
        assert_eq!(Shape::cast(2).unwrap(), unsigned(2));
        assert_eq!(
            Shape::cast(-1).unwrap_err().to_string(),
            "Width of an unsigned value must be zero or a positive integer, not -1"
        );
    }

    #[test]
    fn cast_range() {
        assert_eq!(Shape::cast(range(0, 8)).unwrap(), unsigned(3));
        assert_eq!(Shape::cast(range(-1, 0)).unwrap(), signed(1));
    }

    #[test]
    fn cast_other() {
        let err = Shape::cast(ShapeLike::Other("'foo'".to_string())).unwrap_err();
        assert_eq!(err.to_string(), "Object 'foo' cannot be converted to an Amaranth shape");
    }

    #[test]
    fn shape_castable_chain() {
        let sc = MockShape::new(ShapeLike::Castable(MockShape::new(unsigned(1))));
        assert_eq!(Shape::cast(ShapeLike::Castable(sc)).unwrap(), unsigned(1));
    }

    #[test]
    fn shape_castable_self_loop() {
        let sc = MockShape::new(unsigned(1));
        *sc.dest.lock() = Some(ShapeLike::Castable(sc.clone()));
        let err = Shape::cast(ShapeLike::Castable(sc.clone())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Recursion);
        assert!(err.to_string().starts_with("Shape-castable object MockShape"));
        assert!(err.to_string().ends_with("casts to itself"));
        // Break the cycle so the Arc is freed.
        *sc.dest.lock() = None;
    }

    #[test]
    fn shape_like_predicate() {
        assert!(ShapeLike::from(unsigned(2)).is_shape_like());
        assert!(ShapeLike::from(2).is_shape_like());
        assert!(ShapeLike::from(0).is_shape_like());
        assert!(!ShapeLike::from(-1).is_shape_like());
        assert!(ShapeLike::from(range(0, 10)).is_shape_like());
        assert!(!ShapeLike::Other("'abc'".into()).is_shape_like());
        let castable: Arc<dyn ShapeCastable> = MockShape::new(unsigned(2));
        assert!(ShapeLike::from(castable).is_shape_like());
        let a = EnumType::new("EnumA", [("A", 1), ("B", 2)]);
        let b = EnumType::new("EnumB", [("A", "a"), ("B", "b")]);
        assert!(ShapeLike::from(a).is_shape_like());
        assert!(!ShapeLike::from(b).is_shape_like());
    }

    #[test]
    fn value_cast_basics() {
        assert!(matches!(Value::cast(0).unwrap(), Value::Const(_)));
        assert!(matches!(Value::cast(true).unwrap(), Value::Const(_)));
        assert_eq!(
            Value::cast("str").unwrap_err().to_string(),
            "Object 'str' cannot be converted to an Amaranth value"
        );
    }

    #[test]
    fn value_cast_enum_member() {
        let e = EnumType::new("SignedEnum", [("FOO", -1), ("BAR", 0), ("BAZ", 1)]);
        let v = Value::cast(e.member("FOO").unwrap()).unwrap();
        assert_eq!(v.shape(), signed(2));
        let s = EnumType::new("StringEnum", [("FOO", "a")]);
        assert_eq!(
            Value::cast(s.member("FOO").unwrap()).unwrap_err().kind(),
            ErrorKind::Type
        );
    }

    #[test]
    fn value_castable_chain_and_loop() {
        let inner: Arc<dyn ValueCastable> = Arc::new(MockValue {
            dest: Mutex::new(Some(ValueLike::Int(5.into()))),
        });
        let outer = Arc::new(MockValue {
            dest: Mutex::new(Some(ValueLike::Castable(inner))),
        });
        assert_eq!(Value::cast(ValueLike::Castable(outer.clone())).unwrap().to_string(), "(const 3'd5)");

        *outer.dest.lock() = Some(ValueLike::Castable(outer.clone()));
        let err = Value::cast(ValueLike::Castable(outer.clone())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Recursion);
        assert!(err.to_string().starts_with("Value-castable object MockValue"));
        *outer.dest.lock() = None;
    }

    #[test]
    fn value_like_predicate() {
        assert!(ValueLike::from(2).is_value_like());
        assert!(ValueLike::from(-2).is_value_like());
        assert!(!ValueLike::from("abc").is_value_like());
        let a = EnumType::new("EnumA", [("A", 1), ("B", 2)]);
        let d = EnumType::new(
            "EnumD",
            [("A", MemberValue::from(1)), ("B", MemberValue::from("a"))],
        );
        assert!(ValueLike::from(a.member("A").unwrap()).is_value_like());
        assert!(!ValueLike::from(d.member("A").unwrap()).is_value_like());
    }

    use crate::enums::MemberValue;
}
