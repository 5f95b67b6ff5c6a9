//! Signals: identity-unique named storage cells.
//!
//! A [`Signal`] is created through [`SignalBuilder`], which validates the
//! initial value against the shape once. After that the signal is immutable
//! and cheap to clone; clones refer to the same cell. Equality and hashing go
//! by identity, so two signals built from identical parameters are distinct.

use crate::cast::{ShapeLike, ValueLike};
use crate::const_value::Const;
use crate::enums::EnumType;
use crate::error::{ErrorKind, HdlError, HdlResult};
use crate::format::{Format, FormatEnum, FormatLike};
use crate::shape::Shape;
use crate::value::Value;
use crate::warnings::{self, W302, W303};
use num_bigint::BigInt;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Turns a signal value into human-readable text.
#[derive(Clone)]
pub enum Decoder {
    /// Names values after the members of an enumeration.
    Enum(Arc<EnumType>),
    /// An arbitrary function.
    Fn(Arc<dyn Fn(&BigInt) -> String + Send + Sync>),
}

impl Decoder {
    /// Wraps a decoding function.
    pub fn from_fn(f: impl Fn(&BigInt) -> String + Send + Sync + 'static) -> Decoder {
        Decoder::Fn(Arc::new(f))
    }

    /// Decodes `value`.
    ///
    /// Enumeration decoders render `NAME/value`, or just the value if no
    /// member has it.
    pub fn decode(&self, value: &BigInt) -> String {
        match self {
            Decoder::Enum(ty) => ty
                .const_members()
                .ok()
                .and_then(|members| {
                    members
                        .into_iter()
                        .find(|(_, c)| c.value() == value)
                        .map(|(name, c)| format!("{name}/{}", c.value()))
                })
                .unwrap_or_else(|| value.to_string()),
            Decoder::Fn(f) => f(value),
        }
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoder::Enum(ty) => f.debug_tuple("Enum").field(&ty.name()).finish(),
            Decoder::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

struct SignalData {
    name: String,
    shape: Shape,
    orig_shape: ShapeLike,
    init: BigInt,
    reset_less: bool,
    attrs: BTreeMap<String, String>,
    decoder: Option<Decoder>,
}

/// A named storage cell.
#[derive(Clone)]
pub struct Signal(Arc<SignalData>);

impl Signal {
    /// Starts building a signal of `shape`.
    pub fn new(shape: impl Into<ShapeLike>) -> SignalBuilder {
        SignalBuilder::new(shape.into())
    }

    /// Starts building a signal shaped like `other`.
    ///
    /// When `other` is a signal, its initial value, reset-less flag,
    /// attributes and decoder are copied as well. The name defaults to
    /// `$like`.
    pub fn like(other: impl Into<ValueLike>) -> HdlResult<SignalBuilder> {
        let builder = match other.into() {
            ValueLike::Castable(castable) => SignalBuilder::new(castable.shape()?),
            ValueLike::Value(Value::Signal(signal)) => {
                let data = &signal.0;
                SignalBuilder {
                    init: Some(ValueLike::Int(data.init.clone())),
                    reset_less: data.reset_less,
                    attrs: data.attrs.clone(),
                    decoder: data.decoder.clone(),
                    like_name: Some(data.name.clone()),
                    ..SignalBuilder::new(ShapeLike::Shape(data.shape))
                }
            }
            other => SignalBuilder::new(ShapeLike::Shape(Value::cast(other)?.shape())),
        };
        Ok(SignalBuilder {
            name: "$like".to_string(),
            ..builder
        })
    }

    /// Returns the name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the resolved shape.
    pub fn shape(&self) -> Shape {
        self.0.shape
    }

    /// Returns the shape-like object the signal was declared with.
    pub fn orig_shape(&self) -> &ShapeLike {
        &self.0.orig_shape
    }

    /// Returns the initial value, normalized into the shape.
    pub fn init(&self) -> &BigInt {
        &self.0.init
    }

    /// Returns `true` if the signal keeps its value across domain resets.
    pub fn is_reset_less(&self) -> bool {
        self.0.reset_less
    }

    /// Returns the attributes.
    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.0.attrs
    }

    /// Returns the decoder, if any.
    pub fn decoder(&self) -> Option<&Decoder> {
        self.0.decoder.as_ref()
    }

    /// Renders `value` through the decoder, or in decimal without one.
    pub fn decode(&self, value: &BigInt) -> String {
        match &self.0.decoder {
            Some(decoder) => decoder.decode(value),
            None => value.to_string(),
        }
    }

    /// Returns the formatter used to print this signal.
    ///
    /// An enumeration decoder or enumeration shape prints member names; a
    /// shape-castable shape prints through its own `format` override; any
    /// other signal prints as a plain number.
    pub fn format(&self) -> HdlResult<FormatLike> {
        let enum_ty = match (&self.0.decoder, &self.0.orig_shape) {
            (Some(Decoder::Enum(ty)), _) => Some(ty),
            (_, ShapeLike::Enum(ty)) => Some(ty),
            _ => None,
        };
        if let Some(ty) = enum_ty {
            let format = FormatEnum::from_enum(self.clone(), ty, Some(ty.name()))?;
            return Ok(FormatLike::Enum(format));
        }
        if let ShapeLike::Castable(castable) = &self.0.orig_shape {
            let value = castable.call(Value::Signal(self.clone()))?;
            return castable.format(value, "");
        }
        Ok(FormatLike::Format(Format::new(
            "{}",
            vec![Value::Signal(self.clone()).into()],
        )?))
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Signal {}

impl Hash for Signal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.0.name)
            .field("shape", &self.0.shape)
            .field("init", &self.0.init)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.name.is_empty() {
            f.write_str("(sig)")
        } else {
            write!(f, "(sig {})", self.0.name)
        }
    }
}

/// Collects the parameters of a [`Signal`] before validating them.
#[derive(Clone, Debug)]
pub struct SignalBuilder {
    shape: ShapeLike,
    name: String,
    like_name: Option<String>,
    name_suffix: Option<String>,
    init: Option<ValueLike>,
    reset_less: bool,
    attrs: BTreeMap<String, String>,
    decoder: Option<Decoder>,
}

impl SignalBuilder {
    fn new(shape: ShapeLike) -> SignalBuilder {
        SignalBuilder {
            shape,
            name: "$signal".to_string(),
            like_name: None,
            name_suffix: None,
            init: None,
            reset_less: false,
            attrs: BTreeMap::new(),
            decoder: None,
        }
    }

    /// Sets the name. The empty name is allowed.
    pub fn name(mut self, name: impl Into<String>) -> SignalBuilder {
        self.name = name.into();
        self.name_suffix = None;
        self
    }

    /// Names a signal created by [`Signal::like`] after its source, with
    /// `suffix` appended.
    pub fn name_suffix(mut self, suffix: impl Into<String>) -> SignalBuilder {
        self.name_suffix = Some(suffix.into());
        self
    }

    /// Sets the initial value.
    pub fn init(mut self, init: impl Into<ValueLike>) -> SignalBuilder {
        self.init = Some(init.into());
        self
    }

    /// Marks the signal as keeping its value across domain resets.
    pub fn reset_less(mut self) -> SignalBuilder {
        self.reset_less = true;
        self
    }

    /// Adds an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> SignalBuilder {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Sets the decoder.
    pub fn decoder(mut self, decoder: Decoder) -> SignalBuilder {
        self.decoder = Some(decoder);
        self
    }

    /// Validates the parameters and creates the signal.
    ///
    /// A signed initializer for an unsigned shape raises `W302`, and an
    /// initializer wider than the shape raises `W303`; the initial values 0
    /// and -1 never warn.
    #[track_caller]
    pub fn build(self) -> HdlResult<Signal> {
        let shape = Shape::cast(self.shape.clone())?;
        let orig_init = self.init;

        let init = match &self.shape {
            ShapeLike::Castable(castable) => {
                let folded = castable
                    .const_value(orig_init.as_ref())
                    .and_then(|value| Const::cast(value))
                    .map_err(|_| {
                        HdlError::type_error(format!(
                            "Initial value must be a constant initializer of {castable:?}"
                        ))
                    })?;
                if folded.shape() != shape {
                    return Err(HdlError::value_error(format!(
                        "Constant returned by {castable:?}.const() must have the shape that it \
                         casts to, {shape}, and not {}",
                        folded.shape()
                    )));
                }
                folded
            }
            ShapeLike::Enum(ty) if ty.declared_shape().is_some() => {
                ty.const_value(orig_init.as_ref()).map_err(|_| {
                    HdlError::type_error(format!(
                        "Initial value must be a constant initializer of {ty}"
                    ))
                })?
            }
            _ => {
                let init = orig_init
                    .clone()
                    .unwrap_or_else(|| ValueLike::Int(BigInt::from(0)));
                Const::cast(init).map_err(|err| match err.kind() {
                    ErrorKind::Type => HdlError::type_error(format!(
                        "Initial value must be a constant-castable expression, not {}",
                        orig_init
                            .as_ref()
                            .map_or_else(|| "None".to_string(), ToString::to_string)
                    )),
                    _ => err,
                })?
            }
        };

        let all_zeroes_or_ones = match &orig_init {
            None | Some(ValueLike::Bool(false)) => true,
            Some(ValueLike::Int(v)) => *v == BigInt::from(0) || *v == BigInt::from(-1),
            Some(_) => false,
        };
        if let (Some(orig), false) = (&orig_init, all_zeroes_or_ones) {
            let init_shape = init.shape();
            if init_shape.signed() && !shape.signed() {
                warnings::emit(
                    W302,
                    format!("Initial value {orig} is signed, but the signal shape is {shape}"),
                )?;
            } else if init_shape.width() > shape.width()
                || (init_shape.width() == shape.width() && shape.signed() && !init_shape.signed())
            {
                warnings::emit(
                    W303,
                    format!("Initial value {orig} will be truncated to the signal shape {shape}"),
                )?;
            }
        }
        let init = Const::with_shape(init.value().clone(), shape).value().clone();

        if let (ShapeLike::Range(range), Some(ValueLike::Int(orig))) = (&self.shape, &orig_init) {
            if !range.contains(orig) {
                let reason = if *orig == BigInt::from(range.stop()) {
                    format!(
                        "Initial value {orig} equals the non-inclusive end of the signal shape \
                         {range}; this is likely an off-by-one error"
                    )
                } else {
                    format!("Initial value {orig} is not within the signal shape {range}")
                };
                return Err(HdlError::syntax_error(reason));
            }
        }

        let decoder = match (self.decoder, &self.shape) {
            (Some(decoder), _) => Some(decoder),
            (None, ShapeLike::Enum(ty)) => Some(Decoder::Enum(Arc::clone(ty))),
            (None, _) => None,
        };
        let name = match (self.name_suffix, self.like_name) {
            (Some(suffix), Some(base)) => format!("{base}{suffix}"),
            (Some(suffix), None) => format!("{}{suffix}", self.name),
            (None, _) => self.name,
        };

        Ok(Signal(Arc::new(SignalData {
            name,
            shape,
            orig_shape: self.shape,
            init,
            reset_less: self.reset_less,
            attrs: self.attrs,
            decoder,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::ShapeCastable;
    use crate::shape::{range, signed, unsigned};
    use crate::value::cat;
    use std::collections::HashSet;

    fn sig(shape: impl Into<ShapeLike>) -> Signal {
        Signal::new(shape).name("s").build().unwrap()
    }

    #[test]
    fn shapes() {
        assert_eq!(sig(unsigned(1)).shape(), unsigned(1));
        assert_eq!(sig(2).shape(), unsigned(2));
        assert_eq!(sig(signed(2)).shape(), signed(2));
        assert_eq!(sig(0).shape(), unsigned(0));
        assert_eq!(sig(range(0, 16)).shape(), unsigned(4));
        assert_eq!(sig(range(4, 16)).shape(), unsigned(4));
        assert_eq!(sig(range(-4, 16)).shape(), signed(5));
        assert_eq!(sig(range(-20, 16)).shape(), signed(6));
        assert_eq!(sig(range(0, 0)).shape(), unsigned(0));
        assert_eq!(sig(range(0, 1)).shape(), unsigned(0));
        assert_eq!(
            Signal::new(-10).build().unwrap_err().to_string(),
            "Width of an unsigned value must be zero or a positive integer, not -10"
        );
    }

    #[test]
    fn names_and_repr() {
        assert_eq!(Signal::new(1).build().unwrap().name(), "$signal");
        let s = Signal::new(1).name("sig").build().unwrap();
        assert_eq!(s.to_string(), "(sig sig)");
        let s = Signal::new(1).name("").build().unwrap();
        assert_eq!(s.to_string(), "(sig)");
    }

    #[test]
    fn identity() {
        let a = sig(4);
        let b = sig(4);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        let set: HashSet<Signal> = [a.clone(), b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn init_and_reset_less() {
        let s1 = Signal::new(4).init(0b111).reset_less().build().unwrap();
        assert_eq!(*s1.init(), BigInt::from(0b111));
        assert!(s1.is_reset_less());
        let s2 = Signal::like(&s1).unwrap().init(0b011).build().unwrap();
        assert_eq!(*s2.init(), BigInt::from(0b011));
    }

    #[test]
    fn init_enum_and_const_castable() {
        let e = EnumType::new("UnsignedEnum", [("FOO", 1), ("BAR", 2), ("BAZ", 3)]);
        let s = Signal::new(2).init(e.member("BAR").unwrap()).build().unwrap();
        assert_eq!(*s.init(), BigInt::from(2));
        let strings = EnumType::new("StringEnum", [("FOO", "a"), ("BAR", "b")]);
        assert_eq!(
            Signal::new(1)
                .init(strings.member("FOO").unwrap())
                .build()
                .unwrap_err()
                .to_string(),
            "Initial value must be a constant-castable expression, not <StringEnum.FOO: 'a'>"
        );
        let init = cat([
            Const::new(0, 1).unwrap(),
            Const::new(1, 1).unwrap(),
            Const::new(0, 2).unwrap(),
        ])
        .unwrap();
        assert_eq!(*Signal::new(4).init(init).build().unwrap().init(), BigInt::from(2));
    }

    #[derive(Debug)]
    struct CastableFromHex;

    impl ShapeCastable for CastableFromHex {
        fn as_shape(&self) -> ShapeLike {
            unsigned(8).into()
        }

        fn const_value(&self, init: Option<&ValueLike>) -> HdlResult<ValueLike> {
            match init {
                Some(ValueLike::Str(text)) => BigInt::parse_bytes(text.as_bytes(), 16)
                    .map(ValueLike::Int)
                    .ok_or_else(|| HdlError::value_error(format!("invalid hex {text:?}"))),
                _ => Err(HdlError::type_error("expected a hex string")),
            }
        }
    }

    #[test]
    fn init_shape_castable_const() {
        let castable: Arc<dyn ShapeCastable> = Arc::new(CastableFromHex);
        let s = Signal::new(castable.clone()).init("aa").build().unwrap();
        assert_eq!(*s.init(), BigInt::from(0xaa));
        let err = Signal::new(castable.clone()).init("01").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        assert_eq!(
            err.to_string(),
            "Constant returned by CastableFromHex.const() must have the shape that it casts to, \
             unsigned(8), and not unsigned(1)"
        );
        let err = Signal::new(castable).build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Initial value must be a constant initializer of CastableFromHex"
        );
    }

    #[test]
    fn init_typed_enum_without_zero() {
        let e = EnumType::with_shape("EnumA", unsigned(1), [("X", 1)]);
        assert_eq!(
            Signal::new(e.clone()).build().unwrap_err().to_string(),
            "Initial value must be a constant initializer of <enum 'EnumA'>"
        );
        let s = Signal::new(e.clone()).init(e.member("X").unwrap()).build().unwrap();
        assert_eq!(*s.init(), BigInt::from(1));
    }

    #[test]
    fn init_signed_mismatch() {
        let (s, diags) = warnings::collect(|| Signal::new(unsigned(2)).init(-2).build());
        assert_eq!(*s.unwrap().init(), BigInt::from(2));
        assert_eq!(diags[0].code, W302);
        assert_eq!(
            diags[0].message,
            "Initial value -2 is signed, but the signal shape is unsigned(2)"
        );
    }

    #[test]
    fn init_too_wide() {
        let cases: [(Shape, i64, &str); 3] = [
            (unsigned(1), 2, "Initial value 2 will be truncated to the signal shape unsigned(1)"),
            (signed(1), 1, "Initial value 1 will be truncated to the signal shape signed(1)"),
            (signed(1), -2, "Initial value -2 will be truncated to the signal shape signed(1)"),
        ];
        for (shape, init, message) in cases {
            let (_, diags) = warnings::collect(|| Signal::new(shape).init(init).build());
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].code, W303);
            assert_eq!(diags[0].message, message);
        }
    }

    #[test]
    fn init_truncated_quietly() {
        let (s1, diags) = warnings::collect(|| Signal::new(unsigned(2)).init(-1).build());
        assert_eq!(*s1.unwrap().init(), BigInt::from(0b11));
        assert!(diags.is_empty());
        let filter = aion_diagnostics::DiagnosticFilter::new().allow(W303);
        let (s2, diags) = warnings::capture(filter, || Signal::new(signed(2)).init(-33).build());
        assert_eq!(*s2.unwrap().init(), BigInt::from(-1));
        assert!(diags.is_empty());
    }

    #[test]
    fn init_range_errors() {
        let err = Signal::new(range(0, 10)).init(10).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(
            err.to_string(),
            "Initial value 10 equals the non-inclusive end of the signal shape range(0, 10); \
             this is likely an off-by-one error"
        );
        let err = Signal::new(range(0, 0)).init(0).build().unwrap_err();
        assert!(err.to_string().starts_with("Initial value 0 equals the non-inclusive end"));
        assert_eq!(
            Signal::new(range(0, 10)).init(11).build().unwrap_err().to_string(),
            "Initial value 11 is not within the signal shape range(0, 10)"
        );
        assert_eq!(
            Signal::new(range(1, 10)).init(0).build().unwrap_err().to_string(),
            "Initial value 0 is not within the signal shape range(1, 10)"
        );
    }

    #[test]
    fn attrs() {
        assert!(sig(1).attrs().is_empty());
        let s = Signal::new(1).attr("no_retiming", "true").build().unwrap();
        assert_eq!(s.attrs().get("no_retiming").map(String::as_str), Some("true"));
    }

    #[test]
    fn like() {
        let s1 = Signal::like(&sig(4)).unwrap().build().unwrap();
        assert_eq!(s1.shape(), unsigned(4));
        assert_eq!(s1.name(), "$like");
        let s2 = Signal::like(&sig(range(-15, 1))).unwrap().build().unwrap();
        assert_eq!(s2.shape(), signed(5));
        let src = Signal::new(4).init(0b111).reset_less().build().unwrap();
        let s3 = Signal::like(&src).unwrap().build().unwrap();
        assert_eq!(*s3.init(), BigInt::from(0b111));
        assert!(s3.is_reset_less());
        let src = Signal::new(1).attr("no_retiming", "true").build().unwrap();
        assert_eq!(Signal::like(&src).unwrap().build().unwrap().attrs(), src.attrs());
        let src = Signal::new(1).decoder(Decoder::from_fn(|v| format!("<{v}>"))).build().unwrap();
        let s5 = Signal::like(&src).unwrap().build().unwrap();
        assert_eq!(s5.decode(&BigInt::from(1)), "<1>");
        assert_eq!(Signal::like(10).unwrap().build().unwrap().shape(), unsigned(4));
        let s1 = Signal::new(4).name("s1").build().unwrap();
        let s8 = Signal::like(&s1).unwrap().name_suffix("_ff").build().unwrap();
        assert_eq!(s8.name(), "s1_ff");
    }

    #[test]
    fn enum_decoder() {
        let color = EnumType::new("Color", [("RED", 1), ("BLUE", 2)]);
        let s = Signal::new(2)
            .name("s")
            .decoder(Decoder::Enum(color))
            .build()
            .unwrap();
        assert_eq!(s.decode(&BigInt::from(2)), "BLUE/2");
        assert_eq!(s.decode(&BigInt::from(3)), "3");
        assert_eq!(
            s.format().unwrap().to_string(),
            "(format-enum (sig s) 'Color' (1 'RED') (2 'BLUE'))"
        );
    }

    #[test]
    fn enum_shape() {
        let e = EnumType::new("SignedEnum", [("FOO", -1), ("BAR", 0), ("BAZ", 1)]);
        let s2 = Signal::new(e).name("s2").build().unwrap();
        assert_eq!(s2.shape(), signed(2));
        assert_eq!(
            s2.format().unwrap().to_string(),
            "(format-enum (sig s2) 'SignedEnum' (-1 'FOO') (0 'BAR') (1 'BAZ'))"
        );
    }

    #[test]
    fn format_simple() {
        let s = sig(1);
        assert_eq!(s.format().unwrap().to_string(), "(format '{}' (sig s))");
    }

    #[test]
    fn const_cast_rejects_signal() {
        let s1 = Signal::new(1).name("s1").build().unwrap();
        assert_eq!(
            Const::cast(&s1).unwrap_err().to_string(),
            "Value (sig s1) cannot be converted to an Amaranth constant"
        );
    }
}
