//! Switch-case patterns and the value multiplexer built on them.
//!
//! Case labels come in several spellings: strings of `0`, `1` and `-` bits,
//! integers, enumeration members and constant-castable expressions. All of
//! them normalize to fixed-width bit strings of the matched value's width,
//! most significant bit first. A label whose constant value does not fit
//! the matched shape can never match; it raises [`W306`] and is dropped.

use crate::cast::ValueLike;
use crate::const_value::Const;
use crate::enums::EnumMember;
use crate::error::{ErrorKind, HdlError, HdlResult};
use crate::repr::to_binary;
use crate::shape::Shape;
use crate::value::{Concat, Value};
use crate::warnings::{self, W306};
use num_bigint::BigInt;
use std::fmt;

/// A case label as written by the user.
#[derive(Clone, Debug)]
pub enum Pattern {
    /// A string of `0`, `1` and `-` (don't care) bits; whitespace is ignored.
    Bits(String),
    /// Anything that casts to a constant.
    Value(ValueLike),
}

impl From<&str> for Pattern {
    fn from(bits: &str) -> Self {
        Pattern::Bits(bits.to_owned())
    }
}

impl From<String> for Pattern {
    fn from(bits: String) -> Self {
        Pattern::Bits(bits)
    }
}

impl From<ValueLike> for Pattern {
    fn from(value: ValueLike) -> Self {
        match value {
            ValueLike::Str(bits) => Pattern::Bits(bits),
            other => Pattern::Value(other),
        }
    }
}

macro_rules! pattern_from_value_like {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Pattern {
                fn from(value: $ty) -> Self {
                    Pattern::Value(value.into())
                }
            }
        )*
    };
}

pattern_from_value_like!(i32, i64, u32, u64, usize, BigInt, bool, Value, Const, EnumMember);

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Bits(bits) => f.write_str(bits),
            Pattern::Value(value) => write!(f, "{value}"),
        }
    }
}

/// A pattern after normalization against a shape.
pub(crate) enum Normalized {
    /// Bits with at least one don't-care, or a zero-width match.
    Bits(String),
    /// A constant that fits the matched shape, in its own shape.
    Const(Const, String),
}

impl Normalized {
    fn key(&self) -> &str {
        match self {
            Normalized::Bits(bits) | Normalized::Const(_, bits) => bits,
        }
    }
}

#[track_caller]
pub(crate) fn normalize(patterns: &[Pattern], shape: Shape) -> HdlResult<Vec<Normalized>> {
    let mut normalized = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        match pattern {
            Pattern::Bits(raw) => {
                let bits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
                if bits.chars().any(|c| !matches!(c, '0' | '1' | '-')) {
                    return Err(HdlError::syntax_error(format!(
                        "Pattern '{raw}' must consist of 0, 1, and - (don't care) bits, \
                         and may include whitespace"
                    )));
                }
                if bits.len() != shape.width() {
                    return Err(HdlError::syntax_error(format!(
                        "Pattern '{raw}' must have the same width as match value (which is {})",
                        shape.width()
                    )));
                }
                normalized.push(Normalized::Bits(bits));
            }
            Pattern::Value(value) => {
                let pattern = match Const::cast(value.clone()) {
                    Ok(c) => c,
                    Err(err) if err.kind() == ErrorKind::Type => {
                        return Err(HdlError::syntax_error(format!(
                            "Pattern must be a string or a constant-castable expression, not {value}"
                        )))
                    }
                    Err(err) => return Err(err),
                };
                let fitted = Const::with_shape(pattern.value().clone(), shape);
                if fitted.value() != pattern.value() {
                    warnings::emit(
                        W306,
                        format!(
                            "Pattern '{value}' ({}'{}) is not representable in match value \
                             shape ({shape}); comparison will never be true",
                            pattern.width(),
                            to_binary(pattern.value(), pattern.width())
                        ),
                    )?;
                    continue;
                }
                let key = to_binary(fitted.value(), shape.width());
                normalized.push(Normalized::Const(pattern, key));
            }
        }
    }
    Ok(normalized)
}

/// Normalizes `patterns` to bit strings of `shape`'s width.
///
/// Patterns that can never match are dropped with a [`W306`] warning.
#[track_caller]
pub fn normalize_patterns(patterns: &[Pattern], shape: Shape) -> HdlResult<Vec<String>> {
    let normalized = normalize(patterns, shape)?;
    Ok(normalized.iter().map(|n| n.key().to_owned()).collect())
}

/// A multiplexer: the value of the first case whose patterns match `test`.
///
/// A case without patterns is the default and matches anything.
#[derive(Clone, Debug)]
pub struct SwitchValue {
    test: Box<Value>,
    cases: Vec<(Option<Vec<String>>, Value)>,
}

impl SwitchValue {
    /// Builds a multiplexer, normalizing every pattern against `test`'s shape.
    #[track_caller]
    pub fn new(
        test: impl Into<Value>,
        cases: Vec<(Option<Vec<Pattern>>, Value)>,
    ) -> HdlResult<SwitchValue> {
        let test = test.into();
        let shape = test.shape();
        let mut keyed = Vec::with_capacity(cases.len());
        for (patterns, value) in cases {
            let patterns = match patterns {
                Some(patterns) => Some(normalize_patterns(&patterns, shape)?),
                None => None,
            };
            keyed.push((patterns, value));
        }
        Ok(SwitchValue::from_keys(test, keyed))
    }

    pub(crate) fn from_keys(test: Value, cases: Vec<(Option<Vec<String>>, Value)>) -> SwitchValue {
        SwitchValue {
            test: Box::new(test),
            cases,
        }
    }

    /// Returns the value the patterns are matched against.
    pub fn test(&self) -> &Value {
        &self.test
    }

    /// Returns the cases in priority order.
    pub fn cases(&self) -> &[(Option<Vec<String>>, Value)] {
        &self.cases
    }

    /// Returns the shape that holds the value of every case.
    pub fn shape(&self) -> Shape {
        Shape::unify(self.cases.iter().map(|(_, value)| value.shape()))
    }
}

impl fmt::Display for SwitchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(switch-value {}", self.test)?;
        for (patterns, value) in &self.cases {
            match patterns {
                Some(patterns) if patterns.is_empty() => write!(f, " (case {value})")?,
                Some(patterns) => write!(f, " (case {} {value})", patterns.join(" "))?,
                None => write!(f, " (default {value})")?,
            }
        }
        f.write_str(")")
    }
}

/// Selects `if_true` when `sel` is nonzero and `if_false` otherwise.
pub fn mux(sel: impl Into<Value>, if_true: impl Into<Value>, if_false: impl Into<Value>) -> Value {
    let sel = sel.into();
    let zero = to_binary(&BigInt::from(0), sel.width());
    Value::SwitchValue(SwitchValue::from_keys(
        sel,
        vec![(Some(vec![zero]), if_false.into()), (None, if_true.into())],
    ))
}

impl Value {
    /// Builds a one-bit value that is set when `self` matches any of `patterns`.
    ///
    /// With no patterns the result is constant false.
    #[track_caller]
    pub fn matches<I>(&self, patterns: I) -> HdlResult<Value>
    where
        I: IntoIterator,
        I::Item: Into<Pattern>,
    {
        let patterns: Vec<Pattern> = patterns.into_iter().map(Into::into).collect();
        let normalized = normalize(&patterns, self.shape())?;
        let mut terms: Vec<Value> = normalized
            .into_iter()
            .map(|pattern| match pattern {
                Normalized::Const(c, _) => self.eq(Const::of(c.value().clone())),
                Normalized::Bits(bits) if bits.is_empty() => Value::from(Const::of(1)),
                Normalized::Bits(bits) if !bits.contains('-') => {
                    self.eq(Const::of(parse_bits(&bits, |b| b)))
                }
                Normalized::Bits(bits) => {
                    let mask = parse_bits(&bits, |b| if b == '-' { '0' } else { '1' });
                    let value = parse_bits(&bits, |b| if b == '-' { '0' } else { b });
                    (self & Const::of(mask)).eq(Const::of(value))
                }
            })
            .collect();
        Ok(match terms.len() {
            0 => Value::from(Const::of(0)),
            1 => terms.remove(0),
            _ => Value::Concat(Concat::new(terms)).any(),
        })
    }
}

fn parse_bits(bits: &str, map: impl Fn(char) -> char) -> BigInt {
    let digits: String = bits.chars().map(map).collect();
    BigInt::parse_bytes(digits.as_bytes(), 2).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::EnumType;
    use crate::error::ErrorKind;
    use crate::shape::{signed, unsigned};
    use crate::signal::Signal;
    use crate::value::cat;
    use aion_diagnostics::DiagnosticFilter;

    fn c(value: i64, shape: impl Into<crate::cast::ShapeLike>) -> Value {
        Value::from(Const::new(value, shape).unwrap())
    }

    #[test]
    fn mux_repr_and_shape() {
        let v1 = mux(Const::of(0), c(0, unsigned(4)), c(0, unsigned(6)));
        assert_eq!(
            v1.to_string(),
            "(switch-value (const 1'd0) (case 0 (const 6'd0)) (default (const 4'd0)))"
        );
        assert_eq!(v1.shape(), unsigned(6));
        let s = Const::of(0);
        assert_eq!(mux(s.clone(), c(0, signed(4)), c(0, signed(6))).shape(), signed(6));
        assert_eq!(mux(s.clone(), c(0, signed(4)), c(0, unsigned(4))).shape(), signed(5));
        assert_eq!(mux(s, c(0, unsigned(4)), c(0, signed(4))).shape(), signed(5));
    }

    #[test]
    fn mux_wide_and_bool() {
        let v = mux(Const::of(0b100), c(0, unsigned(4)), c(0, unsigned(6)));
        assert_eq!(
            v.to_string(),
            "(switch-value (const 3'd4) (case 000 (const 6'd0)) (default (const 4'd0)))"
        );
        let v = mux(true, Const::of(0), Const::of(0));
        assert_eq!(
            v.to_string(),
            "(switch-value (const 1'd1) (case 0 (const 1'd0)) (default (const 1'd0)))"
        );
    }

    #[test]
    fn matches() {
        let s = Value::from(Signal::new(4).name("s").build().unwrap());
        assert_eq!(s.matches(std::iter::empty::<Pattern>()).unwrap().to_string(), "(const 1'd0)");
        assert_eq!(s.matches([1]).unwrap().to_string(), "(== (sig s) (const 1'd1))");
        assert_eq!(
            s.matches([0, 1]).unwrap().to_string(),
            "(r| (cat (== (sig s) (const 1'd0)) (== (sig s) (const 1'd1))))"
        );
        assert_eq!(
            s.matches(["10--"]).unwrap().to_string(),
            "(== (& (sig s) (const 4'd12)) (const 4'd8))"
        );
        assert_eq!(
            s.matches(["1 0--"]).unwrap().to_string(),
            "(== (& (sig s) (const 4'd12)) (const 4'd8))"
        );
    }

    #[test]
    fn matches_enum_and_const_castable() {
        let ty = EnumType::new("SignedEnum", [("FOO", -1), ("BAR", 0), ("BAZ", 1)]);
        let s = Value::from(Signal::new(&ty).name("s").build().unwrap());
        let foo = ty.member("FOO").unwrap();
        assert_eq!(s.matches([foo]).unwrap().to_string(), "(== (sig s) (const 1'sd-1))");

        let s = Value::from(Signal::new(4).name("s").build().unwrap());
        let pattern = cat([Const::new(0b10, 2).unwrap(), Const::new(0b11, 2).unwrap()]).unwrap();
        assert_eq!(s.matches([pattern]).unwrap().to_string(), "(== (sig s) (const 4'd14))");
    }

    #[test]
    fn matches_width_wrong() {
        let s = Value::from(Signal::new(4).name("s").build().unwrap());
        let err = s.matches(["--"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(
            err.to_string(),
            "Pattern '--' must have the same width as match value (which is 4)"
        );

        let (result, warnings) = warnings::collect(|| s.matches([0b10110]));
        assert_eq!(result.unwrap().to_string(), "(const 1'd0)");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, W306);
        assert_eq!(
            warnings[0].message,
            "Pattern '22' (5'10110) is not representable in match value shape (unsigned(4)); \
             comparison will never be true"
        );

        let pattern = Value::Concat(Concat::new(vec![
            Value::from(Const::of(0)),
            c(0b1011, 4),
        ]));
        let (_, warnings) = warnings::collect(|| s.matches([pattern]));
        assert_eq!(
            warnings[0].message,
            "Pattern '(cat (const 1'd0) (const 4'd11))' (5'10110) is not representable in \
             match value shape (unsigned(4)); comparison will never be true"
        );
    }

    #[test]
    fn unrepresentable_pattern_can_be_denied() {
        let s = Value::from(Signal::new(4).name("s").build().unwrap());
        let (result, _) =
            warnings::capture(DiagnosticFilter::new().deny(W306), || s.matches([0b10110]));
        assert!(matches!(result, Err(HdlError::Denied(_))));
    }

    #[test]
    fn matches_bits_wrong() {
        let s = Value::from(Signal::new(4).name("s").build().unwrap());
        assert_eq!(
            s.matches(["abc"]).unwrap_err().to_string(),
            "Pattern 'abc' must consist of 0, 1, and - (don't care) bits, and may include whitespace"
        );
        let err = s.matches([Pattern::Value(ValueLike::Str("1.0".into()))]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Pattern must be a string or a constant-castable expression, not '1.0'"
        );
    }

    #[test]
    fn matches_pattern_wrong() {
        let ty = EnumType::new("StringEnum", [("FOO", "a")]);
        let s = Value::from(Signal::new(4).name("s").build().unwrap());
        let err = s.matches([ty.member("FOO").unwrap()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(
            err.to_string(),
            "Pattern must be a string or a constant-castable expression, not <StringEnum.FOO: 'a'>"
        );
    }

    #[test]
    fn switch_value_normalizes_keys() {
        let cases = vec![
            (Some(vec![Pattern::from(10)]), c(1, 4)),
            (Some(vec![Pattern::from("0000 11\t01"), Pattern::from(123)]), c(2, 4)),
            (None, c(3, 4)),
        ];
        let v = SwitchValue::new(c(0, 8), cases).unwrap();
        assert_eq!(v.cases()[0].0.as_deref(), Some(&["00001010".to_owned()][..]));
        assert_eq!(
            v.cases()[1].0.as_deref(),
            Some(&["00001101".to_owned(), "01111011".to_owned()][..])
        );
        assert_eq!(
            v.to_string(),
            "(switch-value (const 8'd0) (case 00001010 (const 4'd1)) \
             (case 00001101 01111011 (const 4'd2)) (default (const 4'd3)))"
        );
        assert_eq!(v.shape(), unsigned(4));
    }

    #[test]
    fn switch_value_case_without_reachable_patterns() {
        let cases = vec![
            (Some(vec![Pattern::from(7)]), c(1, 4)),
            (None, c(3, 4)),
        ];
        let (v, diags) = warnings::collect(|| SwitchValue::new(c(0, 2), cases));
        let v = v.unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, W306);
        assert_eq!(v.cases()[0].0.as_deref(), Some(&[][..]));
        assert_eq!(
            v.to_string(),
            "(switch-value (const 2'd0) (case (const 4'd1)) (default (const 4'd3)))"
        );
    }

    #[test]
    fn negative_and_zero_width_keys() {
        let keys = normalize_patterns(&[Pattern::from(-10)], signed(8)).unwrap();
        assert_eq!(keys, ["11110110"]);
        let keys = normalize_patterns(&[Pattern::from(0)], unsigned(0)).unwrap();
        assert_eq!(keys, [""]);
    }
}
