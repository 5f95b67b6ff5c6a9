//! Structured printers: enumerations, records and arrays.
//!
//! Each printer is a description that compiles into a plain [`Format`] on
//! demand. An enumeration printer selects a label with a multiplexer whose
//! cases are the labels encoded as little-endian byte strings; any value
//! that matches no variant prints `[unknown]`.

use super::{Chunk, Format, FormatLike};
use crate::cast::ValueLike;
use crate::const_value::Const;
use crate::enums::{EnumType, MemberValue};
use crate::error::{HdlError, HdlResult};
use crate::repr::quote;
use crate::shape::unsigned;
use crate::switch::{Pattern, SwitchValue};
use crate::value::Value;
use num_bigint::{BigInt, Sign};
use std::fmt;
use std::sync::Arc;

fn label(text: &str) -> Value {
    let bytes = text.as_bytes();
    Value::Const(Const::with_shape(
        BigInt::from_bytes_le(Sign::Plus, bytes),
        unsigned(bytes.len() * 8),
    ))
}

/// Prints a value as the name of the variant it equals.
#[derive(Clone, Debug)]
pub struct FormatEnum {
    value: Value,
    variants: Vec<(BigInt, String)>,
    name: Option<String>,
}

impl FormatEnum {
    /// Creates a printer from explicit `(value, label)` variants.
    pub fn new<K, L>(
        value: impl Into<ValueLike>,
        variants: impl IntoIterator<Item = (K, L)>,
        name: Option<&str>,
    ) -> HdlResult<FormatEnum>
    where
        K: Into<BigInt>,
        L: Into<String>,
    {
        Ok(FormatEnum {
            value: Value::cast(value)?,
            variants: variants
                .into_iter()
                .map(|(k, l)| (k.into(), l.into()))
                .collect(),
            name: name.map(str::to_owned),
        })
    }

    /// Creates a printer whose variants are the members of `ty`.
    pub fn from_enum(
        value: impl Into<ValueLike>,
        ty: &Arc<EnumType>,
        name: Option<&str>,
    ) -> HdlResult<FormatEnum> {
        let variants = ty
            .members()
            .map(|member| match member.value() {
                MemberValue::Int(v) => Ok((v.clone(), member.name().to_owned())),
                other => Err(HdlError::type_error(format!(
                    "Variant values must be integers, not {other}"
                ))),
            })
            .collect::<HdlResult<Vec<_>>>()?;
        FormatEnum::new(value, variants, name)
    }

    /// Returns the printed value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the `(value, label)` pairs in declaration order.
    pub fn variants(&self) -> &[(BigInt, String)] {
        &self.variants
    }

    /// Compiles to a format printing the selected label as a string.
    #[track_caller]
    pub fn as_format(&self) -> HdlResult<Format> {
        let mut cases: Vec<(Option<Vec<Pattern>>, Value)> = self
            .variants
            .iter()
            .map(|(v, l)| (Some(vec![Pattern::from(v.clone())]), label(l)))
            .collect();
        cases.push((None, label("[unknown]")));
        let switch = SwitchValue::new(self.value.clone(), cases)?;
        Format::new("{:s}", vec![Value::SwitchValue(switch).into()])
    }
}

impl fmt::Display for FormatEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(format-enum {} ", self.value)?;
        match &self.name {
            Some(name) => f.write_str(&quote(name))?,
            None => f.write_str("-")?,
        }
        for (value, label) in &self.variants {
            write!(f, " ({value} {})", quote(label))?;
        }
        f.write_str(")")
    }
}

/// Prints a value as `{name=field, ...}`.
#[derive(Clone, Debug)]
pub struct FormatStruct {
    value: Value,
    fields: Vec<(String, FormatLike)>,
}

impl FormatStruct {
    /// Creates a printer from named field formats.
    pub fn new<N, F>(
        value: impl Into<ValueLike>,
        fields: impl IntoIterator<Item = (N, F)>,
    ) -> HdlResult<FormatStruct>
    where
        N: Into<String>,
        F: Into<FormatLike>,
    {
        Ok(FormatStruct {
            value: Value::cast(value)?,
            fields: fields
                .into_iter()
                .map(|(n, f)| (n.into(), f.into()))
                .collect(),
        })
    }

    /// Compiles to a format of the fields.
    #[track_caller]
    pub fn as_format(&self) -> HdlResult<Format> {
        let mut chunks = vec![Chunk::Text("{".into())];
        for (i, (name, field)) in self.fields.iter().enumerate() {
            let separator = if i > 0 { ", " } else { "" };
            chunks.push(Chunk::Text(format!("{separator}{name}=")));
            chunks.extend(field.as_format()?.chunks);
        }
        chunks.push(Chunk::Text("}".into()));
        Ok(Format::from_chunks(chunks))
    }
}

impl fmt::Display for FormatStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(format-struct {}", self.value)?;
        for (name, field) in &self.fields {
            write!(f, " ({} {field})", quote(name))?;
        }
        f.write_str(")")
    }
}

/// Prints a value as `[element, ...]`.
#[derive(Clone, Debug)]
pub struct FormatArray {
    value: Value,
    elements: Vec<FormatLike>,
}

impl FormatArray {
    /// Creates a printer from element formats.
    pub fn new<F: Into<FormatLike>>(
        value: impl Into<ValueLike>,
        elements: impl IntoIterator<Item = F>,
    ) -> HdlResult<FormatArray> {
        Ok(FormatArray {
            value: Value::cast(value)?,
            elements: elements.into_iter().map(Into::into).collect(),
        })
    }

    /// Compiles to a format of the elements.
    #[track_caller]
    pub fn as_format(&self) -> HdlResult<Format> {
        let mut chunks = vec![Chunk::Text("[".into())];
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                chunks.push(Chunk::Text(", ".into()));
            }
            chunks.extend(element.as_format()?.chunks);
        }
        chunks.push(Chunk::Text("]".into()));
        Ok(Format::from_chunks(chunks))
    }
}

impl fmt::Display for FormatArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(format-array {}", self.value)?;
        for element in &self.elements {
            write!(f, " {element}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Signal;

    fn sig(name: &str, width: i64) -> Signal {
        Signal::new(width).name(name).build().unwrap()
    }

    #[test]
    fn enum_from_variants() {
        let a = sig("a", 3);
        let f = FormatEnum::new(&a, [(1, "A"), (2, "B"), (3, "C")], None).unwrap();
        assert_eq!(f.to_string(), "(format-enum (sig a) - (1 'A') (2 'B') (3 'C'))");
        assert_eq!(
            Format::new("{}", vec![f.into()]).unwrap().to_string(),
            "(format '{:s}' (switch-value (sig a) (case 001 (const 8'd65)) \
             (case 010 (const 8'd66)) (case 011 (const 8'd67)) \
             (default (const 72'd1723507152241428428123))))"
        );
    }

    #[test]
    fn enum_from_type() {
        let a = sig("a", 3);
        let ty = EnumType::new("MyEnum", [("A", 0), ("B", 3), ("C", 4)]);
        let f = FormatEnum::from_enum(&a, &ty, Some("MyEnum")).unwrap();
        assert_eq!(f.to_string(), "(format-enum (sig a) 'MyEnum' (0 'A') (3 'B') (4 'C'))");
        assert_eq!(
            f.as_format().unwrap().to_string(),
            "(format '{:s}' (switch-value (sig a) (case 000 (const 8'd65)) \
             (case 011 (const 8'd66)) (case 100 (const 8'd67)) \
             (default (const 72'd1723507152241428428123))))"
        );
    }

    #[test]
    fn enum_rejects_non_integer_variants() {
        let ty = EnumType::new("StringEnum", [("FOO", "a")]);
        assert_eq!(
            FormatEnum::from_enum(&sig("a", 3), &ty, None).unwrap_err().to_string(),
            "Variant values must be integers, not 'a'"
        );
    }

    #[test]
    fn struct_printer() {
        let s = Value::from(sig("sig", 3));
        let a = Format::new("{}", vec![s.bit(0).unwrap().into()]).unwrap();
        let b = Format::new("{}", vec![s.slice(1..3).unwrap().into()]).unwrap();
        let f = FormatStruct::new(s.clone(), [("a", a), ("b", b)]).unwrap();
        assert_eq!(
            f.to_string(),
            "(format-struct (sig sig) ('a' (format '{}' (slice (sig sig) 0:1))) \
             ('b' (format '{}' (slice (sig sig) 1:3))))"
        );
        assert_eq!(
            Format::new("{}", vec![f.into()]).unwrap().to_string(),
            "(format '{{a={}, b={}}}' (slice (sig sig) 0:1) (slice (sig sig) 1:3))"
        );
    }

    #[test]
    fn array_printer() {
        let s = Value::from(sig("sig", 4));
        let elements = [
            Format::new("{}", vec![s.slice(0..2).unwrap().into()]).unwrap(),
            Format::new("{}", vec![s.slice(2..4).unwrap().into()]).unwrap(),
        ];
        let f = FormatArray::new(s.clone(), elements).unwrap();
        assert_eq!(
            f.to_string(),
            "(format-array (sig sig) (format '{}' (slice (sig sig) 0:2)) \
             (format '{}' (slice (sig sig) 2:4)))"
        );
        assert_eq!(
            Format::new("{}", vec![f.into()]).unwrap().to_string(),
            "(format '[{}, {}]' (slice (sig sig) 0:2) (slice (sig sig) 2:4))"
        );
    }

    #[test]
    fn nested_printers() {
        let s = Value::from(sig("s", 4));
        let inner = FormatEnum::new(s.slice(0..2).unwrap(), [(0, "X")], None).unwrap();
        let f = FormatArray::new(s, [FormatLike::from(inner)]).unwrap();
        let compiled = f.as_format().unwrap();
        assert_eq!(compiled.args().count(), 1);
        assert_eq!(compiled.chunks()[0].as_text(), Some("["));
    }
}
