//! Format strings whose arguments may be values.
//!
//! A [`Format`] is compiled once from a template in the familiar
//! `{field!conversion:spec}` syntax. Literal arguments are rendered into
//! text immediately; value arguments stay symbolic, each paired with its
//! validated specifier, so that a simulator or backend can render them
//! later. Other formats are spliced in place, which is how the structured
//! printers in [`pretty`] compose.

mod pretty;
mod spec;

pub use pretty::{FormatArray, FormatEnum, FormatStruct};
pub use spec::FormatSpec;

use crate::cast::{ShapeLike, ValueCastable, ValueLike};
use crate::const_value::Const;
use crate::error::{HdlError, HdlResult};
use crate::repr::{quote, quote_ascii};
use crate::signal::Signal;
use crate::value::Value;
use num_bigint::BigInt;
use spec::{format_int, format_str, validate_value_spec};
use std::fmt;
use std::ops;
use std::sync::Arc;

/// One piece of a compiled format.
#[derive(Clone, Debug)]
pub enum Chunk {
    /// Literal text.
    Text(String),
    /// A value rendered at runtime with a specifier.
    Arg {
        /// The value to print.
        value: Value,
        /// The validated format specifier, without the leading `:`.
        spec: String,
    },
}

impl Chunk {
    /// Returns the text of a literal chunk.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Chunk::Text(text) => Some(text),
            Chunk::Arg { .. } => None,
        }
    }
}

/// An argument to [`Format::new`].
#[derive(Clone, Debug)]
pub enum FormatArg {
    /// An integer, rendered immediately.
    Int(BigInt),
    /// A string, rendered immediately.
    Str(String),
    /// A value, rendered at runtime.
    Value(Value),
    /// A format, spliced in place.
    Format(FormatLike),
    /// A value-castable object, printed through its shape's `format` when it
    /// has one.
    Castable(Arc<dyn ValueCastable>),
}

impl FormatArg {
    fn repr(&self) -> String {
        match self {
            FormatArg::Int(v) => v.to_string(),
            FormatArg::Str(s) => quote(s),
            FormatArg::Value(v) => v.to_string(),
            FormatArg::Format(f) => f.to_string(),
            FormatArg::Castable(c) => format!("{c:?}"),
        }
    }

    fn convert(self, conversion: Option<char>) -> HdlResult<FormatArg> {
        Ok(match conversion {
            None => self,
            Some('v') => FormatArg::Value(match self {
                FormatArg::Int(v) => Value::Const(Const::of(v)),
                FormatArg::Str(s) => Value::cast(s)?,
                FormatArg::Value(v) => v,
                FormatArg::Castable(c) => Value::cast(c)?,
                FormatArg::Format(f) => {
                    return Err(HdlError::type_error(format!(
                        "Object {f} cannot be converted to an Amaranth value"
                    )))
                }
            }),
            Some('r') => FormatArg::Str(self.repr()),
            Some('a') => FormatArg::Str(match &self {
                FormatArg::Str(s) => quote_ascii(s),
                other => other.repr(),
            }),
            Some('s') => FormatArg::Str(match self {
                FormatArg::Str(s) => s,
                other => other.repr(),
            }),
            Some(other) => {
                return Err(HdlError::value_error(format!(
                    "Unknown conversion specifier {other}"
                )))
            }
        })
    }
}

macro_rules! format_arg_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FormatArg {
                fn from(value: $ty) -> Self {
                    FormatArg::Int(BigInt::from(value))
                }
            }
        )*
    };
}

format_arg_from_int!(i32, i64, u32, u64, usize, BigInt);

impl From<&str> for FormatArg {
    fn from(text: &str) -> Self {
        FormatArg::Str(text.to_owned())
    }
}

impl From<String> for FormatArg {
    fn from(text: String) -> Self {
        FormatArg::Str(text)
    }
}

impl From<Value> for FormatArg {
    fn from(value: Value) -> Self {
        FormatArg::Value(value)
    }
}

impl From<Const> for FormatArg {
    fn from(value: Const) -> Self {
        FormatArg::Value(Value::Const(value))
    }
}

impl From<Signal> for FormatArg {
    fn from(signal: Signal) -> Self {
        FormatArg::Value(Value::Signal(signal))
    }
}

impl From<&Signal> for FormatArg {
    fn from(signal: &Signal) -> Self {
        FormatArg::Value(Value::Signal(signal.clone()))
    }
}

impl From<Arc<dyn ValueCastable>> for FormatArg {
    fn from(castable: Arc<dyn ValueCastable>) -> Self {
        FormatArg::Castable(castable)
    }
}

macro_rules! format_arg_from_format {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FormatArg {
                fn from(format: $ty) -> Self {
                    FormatArg::Format(format.into())
                }
            }
        )*
    };
}

format_arg_from_format!(Format, FormatLike, FormatEnum, FormatStruct, FormatArray);

/// Any of the format flavors that can be spliced into a [`Format`].
#[derive(Clone, Debug)]
pub enum FormatLike {
    /// A plain format.
    Format(Format),
    /// An enumeration printer.
    Enum(FormatEnum),
    /// A record printer.
    Struct(FormatStruct),
    /// An array printer.
    Array(FormatArray),
}

impl FormatLike {
    /// Compiles to a plain format.
    #[track_caller]
    pub fn as_format(&self) -> HdlResult<Format> {
        match self {
            FormatLike::Format(f) => Ok(f.clone()),
            FormatLike::Enum(f) => f.as_format(),
            FormatLike::Struct(f) => f.as_format(),
            FormatLike::Array(f) => f.as_format(),
        }
    }
}

impl From<Format> for FormatLike {
    fn from(format: Format) -> Self {
        FormatLike::Format(format)
    }
}

impl From<FormatEnum> for FormatLike {
    fn from(format: FormatEnum) -> Self {
        FormatLike::Enum(format)
    }
}

impl From<FormatStruct> for FormatLike {
    fn from(format: FormatStruct) -> Self {
        FormatLike::Struct(format)
    }
}

impl From<FormatArray> for FormatLike {
    fn from(format: FormatArray) -> Self {
        FormatLike::Array(format)
    }
}

impl fmt::Display for FormatLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatLike::Format(x) => write!(f, "{x}"),
            FormatLike::Enum(x) => write!(f, "{x}"),
            FormatLike::Struct(x) => write!(f, "{x}"),
            FormatLike::Array(x) => write!(f, "{x}"),
        }
    }
}

/// A compiled format string.
#[derive(Clone, Debug, Default)]
pub struct Format {
    chunks: Vec<Chunk>,
}

enum Piece {
    Text(String),
    Field {
        name: String,
        conversion: Option<char>,
        spec: String,
    },
}

fn parse(template: &str) -> HdlResult<Vec<Piece>> {
    let chars: Vec<char> = template.chars().collect();
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                text.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                text.push('}');
                i += 2;
            }
            '}' => {
                return Err(HdlError::value_error(
                    "Single '}' encountered in format string",
                ))
            }
            '{' => {
                let mut depth = 1;
                let mut end = i + 1;
                while end < chars.len() {
                    match chars[end] {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    end += 1;
                }
                if end == chars.len() {
                    return Err(HdlError::value_error(
                        "expected '}' before end of string",
                    ));
                }
                let field: String = chars[i + 1..end].iter().collect();
                pieces.push(Piece::Text(std::mem::take(&mut text)));
                pieces.push(parse_field(&field)?);
                i = end + 1;
            }
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    pieces.push(Piece::Text(text));
    Ok(pieces)
}

fn parse_field(field: &str) -> HdlResult<Piece> {
    let name_end = field.find(['!', ':']).unwrap_or(field.len());
    let name = field[..name_end].to_owned();
    let rest = &field[name_end..];
    let (conversion, rest) = match rest.strip_prefix('!') {
        Some(after) => {
            let mut chars = after.chars();
            let conversion = chars.next().ok_or_else(|| {
                HdlError::value_error("end of string while looking for conversion specifier")
            })?;
            let rest = chars.as_str();
            if !rest.is_empty() && !rest.starts_with(':') {
                return Err(HdlError::value_error(
                    "expected ':' after conversion specifier",
                ));
            }
            (Some(conversion), rest)
        }
        None => (None, rest),
    };
    let spec = rest.strip_prefix(':').unwrap_or(rest).to_owned();
    Ok(Piece::Field {
        name,
        conversion,
        spec,
    })
}

struct Binder<'a> {
    args: &'a [FormatArg],
    kwargs: &'a [(String, FormatArg)],
    next_auto: Option<usize>,
    used_args: Vec<bool>,
    used_kwargs: Vec<bool>,
}

impl<'a> Binder<'a> {
    fn new(args: &'a [FormatArg], kwargs: &'a [(String, FormatArg)]) -> Binder<'a> {
        Binder {
            args,
            kwargs,
            next_auto: Some(0),
            used_args: vec![false; args.len()],
            used_kwargs: vec![false; kwargs.len()],
        }
    }

    fn get(&mut self, name: &str) -> HdlResult<FormatArg> {
        let index = if name.is_empty() {
            let Some(next) = self.next_auto else {
                return Err(HdlError::value_error(
                    "cannot switch from manual field specification to automatic field numbering",
                ));
            };
            self.next_auto = Some(next + 1);
            next
        } else if name.chars().all(|c| c.is_ascii_digit()) {
            if self.next_auto.is_some_and(|next| next > 0) {
                return Err(HdlError::value_error(
                    "cannot switch from automatic field numbering to manual field specification",
                ));
            }
            self.next_auto = None;
            name.parse()
                .map_err(|_| HdlError::value_error("Too many decimal digits in format string"))?
        } else {
            let position = self
                .kwargs
                .iter()
                .position(|(key, _)| key == name)
                .ok_or_else(|| HdlError::index_error(format!("Missing keyword argument {}", quote(name))))?;
            self.used_kwargs[position] = true;
            return Ok(self.kwargs[position].1.clone());
        };
        let arg = self.args.get(index).ok_or_else(|| {
            HdlError::index_error(format!(
                "Replacement index {index} out of range for positional args tuple"
            ))
        })?;
        self.used_args[index] = true;
        Ok(arg.clone())
    }

    fn subformat(&mut self, template: &str) -> HdlResult<String> {
        let mut out = String::new();
        for piece in parse(template)? {
            match piece {
                Piece::Text(text) => out.push_str(&text),
                Piece::Field {
                    name,
                    conversion,
                    spec,
                } => {
                    let arg = self.get(&name)?.convert(conversion)?;
                    let spec = self.subformat(&spec)?;
                    out.push_str(&render_literal(arg, &spec)?);
                }
            }
        }
        Ok(out)
    }

    fn finish(self) -> HdlResult<()> {
        if let Some(i) = self.used_args.iter().position(|used| !used) {
            return Err(HdlError::value_error(format!(
                "format positional argument {i} was not used"
            )));
        }
        if let Some(i) = self.used_kwargs.iter().position(|used| !used) {
            return Err(HdlError::value_error(format!(
                "format keyword argument {} was not used",
                quote(&self.kwargs[i].0)
            )));
        }
        Ok(())
    }
}

fn render_literal(arg: FormatArg, spec: &str) -> HdlResult<String> {
    match arg {
        FormatArg::Int(v) => format_int(&v, spec),
        FormatArg::Str(s) => format_str(&s, spec),
        FormatArg::Value(v) => Err(HdlError::type_error(format!(
            "Value {v} cannot be converted to string"
        ))),
        FormatArg::Castable(c) => Err(HdlError::type_error(format!(
            "Value-castable object {c:?} cannot be converted to string"
        ))),
        FormatArg::Format(f) => Err(HdlError::type_error(format!(
            "Format object {f} cannot be converted to string. Use `repr` to print the AST, \
             or pass it to the `Print` statement."
        ))),
    }
}

impl Format {
    /// Compiles `template` with positional arguments.
    #[track_caller]
    pub fn new(template: &str, args: Vec<FormatArg>) -> HdlResult<Format> {
        Format::with_kwargs(template, args, Vec::<(String, FormatArg)>::new())
    }

    /// Compiles `template` with positional and keyword arguments.
    ///
    /// Every argument must be referenced by at least one field, and fields
    /// must either all be numbered automatically or all explicitly.
    #[track_caller]
    pub fn with_kwargs<K: Into<String>>(
        template: &str,
        args: Vec<FormatArg>,
        kwargs: impl IntoIterator<Item = (K, FormatArg)>,
    ) -> HdlResult<Format> {
        let kwargs: Vec<(String, FormatArg)> =
            kwargs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let mut binder = Binder::new(&args, &kwargs);
        let mut chunks = Vec::new();
        for piece in parse(template)? {
            let (name, conversion, spec) = match piece {
                Piece::Text(text) => {
                    chunks.push(Chunk::Text(text));
                    continue;
                }
                Piece::Field {
                    name,
                    conversion,
                    spec,
                } => (name, conversion, spec),
            };
            let arg = binder.get(&name)?.convert(conversion)?;
            let spec = binder.subformat(&spec)?;
            match arg {
                FormatArg::Value(value) => {
                    validate_value_spec(&spec, value.shape())?;
                    chunks.push(Chunk::Arg { value, spec });
                }
                FormatArg::Castable(castable) => {
                    if let ShapeLike::Castable(shape) = castable.shape()? {
                        let format = shape.format(ValueLike::Castable(castable), &spec)?;
                        chunks.extend(format.as_format()?.chunks);
                    } else {
                        let value = Value::cast(castable)?;
                        validate_value_spec(&spec, value.shape())?;
                        chunks.push(Chunk::Arg { value, spec });
                    }
                }
                FormatArg::Format(format) => {
                    if !spec.is_empty() {
                        return Err(HdlError::value_error(format!(
                            "Format specifiers ({}) cannot be used for 'Format' objects",
                            quote(&spec)
                        )));
                    }
                    chunks.extend(format.as_format()?.chunks);
                }
                literal => chunks.push(Chunk::Text(render_literal(literal, &spec)?)),
            }
        }
        binder.finish()?;
        Ok(Format::from_chunks(chunks))
    }

    /// Creates a format that prints `text` verbatim.
    pub fn text(text: impl Into<String>) -> Format {
        Format::from_chunks(vec![Chunk::Text(text.into())])
    }

    pub(crate) fn from_chunks(chunks: Vec<Chunk>) -> Format {
        let mut cleaned: Vec<Chunk> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match (cleaned.last_mut(), chunk) {
                (_, Chunk::Text(text)) if text.is_empty() => {}
                (Some(Chunk::Text(last)), Chunk::Text(text)) => last.push_str(&text),
                (_, chunk) => cleaned.push(chunk),
            }
        }
        Format { chunks: cleaned }
    }

    /// Returns the compiled chunks; adjacent text is always merged.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Returns the value arguments in order.
    pub fn args(&self) -> impl Iterator<Item = &Value> {
        self.chunks.iter().filter_map(|chunk| match chunk {
            Chunk::Arg { value, .. } => Some(value),
            Chunk::Text(_) => None,
        })
    }

    /// Returns the template with every argument reduced to its specifier.
    pub fn template(&self) -> String {
        let mut out = String::new();
        for chunk in &self.chunks {
            match chunk {
                Chunk::Text(text) => out.push_str(&text.replace('{', "{{").replace('}', "}}")),
                Chunk::Arg { spec, .. } if spec.is_empty() => out.push_str("{}"),
                Chunk::Arg { spec, .. } => {
                    out.push_str("{:");
                    out.push_str(spec);
                    out.push('}');
                }
            }
        }
        out
    }
}

impl ops::Add for Format {
    type Output = Format;

    fn add(mut self, rhs: Format) -> Format {
        self.chunks.extend(rhs.chunks);
        Format::from_chunks(self.chunks)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(format {}", quote(&self.template()))?;
        for value in self.args() {
            write!(f, " {value}")?;
        }
        f.write_str(")")
    }
}
