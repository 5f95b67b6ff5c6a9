//! The format specification mini-language.
//!
//! A specifier has the form
//! `[[fill]align][sign][#][0][width][grouping][.precision][type]`. Literal
//! integers and strings are rendered here at construction time; specifiers
//! attached to values are only validated, since the value is rendered by
//! whatever consumes the [`Format`](super::Format).

use crate::error::{HdlError, HdlResult};
use crate::repr::quote;
use crate::shape::Shape;
use num_bigint::{BigInt, Sign};

/// A parsed format specifier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatSpec {
    /// Padding character, if given explicitly.
    pub fill: Option<char>,
    /// One of `<`, `>`, `=` and `^`.
    pub align: Option<char>,
    /// One of `+`, `-` and space.
    pub sign: Option<char>,
    /// The `#` flag.
    pub alternate: bool,
    /// The `0` flag.
    pub zero: bool,
    /// Minimum field width.
    pub width: Option<usize>,
    /// One of `_` and `,`.
    pub grouping: Option<char>,
    /// Digits after `.`.
    pub precision: Option<usize>,
    /// Presentation type.
    pub ty: Option<char>,
}

const ALIGNS: &[char] = &['<', '>', '=', '^'];
const TYPES: &[char] = &[
    'b', 'c', 'd', 'e', 'E', 'f', 'F', 'g', 'G', 'n', 'o', 's', 'x', 'X', '%',
];

impl FormatSpec {
    /// Parses `spec`, returning `None` if it is malformed.
    pub fn parse(spec: &str) -> Option<FormatSpec> {
        let chars: Vec<char> = spec.chars().collect();
        let mut out = FormatSpec::default();
        let mut pos = 0;
        if chars.len() >= 2 && ALIGNS.contains(&chars[1]) {
            out.fill = Some(chars[0]);
            out.align = Some(chars[1]);
            pos = 2;
        } else if chars.first().is_some_and(|c| ALIGNS.contains(c)) {
            out.align = Some(chars[0]);
            pos = 1;
        }
        if let Some(&c @ ('+' | '-' | ' ')) = chars.get(pos) {
            out.sign = Some(c);
            pos += 1;
        }
        if chars.get(pos) == Some(&'#') {
            out.alternate = true;
            pos += 1;
        }
        if chars.get(pos) == Some(&'0') {
            out.zero = true;
            pos += 1;
        }
        let (width, next) = digits(&chars, pos);
        out.width = width;
        pos = next;
        if let Some(&c @ ('_' | ',')) = chars.get(pos) {
            out.grouping = Some(c);
            pos += 1;
        }
        if chars.get(pos) == Some(&'.') {
            let (precision, next) = digits(&chars, pos + 1);
            out.precision = Some(precision?);
            pos = next;
        }
        if let Some(&c) = chars.get(pos) {
            if !TYPES.contains(&c) {
                return None;
            }
            out.ty = Some(c);
            pos += 1;
        }
        (pos == chars.len()).then_some(out)
    }
}

fn digits(chars: &[char], start: usize) -> (Option<usize>, usize) {
    let end = chars[start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(chars.len(), |n| start + n);
    let text: String = chars[start..end].iter().collect();
    (text.parse().ok(), end)
}

fn invalid(spec: &str) -> HdlError {
    HdlError::value_error(format!("Invalid format specifier {}", quote(spec)))
}

/// Checks that `spec` can be used to print a value of `shape`.
pub(crate) fn validate_value_spec(spec: &str, shape: Shape) -> HdlResult<()> {
    let parsed = FormatSpec::parse(spec).ok_or_else(|| invalid(spec))?;
    if parsed.precision.is_some() || parsed.width == Some(0) {
        return Err(invalid(spec));
    }
    if let Some(ty) = parsed.ty {
        if !"bodxXcsn".contains(ty) {
            return Err(invalid(spec));
        }
    }
    if parsed.align == Some('^') {
        return Err(HdlError::value_error("Alignment '^' is not supported"));
    }
    if parsed.grouping == Some(',') {
        return Err(HdlError::value_error("Grouping option ',' is not supported"));
    }
    match parsed.ty {
        Some('n') => Err(HdlError::value_error("Presentation type 'n' is not supported")),
        Some(ty @ ('c' | 's')) => {
            let reject = |what: &str| {
                Err(HdlError::value_error(format!(
                    "{what} with format specifier '{ty}'"
                )))
            };
            if shape.signed() {
                return reject("Cannot print signed value");
            }
            if parsed.align == Some('=') {
                return reject("Alignment '=' is not allowed");
            }
            if parsed.sign.is_some() {
                return reject("Sign is not allowed");
            }
            if parsed.zero {
                return reject("Zero fill is not allowed");
            }
            if parsed.alternate {
                return reject("Alternate form is not allowed");
            }
            if parsed.grouping == Some('_') {
                return reject("Cannot specify '_'");
            }
            if shape.width() % 8 != 0 {
                return reject("Value width must be divisible by 8");
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn pad(prefix: &str, body: &str, fill: char, align: char, width: Option<usize>) -> String {
    let len = prefix.chars().count() + body.chars().count();
    let missing = width.unwrap_or(0).saturating_sub(len);
    let fill_str = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
    match align {
        '<' => format!("{prefix}{body}{}", fill_str(missing)),
        '^' => {
            let left = missing / 2;
            format!("{}{prefix}{body}{}", fill_str(left), fill_str(missing - left))
        }
        '=' => format!("{prefix}{}{body}", fill_str(missing)),
        _ => format!("{}{prefix}{body}", fill_str(missing)),
    }
}

fn group(digits: &str, separator: char, interval: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / interval);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % interval == 0 {
            out.push(separator);
        }
        out.push(*c);
    }
    out
}

/// Renders an integer literal with `spec`.
pub(crate) fn format_int(value: &BigInt, spec: &str) -> HdlResult<String> {
    let parsed = FormatSpec::parse(spec).ok_or_else(|| invalid(spec))?;
    let ty = parsed.ty.unwrap_or('d');
    if parsed.precision.is_some() {
        return Err(HdlError::value_error(
            "Precision not allowed in integer format specifier",
        ));
    }
    let (radix, prefix) = match ty {
        'd' | 'n' => (10, ""),
        'b' => (2, "0b"),
        'o' => (8, "0o"),
        'x' => (16, "0x"),
        'X' => (16, "0X"),
        'c' => (0, ""),
        other => {
            return Err(HdlError::value_error(format!(
                "Unknown format code '{other}' for object of type 'int'"
            )))
        }
    };
    if let Some(grouping) = parsed.grouping {
        if radix != 10 && (grouping == ',' || radix == 0) {
            return Err(HdlError::value_error(format!(
                "Cannot specify '{grouping}' with '{ty}'."
            )));
        }
    }
    let negative = value.sign() == Sign::Minus;
    let body = if radix == 0 {
        if parsed.sign.is_some() {
            return Err(HdlError::value_error(
                "Sign not allowed with integer format specifier 'c'",
            ));
        }
        if parsed.alternate {
            return Err(HdlError::value_error(
                "Alternate form (#) not allowed with integer format specifier 'c'",
            ));
        }
        let ch = u32::try_from(value)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| HdlError::value_error("%c arg not in range(0x110000)"))?;
        ch.to_string()
    } else {
        let magnitude = if negative { -value } else { value.clone() };
        let mut digits = magnitude.to_str_radix(radix);
        if ty == 'X' {
            digits.make_ascii_uppercase();
        }
        match parsed.grouping {
            Some(separator) => group(&digits, separator, if radix == 10 { 3 } else { 4 }),
            None => digits,
        }
    };
    let sign = match (negative, parsed.sign) {
        (true, _) => "-",
        (false, Some('+')) => "+",
        (false, Some(' ')) => " ",
        _ => "",
    };
    let prefix = format!("{sign}{}", if parsed.alternate { prefix } else { "" });
    let (fill, align) = match (parsed.zero, parsed.align) {
        (true, None) => ('0', '='),
        (_, align) => (parsed.fill.unwrap_or(' '), align.unwrap_or('>')),
    };
    Ok(pad(&prefix, &body, fill, align, parsed.width))
}

/// Renders a string literal with `spec`.
pub(crate) fn format_str(text: &str, spec: &str) -> HdlResult<String> {
    let parsed = FormatSpec::parse(spec).ok_or_else(|| invalid(spec))?;
    match parsed.ty {
        None | Some('s') => {}
        Some(other) => {
            return Err(HdlError::value_error(format!(
                "Unknown format code '{other}' for object of type 'str'"
            )))
        }
    }
    if parsed.sign.is_some() {
        return Err(HdlError::value_error("Sign not allowed in string format specifier"));
    }
    if parsed.alternate {
        return Err(HdlError::value_error(
            "Alternate form (#) not allowed in string format specifier",
        ));
    }
    if parsed.align == Some('=') {
        return Err(HdlError::value_error(
            "'=' alignment not allowed in string format specifier",
        ));
    }
    if let Some(grouping) = parsed.grouping {
        return Err(HdlError::value_error(format!(
            "Cannot specify '{grouping}' with 's'."
        )));
    }
    let body: String = match parsed.precision {
        Some(n) => text.chars().take(n).collect(),
        None => text.to_owned(),
    };
    let fill = parsed.fill.unwrap_or(if parsed.zero { '0' } else { ' ' });
    Ok(pad("", &body, fill, parsed.align.unwrap_or('<'), parsed.width))
}
