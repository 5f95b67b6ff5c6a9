//! Textual helpers shared by the canonical representations.
//!
//! The canonical form quotes strings the way the front-end language of the
//! toolchain does: single quotes unless the text contains a single quote and
//! no double quote, with backslash escapes for control characters.

use num_bigint::BigInt;

/// Quotes `text` as a string literal.
pub fn quote(text: &str) -> String {
    quote_with(text, false)
}

/// Quotes `text` as a string literal, escaping every non-ASCII character.
pub fn quote_ascii(text: &str) -> String {
    quote_with(text, true)
}

fn quote_with(text: &str, ascii_only: bool) -> String {
    let delim = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(delim);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if ascii_only && !c.is_ascii() => {
                let code = c as u32;
                if code <= 0xff {
                    out.push_str(&format!("\\x{code:02x}"));
                } else if code <= 0xffff {
                    out.push_str(&format!("\\u{code:04x}"));
                } else {
                    out.push_str(&format!("\\U{code:08x}"));
                }
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

/// Renders the low `width` bits of `value` as a binary string, most
/// significant bit first. Negative values use their two's complement.
pub fn to_binary(value: &BigInt, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let modulus = BigInt::from(1) << width;
    let bits = ((value % &modulus) + &modulus) % &modulus;
    format!("{:0>width$}", bits.to_str_radix(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_plain() {
        assert_eq!(quote("abc"), "'abc'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("abc\n"), "'abc\\n'");
        assert_eq!(quote("a\\b"), "'a\\\\b'");
        assert_eq!(quote("\t\x01"), "'\\t\\x01'");
    }

    #[test]
    fn quote_picks_delimiter() {
        assert_eq!(quote("it's"), "\"it's\"");
        assert_eq!(quote("'\""), "'\\'\"'");
    }

    #[test]
    fn quote_ascii_escapes_unicode() {
        assert_eq!(quote_ascii("é"), "'\\xe9'");
        assert_eq!(quote_ascii("λ"), "'\\u03bb'");
        assert_eq!(quote("λ"), "'λ'");
    }

    #[test]
    fn binary_padding() {
        assert_eq!(to_binary(&BigInt::from(10), 8), "00001010");
        assert_eq!(to_binary(&BigInt::from(-10), 8), "11110110");
        assert_eq!(to_binary(&BigInt::from(0), 3), "000");
        assert_eq!(to_binary(&BigInt::from(0), 0), "");
        assert_eq!(to_binary(&BigInt::from(5), 2), "01");
    }
}
