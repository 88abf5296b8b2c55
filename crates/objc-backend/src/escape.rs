// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Literal and comment escaping for generated ObjC text

use objc_ir::ConstantValue;
use std::fmt::Write;

/// `@"..."` literal. Non-ASCII characters become universal character names.
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 3);
    out.push_str("@\"");
    for c in s.chars() {
        match c {
            c if c.is_ascii() => push_ascii(&mut out, c),
            c if (c as u32) <= 0xffff => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push('"');
    out
}

/// Plain C string literal; non-ASCII characters are written as their
/// UTF-8 bytes in octal.
pub fn c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c.is_ascii() {
            push_ascii(&mut out, c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out.push('"');
    out
}

fn push_ascii(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        // `??x` would be read as a trigraph
        '?' if out.ends_with('?') => out.push_str("\\?"),
        c if c < ' ' || c == '\x7f' => {
            let _ = write!(out, "\\{:03o}", c as u32);
        }
        c => out.push(c),
    }
}

/// A UTF-16 code unit
pub fn char_literal(c: u16) -> String {
    match c {
        0x27 => "'\\''".to_string(),
        0x5c => "'\\\\'".to_string(),
        0x20..=0x7e => format!("'{}'", c as u8 as char),
        _ => format!("0x{:04x}", c),
    }
}

/// The minimum values have no literal of their own type in C
pub fn int_literal(v: i32) -> String {
    if v == i32::MIN {
        "((int32_t) 0x80000000)".to_string()
    } else {
        v.to_string()
    }
}

pub fn long_literal(v: i64) -> String {
    if v == i64::MIN {
        "((int64_t) 0x8000000000000000LL)".to_string()
    } else {
        format!("{}LL", v)
    }
}

pub fn float_literal(v: f32) -> String {
    if v.is_nan() {
        "NAN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "INFINITY" } else { "-INFINITY" }.to_string()
    } else {
        // Debug output always has a fraction or an exponent.
        format!("{:?}f", v)
    }
}

pub fn double_literal(v: f64) -> String {
    if v.is_nan() {
        "NAN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "INFINITY" } else { "-INFINITY" }.to_string()
    } else {
        format!("{:?}", v)
    }
}

pub fn constant(value: &ConstantValue) -> String {
    match value {
        ConstantValue::Bool(v) => v.to_string(),
        ConstantValue::Char(v) => char_literal(*v),
        ConstantValue::Int(v) => int_literal(*v),
        ConstantValue::Long(v) => long_literal(*v),
        ConstantValue::Float(v) => float_literal(*v),
        ConstantValue::Double(v) => double_literal(*v),
        ConstantValue::String(v) => string_literal(v),
        ConstantValue::Nil => "nil".to_string(),
    }
}

/// Text placed in a `//` comment
pub fn comment_line(s: &str) -> String {
    s.replace(['\n', '\r'], " ")
}

/// Any name as a C identifier (include guards of combined artifacts)
pub fn c_identifier(s: &str) -> String {
    let mut out: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literals() {
        assert_eq!(string_literal("a\"b\\c\n"), r#"@"a\"b\\c\n""#);
        assert_eq!(string_literal("caf\u{e9}"), r#"@"caf\u00e9""#);
        assert_eq!(string_literal("\u{1F600}"), r#"@"\U0001f600""#);
        assert_eq!(string_literal("\u{1}"), r#"@"\001""#);
        assert_eq!(string_literal("??="), r#"@"?\?=""#);
        assert_eq!(c_string("\u{e9}"), r#""\303\251""#);
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(int_literal(i32::MIN), "((int32_t) 0x80000000)");
        assert_eq!(int_literal(-7), "-7");
        assert_eq!(long_literal(5), "5LL");
        assert_eq!(float_literal(1.0), "1.0f");
        assert_eq!(float_literal(f32::NAN), "NAN");
        assert_eq!(double_literal(f64::NEG_INFINITY), "-INFINITY");
        assert_eq!(double_literal(1e300), "1e300");
        assert_eq!(char_literal(0x41), "'A'");
        assert_eq!(char_literal(0x27), "'\\''");
        assert_eq!(char_literal(0x4e2d), "0x4e2d");
    }

    #[test]
    fn identifiers_and_comments() {
        assert_eq!(c_identifier("my-lib.all"), "my_lib_all");
        assert_eq!(c_identifier("3rd"), "_3rd");
        assert_eq!(comment_line("a\nb"), "a b");
    }
}
