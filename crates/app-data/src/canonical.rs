//! Deterministic JSON encoding of app data documents.
//!
//! The order book recomputes the app data hash from the document string it
//! receives, so every client has to produce the exact same bytes for the same
//! logical document. The encoding is compact JSON with object keys sorted at
//! every nesting level (UTF-16 code unit order, like `JSON.stringify` based
//! implementations) while arrays keep their order.

use {
    serde::Serialize,
    serde_json::{Map, Number, Value},
    std::{cmp::Ordering, fmt::Write as _},
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CanonicalError {
    #[error("number at {path} is not an integer")]
    NonIntegralNumber { path: String },
    #[error("number at {path} is out of the representable integer range")]
    NumberOutOfRange { path: String },
    #[error("document is not representable as json: {0}")]
    Json(String),
}

/// Encodes the value deterministically.
pub fn to_canonical_string(value: &Value) -> Result<String, CanonicalError> {
    let mut out = String::new();
    write_value(&mut out, value, &mut String::new())?;
    Ok(out)
}

/// Converts `value` to json and encodes it deterministically.
pub fn to_canonical_string_from<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let value = serde_json::to_value(value).map_err(|err| CanonicalError::Json(err.to_string()))?;
    to_canonical_string(&value)
}

fn write_value(out: &mut String, value: &Value, path: &mut String) -> Result<(), CanonicalError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, n, path)?,
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let len = path.len();
                let _ = write!(path, "[{i}]");
                write_value(out, item, path)?;
                path.truncate(len);
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map, path)?,
    }
    Ok(())
}

fn write_object(
    out: &mut String,
    map: &Map<String, Value>,
    path: &mut String,
) -> Result<(), CanonicalError> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| utf16_cmp(a, b));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, key);
        out.push(':');
        let len = path.len();
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(key);
        write_value(out, value, path)?;
        path.truncate(len);
    }
    out.push('}');
    Ok(())
}

fn write_number(out: &mut String, n: &Number, path: &str) -> Result<(), CanonicalError> {
    if let Some(u) = n.as_u64() {
        let _ = write!(out, "{u}");
        return Ok(());
    }
    if let Some(i) = n.as_i64() {
        let _ = write!(out, "{i}");
        return Ok(());
    }
    let path = if path.is_empty() { "<root>" } else { path };
    let f = n.as_f64().ok_or_else(|| CanonicalError::NumberOutOfRange {
        path: path.to_owned(),
    })?;
    if f.fract() != 0.0 || !f.is_finite() {
        return Err(CanonicalError::NonIntegralNumber {
            path: path.to_owned(),
        });
    }
    // Integral floats are normalised to their integer form; beyond 2^63 the
    // value can no longer be written without an exponent.
    if f.abs() >= 9.223_372_036_854_776e18 {
        return Err(CanonicalError::NumberOutOfRange {
            path: path.to_owned(),
        });
    }
    #[allow(clippy::cast_possible_truncation)]
    let _ = write!(out, "{}", f as i64);
    Ok(())
}

/// Escapes the same characters as `JSON.stringify` and `serde_json`.
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn utf16_cmp(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}
