//! Lenient parsing of user-entered container literals.
//!
//! Saves edited by hand (and the editor generations before this one) carry
//! mapping/sequence text in the single-quoted convention (`{'own': 1}`,
//! `['weapon']`, bare `True`/`False`/`None`) alongside strict JSON. Input is
//! normalized token by token into strict JSON and handed to `serde_json`;
//! nothing is ever evaluated as an expression.

use serde_json::{Map, Value};

use crate::error::CoreError;

/// Parse a container literal, strict JSON first, then the single-quoted form.
pub fn parse_value(text: &str) -> Result<Value, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoreError::type_mismatch(
            "empty input, expected a mapping or sequence literal",
        ));
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let normalized = normalize(trimmed)?;
    serde_json::from_str(&normalized).map_err(|e| {
        CoreError::type_mismatch(format!("not a well-formed container literal: {e}"))
    })
}

/// Parse text that must denote a mapping; anything else is a type mismatch.
pub fn parse_mapping(text: &str) -> Result<Map<String, Value>, CoreError> {
    match parse_value(text)? {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::type_mismatch(format!(
            "expected a mapping, got {}",
            kind_name(&other)
        ))),
    }
}

/// Parse text that must denote an ordered sequence.
pub fn parse_sequence(text: &str) -> Result<Vec<Value>, CoreError> {
    match parse_value(text)? {
        Value::Array(items) => Ok(items),
        other => Err(CoreError::type_mismatch(format!(
            "expected a sequence, got {}",
            kind_name(&other)
        ))),
    }
}

pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a float",
        Value::Number(_) => "an integer",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn normalize(input: &str) -> Result<String, CoreError> {
    let mut out = String::with_capacity(input.len() + 8);
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                out.push('"');
                loop {
                    let Some(inner) = chars.next() else {
                        return Err(unterminated());
                    };
                    match inner {
                        '\'' => {
                            out.push('"');
                            break;
                        }
                        '\\' => {
                            let Some(escaped) = chars.next() else {
                                return Err(unterminated());
                            };
                            match escaped {
                                // \' is an escape in the single-quoted form
                                // but not in JSON
                                '\'' => out.push('\''),
                                '"' => out.push_str("\\\""),
                                other => {
                                    out.push('\\');
                                    out.push(other);
                                }
                            }
                        }
                        '"' => out.push_str("\\\""),
                        other => out.push(other),
                    }
                }
            }
            '"' => {
                out.push('"');
                loop {
                    let Some(inner) = chars.next() else {
                        return Err(unterminated());
                    };
                    out.push(inner);
                    match inner {
                        '\\' => {
                            let Some(escaped) = chars.next() else {
                                return Err(unterminated());
                            };
                            out.push(escaped);
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                word.push(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    "None" => out.push_str("null"),
                    _ => out.push_str(&word),
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

fn unterminated() -> CoreError {
    CoreError::type_mismatch("unterminated string in container literal")
}
