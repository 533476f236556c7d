//! Per-field validation rules.
//!
//! Validation never mutates anything: it turns proposed textual input into a
//! normalized typed value or a typed error, and the session applies the
//! value only on success. That makes every field edit an atomic
//! transaction — on rejection the previous value was simply never touched.

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::literal;
use crate::save::Card;

use super::card_catalog::CardCatalog;

/// Whether the card being edited already lives in the save. The game's
/// add-card flow only offers bag positions from 2 up; cards already placed
/// by the game may sit anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditContext {
    ExistingCard,
    NewCard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Bool(bool),
    Str(String),
    Mapping(Map<String, Value>),
    Sequence(Vec<Value>),
}

pub fn validate_card_field(
    catalog: &CardCatalog,
    card: &Card,
    field: &str,
    input: &str,
    context: EditContext,
) -> Result<FieldValue, CoreError> {
    match field {
        "count" => {
            let count = parse_int(field, input)?;
            if count < 1 {
                return Err(CoreError::range(format!(
                    "count must be at least 1, got {count}"
                )));
            }
            if count != 1 && !catalog.is_stackable(card.id) {
                return Err(CoreError::business_rule(format!(
                    "card id {} is not stackable; count must stay 1",
                    card.id
                )));
            }
            Ok(FieldValue::Int(count))
        }
        "life" => {
            let life = parse_int(field, input)?;
            if life < 0 {
                return Err(CoreError::range(format!(
                    "life must not be negative, got {life}"
                )));
            }
            Ok(FieldValue::Int(life))
        }
        "rareup" => {
            let rareup = parse_int(field, input)?;
            if !(0..=3).contains(&rareup) {
                return Err(CoreError::range(format!(
                    "rareup must be in 0..=3, got {rareup}"
                )));
            }
            Ok(FieldValue::Int(rareup))
        }
        "bag" => {
            let bag = parse_int(field, input)?;
            if !(0..=3).contains(&bag) {
                return Err(CoreError::range(format!(
                    "bag must be one of 0/1/2/3, got {bag}"
                )));
            }
            Ok(FieldValue::Int(bag))
        }
        "bagpos" => {
            let bagpos = parse_int(field, input)?;
            let min = match context {
                EditContext::ExistingCard => 0,
                EditContext::NewCard => 2,
            };
            if bagpos < min {
                return Err(CoreError::range(format!(
                    "bagpos must be at least {min}, got {bagpos}"
                )));
            }
            Ok(FieldValue::Int(bagpos))
        }
        "tag" => Ok(FieldValue::Mapping(literal::parse_mapping(input)?)),
        "equip_slots" | "equips" => Ok(FieldValue::Sequence(literal::parse_sequence(input)?)),
        "custom_name" | "custom_text" => Ok(FieldValue::Str(input.to_string())),
        other => Err(CoreError::unsupported(format!(
            "unknown card field {other:?}"
        ))),
    }
}

pub fn validate_rite_field(field: &str, input: &str) -> Result<FieldValue, CoreError> {
    match field {
        "new_born" | "is_show" | "start" => Ok(FieldValue::Bool(parse_bool(field, input)?)),
        "start_round" | "start_life" | "life" => Ok(FieldValue::Int(parse_int(field, input)?)),
        "custom_name" => Ok(FieldValue::Str(input.to_string())),
        other => Err(CoreError::unsupported(format!(
            "unknown rite field {other:?}"
        ))),
    }
}

/// A targeted edit of an unmodeled top-level value: the replacement must
/// keep the JSON kind of what it replaces.
pub fn validate_raw_edit(key: &str, existing: &Value, input: &str) -> Result<Value, CoreError> {
    let proposed = literal::parse_value(input)?;
    let have = JsonKind::of(existing);
    let want = JsonKind::of(&proposed);
    if have != want {
        return Err(CoreError::type_mismatch(format!(
            "{key} holds {}, refusing to replace it with {}",
            literal::kind_name(existing),
            literal::kind_name(&proposed)
        )));
    }
    Ok(proposed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Sequence,
    Mapping,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_f64() => Self::Float,
            Value::Number(_) => Self::Int,
            Value::String(_) => Self::Str,
            Value::Array(_) => Self::Sequence,
            Value::Object(_) => Self::Mapping,
        }
    }
}

fn parse_int(field: &str, input: &str) -> Result<i64, CoreError> {
    input.trim().parse().map_err(|_| {
        CoreError::type_mismatch(format!("{field} expects an integer, got {input:?}"))
    })
}

fn parse_bool(field: &str, input: &str) -> Result<bool, CoreError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(CoreError::type_mismatch(format!(
            "{field} expects true or false, got {input:?}"
        )))
    }
}
