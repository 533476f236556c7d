use serde_json::{Map, Value};

use crate::error::CoreError;

use super::card::Card;
use super::{opt_bool, opt_i64, opt_str, require_i64, require_object};

const MODELED_KEYS: [&str; 10] = [
    "uid",
    "id",
    "new_born",
    "is_show",
    "start",
    "start_round",
    "start_life",
    "life",
    "cards",
    "custom_name",
];

/// One in-progress or scheduled rite. Card slots may be empty (`null`).
#[derive(Debug, Clone, PartialEq)]
pub struct Rite {
    pub uid: i64,
    pub id: i64,
    pub new_born: bool,
    pub is_show: bool,
    pub start: bool,
    pub start_round: i64,
    pub start_life: i64,
    pub life: i64,
    pub cards: Vec<Option<Card>>,
    pub custom_name: String,
    extra: Map<String, Value>,
}

impl Rite {
    pub fn with_defaults(uid: i64, id: i64) -> Self {
        Self {
            uid,
            id,
            new_born: false,
            is_show: true,
            start: false,
            start_round: 0,
            start_life: 0,
            life: 0,
            cards: Vec::new(),
            custom_name: String::new(),
            extra: Map::new(),
        }
    }

    pub fn parse(raw: &Value, context: &str) -> Result<Self, CoreError> {
        let map = require_object(raw, context)?;

        let uid = require_i64(map, "uid", context)?;
        let id = require_i64(map, "id", context)?;

        let cards = match map.get("cards") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(slots)) => {
                let mut out = Vec::with_capacity(slots.len());
                for (i, slot) in slots.iter().enumerate() {
                    match slot {
                        Value::Null => out.push(None),
                        other => out.push(Some(Card::parse(
                            other,
                            &format!("{context}.cards[{i}]"),
                        )?)),
                    }
                }
                out
            }
            Some(other) => {
                return Err(CoreError::malformed(format!(
                    "{context}.cards must be a sequence, got {}",
                    crate::literal::kind_name(other)
                )));
            }
        };

        let mut rite = Self {
            uid,
            id,
            new_born: opt_bool(map, "new_born", context)?.unwrap_or(false),
            is_show: opt_bool(map, "is_show", context)?.unwrap_or(true),
            start: opt_bool(map, "start", context)?.unwrap_or(false),
            start_round: opt_i64(map, "start_round", context)?.unwrap_or(0),
            start_life: opt_i64(map, "start_life", context)?.unwrap_or(0),
            life: opt_i64(map, "life", context)?.unwrap_or(0),
            cards,
            custom_name: opt_str(map, "custom_name", context)?.unwrap_or_default(),
            extra: Map::new(),
        };

        for (key, value) in map {
            if !MODELED_KEYS.contains(&key.as_str()) {
                rite.extra.insert(key.clone(), value.clone());
            }
        }

        Ok(rite)
    }

    pub fn serialize(&self) -> Value {
        let mut map = Map::new();
        map.insert("uid".into(), self.uid.into());
        map.insert("id".into(), self.id.into());
        map.insert("new_born".into(), self.new_born.into());
        map.insert("is_show".into(), self.is_show.into());
        map.insert("start".into(), self.start.into());
        map.insert("start_round".into(), self.start_round.into());
        map.insert("start_life".into(), self.start_life.into());
        map.insert("life".into(), self.life.into());
        map.insert(
            "cards".into(),
            Value::Array(
                self.cards
                    .iter()
                    .map(|slot| match slot {
                        Some(card) => card.serialize(),
                        None => Value::Null,
                    })
                    .collect(),
            ),
        );
        map.insert("custom_name".into(), self.custom_name.clone().into());
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}
