//! Typed view of the on-disk save JSON.
//!
//! Only fields the editor actively validates are modeled; every other
//! top-level key is held verbatim and re-emitted on serialize. The original
//! top-level key order is captured at parse time and replayed at serialize
//! time so that repeated saves are byte-identical and diffs against the
//! game's own output stay minimal.

pub mod card;
pub mod note;
pub mod rite;
pub mod time;

use serde_json::{Map, Value};

use crate::error::CoreError;

pub use card::Card;
pub use note::NoteItem;
pub use rite::Rite;
pub use time::SaveTime;

const MODELED_KEYS: [&str; 13] = [
    "configId",
    "configVersion",
    "name",
    "difficulty",
    "round",
    "saveTime",
    "card_uid_index",
    "rite_uid_index",
    "cards",
    "rites",
    "notes",
    "sudan_pool_cards",
    "sudan_card_pool",
];

/// Aggregate root for one loaded save file.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveConfig {
    pub config_id: i64,
    pub config_version: Option<i64>,
    pub name: Option<String>,
    pub difficulty: Option<i64>,
    pub round: Option<i64>,
    pub save_time: Option<SaveTime>,
    pub card_uid_index: Option<i64>,
    pub rite_uid_index: Option<i64>,
    pub cards: Vec<Card>,
    rites: Option<Vec<Rite>>,
    notes: Option<Vec<Vec<NoteItem>>>,
    sudan_pool_cards: Option<Vec<i64>>,
    sudan_card_pool: Option<Vec<Card>>,
    extra: Map<String, Value>,
    key_order: Vec<String>,
}

impl SaveConfig {
    pub fn parse(raw: &Value) -> Result<Self, CoreError> {
        let map = require_object(raw, "save")?;
        let key_order: Vec<String> = map.keys().cloned().collect();

        let config_id = require_i64(map, "configId", "save")?;

        let cards_raw = map
            .get("cards")
            .ok_or_else(|| CoreError::malformed("save.cards is required"))?;
        let Value::Array(cards_raw) = cards_raw else {
            return Err(CoreError::malformed(format!(
                "save.cards must be a sequence, got {}",
                crate::literal::kind_name(cards_raw)
            )));
        };
        let mut cards = Vec::with_capacity(cards_raw.len());
        for (i, raw_card) in cards_raw.iter().enumerate() {
            cards.push(Card::parse(raw_card, &format!("cards[{i}]"))?);
        }

        let rites = match map.get("rites") {
            None => None,
            Some(Value::Array(raw_rites)) => {
                let mut out = Vec::with_capacity(raw_rites.len());
                for (i, raw_rite) in raw_rites.iter().enumerate() {
                    out.push(Rite::parse(raw_rite, &format!("rites[{i}]"))?);
                }
                Some(out)
            }
            Some(other) => {
                return Err(CoreError::malformed(format!(
                    "save.rites must be a sequence, got {}",
                    crate::literal::kind_name(other)
                )));
            }
        };

        let notes = match map.get("notes") {
            None => None,
            Some(Value::Array(groups)) => {
                let mut out = Vec::with_capacity(groups.len());
                for (g, group) in groups.iter().enumerate() {
                    let Value::Array(items) = group else {
                        return Err(CoreError::malformed(format!(
                            "save.notes[{g}] must be a sequence"
                        )));
                    };
                    let mut parsed = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        parsed.push(NoteItem::parse(item, &format!("notes[{g}][{i}]"))?);
                    }
                    out.push(parsed);
                }
                Some(out)
            }
            Some(other) => {
                return Err(CoreError::malformed(format!(
                    "save.notes must be a sequence, got {}",
                    crate::literal::kind_name(other)
                )));
            }
        };

        let sudan_pool_cards = match map.get("sudan_pool_cards") {
            None => None,
            Some(Value::Array(ids)) => {
                let mut out = Vec::with_capacity(ids.len());
                for (i, id) in ids.iter().enumerate() {
                    out.push(id.as_i64().ok_or_else(|| {
                        CoreError::malformed(format!(
                            "save.sudan_pool_cards[{i}] must be an integer"
                        ))
                    })?);
                }
                Some(out)
            }
            Some(other) => {
                return Err(CoreError::malformed(format!(
                    "save.sudan_pool_cards must be a sequence, got {}",
                    crate::literal::kind_name(other)
                )));
            }
        };

        let sudan_card_pool = match map.get("sudan_card_pool") {
            None => None,
            Some(Value::Array(raw_pool)) => {
                let mut out = Vec::with_capacity(raw_pool.len());
                for (i, raw_card) in raw_pool.iter().enumerate() {
                    out.push(Card::parse(raw_card, &format!("sudan_card_pool[{i}]"))?);
                }
                Some(out)
            }
            Some(other) => {
                return Err(CoreError::malformed(format!(
                    "save.sudan_card_pool must be a sequence, got {}",
                    crate::literal::kind_name(other)
                )));
            }
        };

        let save_time = match map.get("saveTime") {
            None => None,
            Some(Value::String(text)) => Some(SaveTime::parse(text)?),
            Some(other) => {
                return Err(CoreError::malformed(format!(
                    "save.saveTime must be a string, got {}",
                    crate::literal::kind_name(other)
                )));
            }
        };

        let mut extra = Map::new();
        for (key, value) in map {
            if !MODELED_KEYS.contains(&key.as_str()) {
                extra.insert(key.clone(), value.clone());
            }
        }

        Ok(Self {
            config_id,
            config_version: opt_i64(map, "configVersion", "save")?,
            name: opt_str(map, "name", "save")?,
            difficulty: opt_i64(map, "difficulty", "save")?,
            round: opt_i64(map, "round", "save")?,
            save_time,
            card_uid_index: opt_i64(map, "card_uid_index", "save")?,
            rite_uid_index: opt_i64(map, "rite_uid_index", "save")?,
            cards,
            rites,
            notes,
            sudan_pool_cards,
            sudan_card_pool,
            extra,
            key_order,
        })
    }

    /// Exact inverse of [`SaveConfig::parse`] up to key order and the
    /// documented `saveTime` tolerance.
    pub fn serialize(&self) -> Value {
        let mut map = Map::new();

        for key in &self.key_order {
            if let Some(value) = self.modeled_value(key) {
                map.insert(key.clone(), value);
            } else if let Some(value) = self.extra.get(key) {
                map.insert(key.clone(), value.clone());
            }
        }

        // Keys materialized after load land at the end, modeled ones first.
        for key in MODELED_KEYS {
            if !map.contains_key(key)
                && let Some(value) = self.modeled_value(key)
            {
                map.insert(key.to_string(), value);
            }
        }
        for (key, value) in &self.extra {
            if !map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }

        Value::Object(map)
    }

    fn modeled_value(&self, key: &str) -> Option<Value> {
        match key {
            "configId" => Some(self.config_id.into()),
            "configVersion" => self.config_version.map(Value::from),
            "name" => self.name.clone().map(Value::String),
            "difficulty" => self.difficulty.map(Value::from),
            "round" => self.round.map(Value::from),
            "saveTime" => self.save_time.map(|t| Value::String(t.format())),
            "card_uid_index" => self.card_uid_index.map(Value::from),
            "rite_uid_index" => self.rite_uid_index.map(Value::from),
            "cards" => Some(Value::Array(
                self.cards.iter().map(Card::serialize).collect(),
            )),
            "rites" => self.rites.as_ref().map(|rites| {
                Value::Array(rites.iter().map(Rite::serialize).collect())
            }),
            "notes" => self.notes.as_ref().map(|groups| {
                Value::Array(
                    groups
                        .iter()
                        .map(|group| {
                            Value::Array(group.iter().map(NoteItem::serialize).collect())
                        })
                        .collect(),
                )
            }),
            "sudan_pool_cards" => self.sudan_pool_cards.as_ref().map(|ids| {
                Value::Array(ids.iter().map(|&id| Value::from(id)).collect())
            }),
            "sudan_card_pool" => self.sudan_card_pool.as_ref().map(|pool| {
                Value::Array(pool.iter().map(Card::serialize).collect())
            }),
            _ => None,
        }
    }

    pub fn is_modeled_key(key: &str) -> bool {
        MODELED_KEYS.contains(&key)
    }

    pub fn rites(&self) -> &[Rite] {
        self.rites.as_deref().unwrap_or(&[])
    }

    pub fn rites_mut(&mut self) -> &mut Vec<Rite> {
        self.rites.get_or_insert_with(Vec::new)
    }

    pub fn notes(&self) -> &[Vec<NoteItem>] {
        self.notes.as_deref().unwrap_or(&[])
    }

    pub fn sudan_pool_cards(&self) -> &[i64] {
        self.sudan_pool_cards.as_deref().unwrap_or(&[])
    }

    pub fn sudan_pool_cards_mut(&mut self) -> &mut Vec<i64> {
        self.sudan_pool_cards.get_or_insert_with(Vec::new)
    }

    pub fn sudan_card_pool(&self) -> &[Card] {
        self.sudan_card_pool.as_deref().unwrap_or(&[])
    }

    pub fn card_index(&self, uid: i64) -> Option<usize> {
        self.cards.iter().position(|card| card.uid == uid)
    }

    pub fn find_card(&self, uid: i64) -> Option<&Card> {
        self.cards.iter().find(|card| card.uid == uid)
    }

    pub fn find_card_mut(&mut self, uid: i64) -> Option<&mut Card> {
        self.cards.iter_mut().find(|card| card.uid == uid)
    }

    pub fn rite_index(&self, uid: i64) -> Option<usize> {
        self.rites().iter().position(|rite| rite.uid == uid)
    }

    pub fn max_card_uid(&self) -> Option<i64> {
        self.cards.iter().map(|card| card.uid).max()
    }

    /// Hands out the next card uid and advances the counter, keeping
    /// `card_uid_index` strictly greater than every live uid even if the
    /// loaded save violated that.
    pub fn allocate_card_uid(&mut self) -> i64 {
        let floor = self.max_card_uid().map_or(0, |max| max + 1);
        let next = self.card_uid_index.unwrap_or(floor).max(floor);
        self.card_uid_index = Some(next + 1);
        next
    }

    pub fn allocate_rite_uid(&mut self) -> i64 {
        let floor = self
            .rites()
            .iter()
            .map(|rite| rite.uid)
            .max()
            .map_or(0, |max| max + 1);
        let next = self.rite_uid_index.unwrap_or(floor).max(floor);
        self.rite_uid_index = Some(next + 1);
        next
    }

    /// Unmodeled top-level value, verbatim as loaded.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn raw_keys(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }

    pub(crate) fn set_raw_value(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_string(), value);
    }
}

pub(crate) fn require_object<'a>(
    value: &'a Value,
    context: &str,
) -> Result<&'a Map<String, Value>, CoreError> {
    value.as_object().ok_or_else(|| {
        CoreError::malformed(format!(
            "{context} must be a mapping, got {}",
            crate::literal::kind_name(value)
        ))
    })
}

pub(crate) fn require_i64(
    map: &Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<i64, CoreError> {
    let value = map
        .get(key)
        .ok_or_else(|| CoreError::malformed(format!("{context}.{key} is required")))?;
    value.as_i64().ok_or_else(|| {
        CoreError::malformed(format!(
            "{context}.{key} must be an integer, got {}",
            crate::literal::kind_name(value)
        ))
    })
}

pub(crate) fn opt_i64(
    map: &Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<Option<i64>, CoreError> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            CoreError::malformed(format!(
                "{context}.{key} must be an integer, got {}",
                crate::literal::kind_name(value)
            ))
        }),
    }
}

pub(crate) fn opt_bool(
    map: &Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<Option<bool>, CoreError> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value.as_bool().map(Some).ok_or_else(|| {
            CoreError::malformed(format!(
                "{context}.{key} must be a boolean, got {}",
                crate::literal::kind_name(value)
            ))
        }),
    }
}

pub(crate) fn opt_str(
    map: &Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<Option<String>, CoreError> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| {
                CoreError::malformed(format!(
                    "{context}.{key} must be a string, got {}",
                    crate::literal::kind_name(value)
                ))
            }),
    }
}

pub(crate) fn opt_object(
    map: &Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<Option<Map<String, Value>>, CoreError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Object(inner)) => Ok(Some(inner.clone())),
        Some(other) => Err(CoreError::malformed(format!(
            "{context}.{key} must be a mapping, got {}",
            crate::literal::kind_name(other)
        ))),
    }
}

pub(crate) fn opt_array(
    map: &Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<Option<Vec<Value>>, CoreError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.clone())),
        Some(other) => Err(CoreError::malformed(format!(
            "{context}.{key} must be a sequence, got {}",
            crate::literal::kind_name(other)
        ))),
    }
}
