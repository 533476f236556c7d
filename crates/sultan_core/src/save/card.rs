use serde_json::{Map, Value};

use crate::error::CoreError;

use super::{opt_array, opt_i64, opt_object, opt_str, require_i64, require_object};

pub const SUDAN_POOL_INDEX_TAG: &str = "sudan_pool_index";

const MODELED_KEYS: [&str; 12] = [
    "uid",
    "id",
    "count",
    "life",
    "rareup",
    "tag",
    "equip_slots",
    "equips",
    "bag",
    "bagpos",
    "custom_name",
    "custom_text",
];

/// One card instance. `uid` distinguishes the instance from its catalog
/// definition (`id`); `id == -1` means the catalog knows nothing about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub uid: i64,
    pub id: i64,
    pub count: i64,
    pub life: i64,
    pub rareup: i64,
    pub tag: Map<String, Value>,
    pub equip_slots: Vec<Value>,
    pub equips: Vec<Value>,
    pub bag: i64,
    pub bagpos: i64,
    pub custom_name: String,
    pub custom_text: String,
    extra: Map<String, Value>,
}

impl Card {
    /// Starting state of an editor-created card. `bagpos` 2 is the first
    /// bag slot the game allows new cards to occupy.
    pub fn with_defaults(uid: i64, id: i64) -> Self {
        Self {
            uid,
            id,
            count: 1,
            life: 0,
            rareup: 0,
            tag: Map::new(),
            equip_slots: Vec::new(),
            equips: Vec::new(),
            bag: 0,
            bagpos: 2,
            custom_name: String::new(),
            custom_text: String::new(),
            extra: Map::new(),
        }
    }

    pub fn parse(raw: &Value, context: &str) -> Result<Self, CoreError> {
        let map = require_object(raw, context)?;

        let uid = require_i64(map, "uid", context)?;
        let id = require_i64(map, "id", context)?;

        let mut card = Self {
            uid,
            id,
            count: opt_i64(map, "count", context)?.unwrap_or(1),
            life: opt_i64(map, "life", context)?.unwrap_or(0),
            rareup: opt_i64(map, "rareup", context)?.unwrap_or(0),
            tag: opt_object(map, "tag", context)?.unwrap_or_default(),
            equip_slots: opt_array(map, "equip_slots", context)?.unwrap_or_default(),
            equips: opt_array(map, "equips", context)?.unwrap_or_default(),
            bag: opt_i64(map, "bag", context)?.unwrap_or(0),
            bagpos: opt_i64(map, "bagpos", context)?.unwrap_or(0),
            custom_name: opt_str(map, "custom_name", context)?.unwrap_or_default(),
            custom_text: opt_str(map, "custom_text", context)?.unwrap_or_default(),
            extra: Map::new(),
        };

        for (key, value) in map {
            if !MODELED_KEYS.contains(&key.as_str()) {
                card.extra.insert(key.clone(), value.clone());
            }
        }

        Ok(card)
    }

    /// Every modeled key is emitted even at its default; the game never
    /// omits known card fields.
    pub fn serialize(&self) -> Value {
        let mut map = Map::new();
        map.insert("uid".into(), self.uid.into());
        map.insert("id".into(), self.id.into());
        map.insert("count".into(), self.count.into());
        map.insert("life".into(), self.life.into());
        map.insert("rareup".into(), self.rareup.into());
        map.insert("tag".into(), Value::Object(self.tag.clone()));
        map.insert("equip_slots".into(), Value::Array(self.equip_slots.clone()));
        map.insert("equips".into(), Value::Array(self.equips.clone()));
        map.insert("bag".into(), self.bag.into());
        map.insert("bagpos".into(), self.bagpos.into());
        map.insert("custom_name".into(), self.custom_name.clone().into());
        map.insert("custom_text".into(), self.custom_text.clone().into());
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    pub fn sudan_pool_index(&self) -> Option<i64> {
        self.tag.get(SUDAN_POOL_INDEX_TAG).and_then(Value::as_i64)
    }

    pub fn set_sudan_pool_index(&mut self, index: i64) {
        self.tag.insert(SUDAN_POOL_INDEX_TAG.into(), index.into());
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}
