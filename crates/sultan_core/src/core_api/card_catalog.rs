use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::CoreError;

/// Tag key the game uses to mark a card definition as stackable.
pub const STACKABLE_TAG: &str = "可堆叠";

pub const SUDAN_TYPE: &str = "sudan";
pub const CHAR_TYPE: &str = "char";

/// Tag the game stamps on character cards that follow the player.
pub const ADHERENT_TAG: &str = "adherent";

/// Static definition of one card id, as shipped in `cards.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct CardCatalogEntry {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub text: String,
    pub card_type: String,
    pub rare: i64,
    pub tag: Map<String, Value>,
    pub equips: Vec<Value>,
    pub is_only: bool,
}

impl CardCatalogEntry {
    fn parse(id: i64, raw: &Value) -> Self {
        // Catalog data only enriches display and capability checks; missing
        // or oddly typed fields degrade to defaults instead of failing.
        let map = raw.as_object();
        let get = |key: &str| map.and_then(|m| m.get(key));

        Self {
            id,
            name: get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            text: get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            card_type: get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            rare: get("rare").and_then(Value::as_i64).unwrap_or(-1),
            tag: get("tag")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            equips: get("equips")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            is_only: get("is_only").map(truthy).unwrap_or(false),
        }
    }

    pub fn is_stackable(&self) -> bool {
        self.tag.contains_key(STACKABLE_TAG)
    }
}

/// Read-only id → card-definition lookup over the installation's
/// `cards.json` (an object keyed by stringified numeric id).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardCatalog {
    path: Option<PathBuf>,
    entries: BTreeMap<i64, CardCatalogEntry>,
}

impl CardCatalog {
    /// A catalog with no entries: every id resolves to unknown, nothing is
    /// stackable. Used when no game data directory is configured.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path).map_err(|e| {
            CoreError::io(format!("failed to read {}: {e}", path.display()))
        })?;
        let raw: Value = serde_json::from_str(&text).map_err(|e| {
            CoreError::malformed(format!("{} is not valid JSON: {e}", path.display()))
        })?;
        let map = raw.as_object().ok_or_else(|| {
            CoreError::malformed(format!(
                "{} must be an object keyed by card id",
                path.display()
            ))
        })?;

        let mut entries = BTreeMap::new();
        for (key, value) in map {
            let id: i64 = key.trim().parse().map_err(|_| {
                CoreError::malformed(format!(
                    "{}: non-numeric card id key {key:?}",
                    path.display()
                ))
            })?;
            entries.insert(id, CardCatalogEntry::parse(id, value));
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, id: i64) -> Option<&CardCatalogEntry> {
        self.entries.get(&id)
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.get(id).map(|entry| entry.name.as_str())
    }

    pub fn card_type(&self, id: i64) -> Option<&str> {
        self.get(id).map(|entry| entry.card_type.as_str())
    }

    /// Unknown ids count as non-stackable.
    pub fn is_stackable(&self, id: i64) -> bool {
        self.get(id).is_some_and(CardCatalogEntry::is_stackable)
    }

    pub fn is_sudan(&self, id: i64) -> bool {
        self.card_type(id) == Some(SUDAN_TYPE)
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().unwrap_or(0) > 0,
        _ => false,
    }
}
