use serde_json::{Map, Value};

use crate::error::CoreError;

use super::{require_i64, require_object};

/// One entry of the two-level notes structure. The outer list index is
/// per-category and meaningful, so inner lists round-trip even when empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteItem {
    pub note_type: i64,
    pub id: i64,
    pub uid: i64,
    pub count: i64,
}

impl NoteItem {
    pub fn parse(raw: &Value, context: &str) -> Result<Self, CoreError> {
        let map = require_object(raw, context)?;
        Ok(Self {
            note_type: require_i64(map, "type", context)?,
            id: require_i64(map, "id", context)?,
            uid: require_i64(map, "uid", context)?,
            count: require_i64(map, "count", context)?,
        })
    }

    pub fn serialize(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), self.note_type.into());
        map.insert("id".into(), self.id.into());
        map.insert("uid".into(), self.uid.into());
        map.insert("count".into(), self.count.into());
        Value::Object(map)
    }
}
