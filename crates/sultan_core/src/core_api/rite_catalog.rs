use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::CoreError;

/// Read-only rite lookup: a derived id → name index for fast listing plus
/// one JSON file per rite id under the installation's `rite/` directory,
/// read lazily on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct RiteCatalog {
    rite_dir: PathBuf,
    index: BTreeMap<i64, String>,
}

impl RiteCatalog {
    pub fn open(rite_dir: &Path, index_path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(index_path).map_err(|e| {
            CoreError::io(format!("failed to read {}: {e}", index_path.display()))
        })?;
        let raw: Value = serde_json::from_str(&text).map_err(|e| {
            CoreError::malformed(format!("{} is not valid JSON: {e}", index_path.display()))
        })?;
        let map = raw.as_object().ok_or_else(|| {
            CoreError::malformed(format!(
                "{} must be an object keyed by rite id",
                index_path.display()
            ))
        })?;

        let mut index = BTreeMap::new();
        for (key, value) in map {
            let id: i64 = key.trim().parse().map_err(|_| {
                CoreError::malformed(format!(
                    "{}: non-numeric rite id key {key:?}",
                    index_path.display()
                ))
            })?;
            let name = value.as_str().ok_or_else(|| {
                CoreError::malformed(format!(
                    "{}: rite {id} name must be a string",
                    index_path.display()
                ))
            })?;
            index.insert(id, name.to_string());
        }

        Ok(Self {
            rite_dir: rite_dir.to_path_buf(),
            index,
        })
    }

    pub fn rite_dir(&self) -> &Path {
        &self.rite_dir
    }

    /// Name lookup touches only the in-memory index.
    pub fn name(&self, id: i64) -> Option<&str> {
        self.index.get(&id).map(String::as_str)
    }

    /// Full definition of one rite, read from `<rite_dir>/<id>.json`.
    pub fn details(&self, id: i64) -> Result<Value, CoreError> {
        let path = self.rite_dir.join(format!("{id}.json"));
        let text = fs::read_to_string(&path).map_err(|e| {
            CoreError::io(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            CoreError::malformed(format!("{} is not valid JSON: {e}", path.display()))
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.index.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
