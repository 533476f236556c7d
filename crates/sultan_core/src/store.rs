//! Loading and persisting save files and the snapshot archive.
//!
//! Writes go to a temp file in the target directory followed by a rename,
//! so a concurrent reader (the game itself) observes either the old or the
//! new complete file, never a torn one.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core_api::card_catalog::{CardCatalog, SUDAN_TYPE};
use crate::error::CoreError;
use crate::save::SaveConfig;

pub const ARCHIVE_SLOTS: usize = 10;
pub const ARCHIVE_INDEX_FILE: &str = "user_archive.json";
pub const ARCHIVE_DIR: &str = "USERARCHIVE";

const SAVE_INDENT: &[u8] = b"    ";
const ARCHIVE_INDENT: &[u8] = b"  ";

/// Fallback `save_time` for saves that never recorded one, matching what
/// the game writes into fresh archive slots.
const DEFAULT_SAVE_TIME: &str = "2000-01-01T00:00:00.0000000+08:00";

pub fn load_save(path: &Path) -> Result<SaveConfig, CoreError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CoreError::io(format!("failed to read {}: {e}", path.display())))?;
    let raw: Value = serde_json::from_str(&text)
        .map_err(|e| CoreError::malformed(format!("{} is not valid JSON: {e}", path.display())))?;
    let config = SaveConfig::parse(&raw)?;
    debug!(
        "loaded {}: {} cards, {} rites",
        path.display(),
        config.cards.len(),
        config.rites().len()
    );
    Ok(config)
}

/// Callers must have confirmed the overwrite before getting here; this
/// function only guarantees the write is all-or-nothing.
pub fn write_save(config: &SaveConfig, path: &Path) -> Result<(), CoreError> {
    let text = to_pretty_string(&config.serialize(), SAVE_INDENT)?;
    write_atomic(path, text.as_bytes())?;
    info!("saved {}", path.display());
    Ok(())
}

/// One occupied slot of the snapshot index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSlot {
    pub name: String,
    pub live_days: i64,
    pub left_sudan: i64,
    pub execution_day: i64,
    pub save_time: String,
    pub path: String,
}

/// The fixed ten-slot `user_archive.json` next to the save file, plus the
/// per-slot full-config blobs under `USERARCHIVE/`.
#[derive(Debug)]
pub struct ArchiveIndex {
    index_path: PathBuf,
    archive_dir: PathBuf,
    slots: Vec<Option<ArchiveSlot>>,
}

impl ArchiveIndex {
    /// Opens the index next to `save_path`, creating a ten-null index file
    /// if none exists yet. Short index files are padded back to ten slots.
    pub fn load_or_init(save_path: &Path) -> Result<Self, CoreError> {
        let dir = save_path.parent().unwrap_or_else(|| Path::new("."));
        let index_path = dir.join(ARCHIVE_INDEX_FILE);
        let archive_dir = dir.join(ARCHIVE_DIR);

        let mut slots: Vec<Option<ArchiveSlot>> = if index_path.exists() {
            let text = fs::read_to_string(&index_path).map_err(|e| {
                CoreError::io(format!("failed to read {}: {e}", index_path.display()))
            })?;
            serde_json::from_str(&text).map_err(|e| {
                CoreError::malformed(format!(
                    "{} is not a valid snapshot index: {e}",
                    index_path.display()
                ))
            })?
        } else {
            let empty: Vec<Option<ArchiveSlot>> = vec![None; ARCHIVE_SLOTS];
            let raw = serde_json::to_value(&empty)
                .map_err(|e| CoreError::io(format!("failed to encode snapshot index: {e}")))?;
            let text = to_pretty_string(&raw, ARCHIVE_INDENT)?;
            write_atomic(&index_path, text.as_bytes())?;
            debug!("initialized empty snapshot index {}", index_path.display());
            empty
        };
        slots.resize(slots.len().max(ARCHIVE_SLOTS), None);

        Ok(Self {
            index_path,
            archive_dir,
            slots,
        })
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn slots(&self) -> &[Option<ArchiveSlot>] {
        &self.slots
    }

    pub fn slot(&self, slot: usize) -> Result<Option<&ArchiveSlot>, CoreError> {
        self.slots
            .get(slot)
            .map(Option::as_ref)
            .ok_or_else(|| slot_out_of_range(slot))
    }

    /// Snapshots the current config into `slot`. An occupied slot is left
    /// untouched on disk unless the caller confirmed the overwrite. Summary
    /// fields are recomputed from the live config, never copied forward.
    pub fn write_snapshot(
        &mut self,
        config: &SaveConfig,
        catalog: &CardCatalog,
        slot: usize,
        name: &str,
        allow_overwrite: bool,
    ) -> Result<(), CoreError> {
        if slot >= self.slots.len() {
            return Err(slot_out_of_range(slot));
        }
        if self.slots[slot].is_some() && !allow_overwrite {
            return Err(CoreError::conflict(format!(
                "snapshot slot {} is occupied; overwrite needs confirmation",
                slot + 1
            )));
        }

        let (live_days, left_sudan, execution_day) = snapshot_summary(config, catalog);
        let record = ArchiveSlot {
            name: name.to_string(),
            live_days,
            left_sudan,
            execution_day,
            save_time: config
                .save_time
                .map(|t| t.format())
                .unwrap_or_else(|| DEFAULT_SAVE_TIME.to_string()),
            // The index records the blob with the game's own path
            // convention, backslash included.
            path: format!("{ARCHIVE_DIR}\\{slot:03}.json"),
        };

        fs::create_dir_all(&self.archive_dir).map_err(|e| {
            CoreError::io(format!(
                "failed to create {}: {e}",
                self.archive_dir.display()
            ))
        })?;
        let blob_path = self.archive_dir.join(format!("{slot:03}.json"));
        let blob = to_pretty_string(&config.serialize(), ARCHIVE_INDENT)?;
        write_atomic(&blob_path, blob.as_bytes())?;

        self.slots[slot] = Some(record);
        let index_text = to_pretty_string(
            &serde_json::to_value(&self.slots).map_err(|e| {
                CoreError::io(format!("failed to encode snapshot index: {e}"))
            })?,
            ARCHIVE_INDENT,
        )?;
        write_atomic(&self.index_path, index_text.as_bytes())?;

        info!(
            "snapshot {name:?} written to slot {} ({})",
            slot + 1,
            blob_path.display()
        );
        Ok(())
    }
}

fn snapshot_summary(config: &SaveConfig, catalog: &CardCatalog) -> (i64, i64, i64) {
    let mut sudan_count = 0i64;
    let mut max_life: Option<i64> = None;
    for card in &config.cards {
        if catalog.card_type(card.id) == Some(SUDAN_TYPE) {
            sudan_count += 1;
            max_life = Some(max_life.map_or(card.life, |m| m.max(card.life)));
        }
    }

    let live_days = config.round.unwrap_or(-1);
    let left_sudan = sudan_count + config.sudan_card_pool().len() as i64;
    let execution_day = match max_life {
        Some(life) => 7 - life,
        None => 7,
    };
    (live_days, left_sudan, execution_day)
}

fn slot_out_of_range(slot: usize) -> CoreError {
    CoreError::range(format!(
        "snapshot slot {slot} out of range, expected 0..{ARCHIVE_SLOTS}"
    ))
}

fn to_pretty_string(value: &Value, indent: &'static [u8]) -> Result<String, CoreError> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| CoreError::io(format!("failed to encode JSON: {e}")))?;
    String::from_utf8(buf).map_err(|e| CoreError::io(format!("non-UTF-8 JSON output: {e}")))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| CoreError::io(format!("{} has no file name", path.display())))?;
    let tmp = dir.join(format!(
        ".{}.tmp-{}",
        file_name.to_string_lossy(),
        process::id()
    ));

    fs::write(&tmp, bytes)
        .map_err(|e| CoreError::io(format!("failed to write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        CoreError::io(format!(
            "failed to replace {}: {e}",
            path.display()
        ))
    })
}
