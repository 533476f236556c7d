use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use sultan_core::core_api::CardCatalog;
use sultan_core::error::CoreErrorCode;
use sultan_core::save::SaveConfig;
use sultan_core::store::{self, ARCHIVE_SLOTS, ArchiveIndex};

fn catalog(dir: &Path) -> CardCatalog {
    let path = dir.join("cards.json");
    fs::write(
        &path,
        serde_json::to_string_pretty(&json!({
            "3001": {"id": 3001, "name": "骁勇", "title": "", "text": "", "type": "sudan",
                     "rare": 5, "tag": {}, "equips": [], "is_only": 1}
        }))
        .expect("encode catalog"),
    )
    .expect("write catalog");
    CardCatalog::load(&path).expect("catalog should load")
}

fn sample_config() -> SaveConfig {
    SaveConfig::parse(&json!({
        "configId": 1,
        "round": 42,
        "saveTime": "2025-04-18T20:31:33.1234567+08:00",
        "card_uid_index": 10,
        "cards": [
            {"uid": 1, "id": 3001, "count": 1, "life": 3, "rareup": 0,
             "tag": {"sudan_pool_index": 1}, "equip_slots": [], "equips": [],
             "bag": 0, "bagpos": 0, "custom_name": "", "custom_text": ""}
        ],
        "sudan_pool_cards": [3001],
        "sudan_card_pool": [
            {"uid": 2, "id": 3001, "count": 1, "life": 0, "rareup": 0, "tag": {},
             "equip_slots": [], "equips": [], "bag": 0, "bagpos": 0,
             "custom_name": "", "custom_text": ""}
        ]
    }))
    .expect("sample config should parse")
}

#[test]
fn missing_index_is_initialized_with_ten_empty_slots() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save_path = dir.path().join("auto_save.json");

    let index = ArchiveIndex::load_or_init(&save_path).expect("init index");
    assert_eq!(index.slots().len(), ARCHIVE_SLOTS);
    assert!(index.slots().iter().all(Option::is_none));

    let on_disk: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("user_archive.json")).expect("read index"),
    )
    .expect("index is JSON");
    assert_eq!(on_disk, Value::Array(vec![Value::Null; ARCHIVE_SLOTS]));
}

#[test]
fn short_index_files_are_padded_to_ten_slots() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save_path = dir.path().join("auto_save.json");
    fs::write(dir.path().join("user_archive.json"), "[null, null]").expect("write short index");

    let index = ArchiveIndex::load_or_init(&save_path).expect("load index");
    assert_eq!(index.slots().len(), ARCHIVE_SLOTS);
}

#[test]
fn snapshot_summary_is_recomputed_from_the_live_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save_path = dir.path().join("auto_save.json");
    let catalog = catalog(dir.path());
    let config = sample_config();

    let mut index = ArchiveIndex::load_or_init(&save_path).expect("init index");
    index
        .write_snapshot(&config, &catalog, 2, "决战前", false)
        .expect("snapshot");

    let slot = index.slot(2).expect("slot in range").expect("slot occupied");
    assert_eq!(slot.name, "决战前");
    assert_eq!(slot.live_days, 42);
    // One sudan card in play plus one pooled.
    assert_eq!(slot.left_sudan, 2);
    // 7 minus the oldest in-play sudan card's life.
    assert_eq!(slot.execution_day, 4);
    assert_eq!(slot.save_time, "2025-04-18T20:31:33.1234567+08:00");
    assert_eq!(slot.path, "USERARCHIVE\\002.json");

    let blob_path = dir.path().join("USERARCHIVE").join("002.json");
    let blob: Value =
        serde_json::from_str(&fs::read_to_string(&blob_path).expect("read blob")).expect("blob JSON");
    assert_eq!(blob, config.serialize());
}

#[test]
fn occupied_slot_is_untouched_without_confirmation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save_path = dir.path().join("auto_save.json");
    let catalog = catalog(dir.path());
    let config = sample_config();

    let mut index = ArchiveIndex::load_or_init(&save_path).expect("init index");
    index
        .write_snapshot(&config, &catalog, 3, "第一次", false)
        .expect("first snapshot");

    let index_bytes = fs::read(dir.path().join("user_archive.json")).expect("read index");
    let blob_bytes = fs::read(dir.path().join("USERARCHIVE").join("003.json")).expect("read blob");

    let err = index
        .write_snapshot(&config, &catalog, 3, "第二次", false)
        .unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Conflict);

    assert_eq!(
        fs::read(dir.path().join("user_archive.json")).expect("re-read index"),
        index_bytes
    );
    assert_eq!(
        fs::read(dir.path().join("USERARCHIVE").join("003.json")).expect("re-read blob"),
        blob_bytes
    );

    // With confirmation the slot is replaced.
    index
        .write_snapshot(&config, &catalog, 3, "第二次", true)
        .expect("confirmed overwrite");
    assert_eq!(
        index.slot(3).expect("slot in range").expect("occupied").name,
        "第二次"
    );
}

#[test]
fn snapshot_slot_out_of_range_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save_path = dir.path().join("auto_save.json");
    let catalog = catalog(dir.path());

    let mut index = ArchiveIndex::load_or_init(&save_path).expect("init index");
    let err = index
        .write_snapshot(&sample_config(), &catalog, 10, "越界", false)
        .unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Range);
}

#[test]
fn failed_replacement_leaves_no_temp_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    // A non-empty directory at the target path defeats the final rename.
    let target = dir.path().join("auto_save.json");
    fs::create_dir(&target).expect("create blocking dir");
    fs::write(target.join("occupied"), b"x").expect("fill blocking dir");

    let err = store::write_save(&sample_config(), &target).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Io);

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .expect("read tempdir")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

#[test]
fn write_save_replaces_content_atomically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("auto_save.json");
    fs::write(&target, "{\"old\": true}").expect("seed old content");

    store::write_save(&sample_config(), &target).expect("save");
    let reloaded = store::load_save(&target).expect("reload");
    assert_eq!(reloaded, sample_config());
}
