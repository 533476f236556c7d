use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sultan-se"))
        .args(args)
        .output()
        .expect("failed to run sultan-se CLI")
}

fn write_fixture(dir: &Path) -> PathBuf {
    let save = json!({
        "configId": 1,
        "name": "赛利姆",
        "round": 10,
        "saveTime": "2025-04-18T20:31:33.1234567+08:00",
        "card_uid_index": 5,
        "rite_uid_index": 3,
        "cards": [
            {"uid": 1, "id": 1001, "count": 1, "life": 0, "rareup": 0, "tag": {},
             "equip_slots": [], "equips": [], "bag": 1, "bagpos": 2,
             "custom_name": "", "custom_text": ""}
        ],
        "rites": [],
        "counter": {"7000060": 10}
    });
    let path = dir.join("auto_save.json");
    fs::write(&path, serde_json::to_string_pretty(&save).expect("encode")).expect("write fixture");
    path
}

#[test]
fn default_invocation_prints_basic_info() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path());

    let output = run_cli(&[path.to_string_lossy().as_ref()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("configId:       1"));
    assert!(stdout.contains("round:          10"));
}

#[test]
fn save_without_yes_is_refused_and_file_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path());
    let before = fs::read(&path).expect("read fixture");

    let output = run_cli(&[
        "--card",
        "1",
        "--set-life",
        "4",
        "--save",
        path.to_string_lossy().as_ref(),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--yes"), "stderr was: {stderr}");
    assert_eq!(fs::read(&path).expect("re-read fixture"), before);
}

#[test]
fn edit_with_output_writes_elsewhere() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path());
    let before = fs::read(&path).expect("read fixture");
    let out_path = dir.path().join("edited.json");

    let output = run_cli(&[
        "--card",
        "1",
        "--set-life",
        "4",
        "--set-custom-name",
        "新名字",
        "--output",
        out_path.to_string_lossy().as_ref(),
        path.to_string_lossy().as_ref(),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let edited: Value =
        serde_json::from_str(&fs::read_to_string(&out_path).expect("read output")).expect("JSON");
    assert_eq!(edited["cards"][0]["life"], json!(4));
    assert_eq!(edited["cards"][0]["custom_name"], json!("新名字"));
    assert_eq!(fs::read(&path).expect("re-read fixture"), before);
}

#[test]
fn save_with_yes_overwrites_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path());

    let output = run_cli(&[
        "--add-card",
        "9999",
        "--save",
        "--yes",
        path.to_string_lossy().as_ref(),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("added card id 9999 as uid 5"));

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read saved")).expect("JSON");
    assert_eq!(saved["card_uid_index"], json!(6));
    assert_eq!(saved["cards"][1]["uid"], json!(5));
    assert_eq!(saved["counter"], json!({"7000060": 10}));
}

#[test]
fn non_stackable_count_edit_fails_with_nonzero_exit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path());

    let output = run_cli(&[
        "--card",
        "1",
        "--set-count",
        "3",
        path.to_string_lossy().as_ref(),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("BusinessRule"), "stderr was: {stderr}");
}

#[test]
fn occupied_snapshot_slot_needs_overwrite_flag() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path());
    let path_arg = path.to_string_lossy().to_string();

    let output = run_cli(&["--snapshot", "3", "--name", "第一次", &path_arg]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let index_before = fs::read(dir.path().join("user_archive.json")).expect("read index");

    let output = run_cli(&["--snapshot", "3", "--name", "第二次", &path_arg]);
    assert!(!output.status.success());
    assert_eq!(
        fs::read(dir.path().join("user_archive.json")).expect("re-read index"),
        index_before
    );

    let output = run_cli(&[
        "--snapshot", "3", "--name", "第二次", "--overwrite", &path_arg,
    ]);
    assert!(output.status.success());
    let index: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("user_archive.json")).expect("read index"),
    )
    .expect("JSON");
    assert_eq!(index[2]["name"], json!("第二次"));
}

#[test]
fn json_output_is_machine_readable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path());

    let output = run_cli(&["--cards", "--json", path.to_string_lossy().as_ref()]);
    assert!(output.status.success());
    let parsed: Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");
    assert_eq!(parsed["cards"][0]["uid"], json!(1));
}
