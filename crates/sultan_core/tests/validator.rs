use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use sultan_core::core_api::{CardCatalog, EditContext, Engine, Session};
use sultan_core::error::CoreErrorCode;

fn catalog_json() -> Value {
    json!({
        "1001": {"id": 1001, "name": "仆从", "title": "", "text": "", "type": "char",
                 "rare": 1, "tag": {}, "equips": [], "is_only": 0},
        "2001": {"id": 2001, "name": "金币", "title": "", "text": "", "type": "item",
                 "rare": 0, "tag": {"可堆叠": 1}, "equips": [], "is_only": 0},
        "3001": {"id": 3001, "name": "骁勇", "title": "", "text": "", "type": "sudan",
                 "rare": 5, "tag": {}, "equips": [], "is_only": 1}
    })
}

fn save_json() -> Value {
    json!({
        "configId": 1,
        "round": 10,
        "card_uid_index": 20,
        "rite_uid_index": 10,
        "cards": [
            {"uid": 1, "id": 1001, "count": 1, "life": 0, "rareup": 0, "tag": {"adherent": 1},
             "equip_slots": [], "equips": [], "bag": 1, "bagpos": 2,
             "custom_name": "", "custom_text": ""},
            {"uid": 2, "id": 2001, "count": 5, "life": 0, "rareup": 0, "tag": {},
             "equip_slots": [], "equips": [], "bag": 1, "bagpos": 3,
             "custom_name": "", "custom_text": ""}
        ],
        "rites": [
            {"uid": 3, "id": 510001, "new_born": false, "is_show": true, "start": false,
             "start_round": 0, "start_life": 0, "life": 0, "cards": [], "custom_name": ""}
        ],
        "counter": {"7000060": 10}
    })
}

fn open_session(dir: &Path) -> Session {
    let catalog_path = dir.join("cards.json");
    fs::write(
        &catalog_path,
        serde_json::to_string_pretty(&catalog_json()).expect("encode catalog"),
    )
    .expect("write catalog");

    let save_path = dir.join("auto_save.json");
    fs::write(
        &save_path,
        serde_json::to_string_pretty(&save_json()).expect("encode save"),
    )
    .expect("write save");

    let catalog = CardCatalog::load(&catalog_path).expect("catalog should load");
    Engine::new(catalog).open(&save_path).expect("save should open")
}

#[test]
fn count_on_non_stackable_card_is_rejected_and_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    let err = session.set_card_field(1, "count", "3").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::BusinessRule);
    assert!(err.is_validation());
    assert_eq!(session.config().find_card(1).expect("card 1").count, 1);
}

#[test]
fn count_on_stackable_card_is_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    session.set_card_field(2, "count", "30").expect("stackable count");
    assert_eq!(session.config().find_card(2).expect("card 2").count, 30);
}

#[test]
fn numeric_range_rules() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    for (field, input) in [
        ("count", "0"),
        ("life", "-1"),
        ("rareup", "4"),
        ("rareup", "-1"),
        ("bag", "4"),
        ("bagpos", "-2"),
    ] {
        let err = session.set_card_field(1, field, input).unwrap_err();
        assert_eq!(err.code, CoreErrorCode::Range, "{field}={input}");
    }

    // Nothing above touched the card.
    let card = session.config().find_card(1).expect("card 1");
    assert_eq!((card.life, card.rareup, card.bag, card.bagpos), (0, 0, 1, 2));
}

#[test]
fn non_numeric_input_is_a_type_mismatch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    let err = session.set_card_field(1, "life", "three").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::TypeMismatch);
}

#[test]
fn single_quoted_tag_normalizes_to_strict_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    session.set_card_field(1, "tag", "{'own': 1}").expect("tag edit");
    let card = session.config().find_card(1).expect("card 1");
    assert_eq!(card.tag.get("own"), Some(&json!(1)));

    let text = serde_json::to_string(&session.config().serialize()).expect("encode");
    assert!(text.contains(r#""own":1"#));
    assert!(!text.contains('\''));
}

#[test]
fn tag_must_be_a_mapping() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    let err = session.set_card_field(1, "tag", "[1, 2]").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::TypeMismatch);
    let card = session.config().find_card(1).expect("card 1");
    assert_eq!(card.tag.get("adherent"), Some(&json!(1)));
}

#[test]
fn equip_slots_must_be_a_sequence() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    let err = session
        .set_card_field(1, "equip_slots", "{'weapon': 1}")
        .unwrap_err();
    assert_eq!(err.code, CoreErrorCode::TypeMismatch);

    session
        .set_card_field(1, "equip_slots", "['weapon', 'cloth']")
        .expect("sequence edit");
    assert_eq!(
        session.config().find_card(1).expect("card 1").equip_slots,
        vec![json!("weapon"), json!("cloth")]
    );
}

#[test]
fn rite_fields_validate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    session.set_rite_field(3, "start", "true").expect("bool edit");
    session.set_rite_field(3, "life", "6").expect("int edit");
    let rite = &session.config().rites()[0];
    assert!(rite.start);
    assert_eq!(rite.life, 6);

    let err = session.set_rite_field(3, "is_show", "maybe").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::TypeMismatch);

    let err = session.set_rite_field(3, "uid", "9").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::UnsupportedOperation);
}

#[test]
fn unknown_card_field_is_unsupported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    let err = session.set_card_field(1, "attack", "5").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::UnsupportedOperation);
}

#[test]
fn new_cards_cannot_sit_below_bag_position_two() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    let uid = session.add_card(1001).expect("add card");
    let err = session
        .set_card_field_in(uid, "bagpos", "1", EditContext::NewCard)
        .unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Range);

    // Cards the game itself placed may sit anywhere from 0 up.
    session
        .set_card_field_in(uid, "bagpos", "0", EditContext::ExistingCard)
        .expect("existing-card edit");
}

#[test]
fn raw_edits_keep_the_existing_kind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    let err = session.set_raw("counter", "[1, 2]").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::TypeMismatch);
    assert_eq!(
        session.config().raw("counter"),
        Some(&json!({"7000060": 10}))
    );

    session
        .set_raw("counter", "{'7000060': 11, '7100005': 2}")
        .expect("kind-preserving edit");
    assert_eq!(
        session.config().raw("counter"),
        Some(&json!({"7000060": 11, "7100005": 2}))
    );
}

#[test]
fn raw_edit_of_modeled_keys_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    let err = session.set_raw("cards", "[]").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::UnsupportedOperation);
}

#[test]
fn insert_raw_creates_then_refuses_duplicates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = open_session(dir.path());

    session.insert_raw("end_open", "false").expect("insert");
    assert_eq!(session.config().raw("end_open"), Some(&json!(false)));

    let err = session.insert_raw("end_open", "true").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::BusinessRule);
}
