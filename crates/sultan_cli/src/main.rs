use std::path::PathBuf;
use std::process;

use clap::Parser;
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use sultan_core::core_api::{
    CardCatalog, EditContext, Engine, RiteCatalog, Session,
};
use sultan_core::error::CoreError;
use sultan_core::save::{Card, Rite};
use sultan_core::store::{self, ARCHIVE_SLOTS, ArchiveIndex};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "SAVE.JSON")]
    path: PathBuf,
    /// Game data directory holding cards.json, rite/ and rite_map_info.json
    #[arg(long = "data-dir", value_name = "DIR")]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    info: bool,
    #[arg(long)]
    cards: bool,
    #[arg(long)]
    rites: bool,
    #[arg(long)]
    notes: bool,
    #[arg(long)]
    snapshots: bool,
    /// Show one unmodeled top-level value
    #[arg(long, value_name = "KEY")]
    raw: Option<String>,
    #[arg(long)]
    json: bool,
    /// Card to edit, by uid
    #[arg(long, value_name = "UID", conflicts_with = "rite")]
    card: Option<i64>,
    /// Rite to edit, by uid
    #[arg(long, value_name = "UID")]
    rite: Option<i64>,
    #[arg(long = "set-count", value_name = "N")]
    set_count: Option<String>,
    #[arg(long = "set-life", value_name = "N", allow_hyphen_values = true)]
    set_life: Option<String>,
    #[arg(long = "set-rareup", value_name = "N")]
    set_rareup: Option<String>,
    #[arg(long = "set-tag", value_name = "MAPPING")]
    set_tag: Option<String>,
    #[arg(long = "set-equip-slots", value_name = "SEQUENCE")]
    set_equip_slots: Option<String>,
    #[arg(long = "set-equips", value_name = "SEQUENCE")]
    set_equips: Option<String>,
    #[arg(long = "set-bag", value_name = "N")]
    set_bag: Option<String>,
    #[arg(long = "set-bagpos", value_name = "N")]
    set_bagpos: Option<String>,
    #[arg(long = "set-custom-name", value_name = "TEXT")]
    set_custom_name: Option<String>,
    #[arg(long = "set-custom-text", value_name = "TEXT")]
    set_custom_text: Option<String>,
    #[arg(long = "set-new-born", value_name = "BOOL")]
    set_new_born: Option<String>,
    #[arg(long = "set-is-show", value_name = "BOOL")]
    set_is_show: Option<String>,
    #[arg(long = "set-start", value_name = "BOOL")]
    set_start: Option<String>,
    #[arg(long = "set-start-round", value_name = "N", allow_hyphen_values = true)]
    set_start_round: Option<String>,
    #[arg(long = "set-start-life", value_name = "N", allow_hyphen_values = true)]
    set_start_life: Option<String>,
    /// Edit an unmodeled top-level value, keeping its JSON kind
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set_raw: Vec<String>,
    #[arg(long = "add-card", value_name = "ID")]
    add_card: Option<i64>,
    #[arg(long = "remove-card", value_name = "UID")]
    remove_card: Option<i64>,
    #[arg(long = "add-rite", value_name = "ID")]
    add_rite: Option<i64>,
    #[arg(long = "remove-rite", value_name = "UID")]
    remove_rite: Option<i64>,
    /// Write the edited save back over SAVE.JSON (needs --yes)
    #[arg(long)]
    save: bool,
    /// Confirm overwriting the original save file
    #[arg(long)]
    yes: bool,
    /// Write the edited save to a different path instead
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Snapshot the current state into an archive slot (1-10)
    #[arg(long, value_name = "SLOT")]
    snapshot: Option<usize>,
    /// Name for the snapshot slot
    #[arg(long, value_name = "NAME")]
    name: Option<String>,
    /// Confirm overwriting an occupied snapshot slot
    #[arg(long)]
    overwrite: bool,
}

impl Cli {
    fn card_edits(&self) -> Vec<(&'static str, &str)> {
        let pairs: [(&'static str, &Option<String>); 10] = [
            ("count", &self.set_count),
            ("life", &self.set_life),
            ("rareup", &self.set_rareup),
            ("tag", &self.set_tag),
            ("equip_slots", &self.set_equip_slots),
            ("equips", &self.set_equips),
            ("bag", &self.set_bag),
            ("bagpos", &self.set_bagpos),
            ("custom_name", &self.set_custom_name),
            ("custom_text", &self.set_custom_text),
        ];
        pairs
            .into_iter()
            .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
            .collect()
    }

    fn rite_edits(&self) -> Vec<(&'static str, &str)> {
        let pairs: [(&'static str, &Option<String>); 7] = [
            ("new_born", &self.set_new_born),
            ("is_show", &self.set_is_show),
            ("start", &self.set_start),
            ("start_round", &self.set_start_round),
            ("start_life", &self.set_start_life),
            ("life", &self.set_life),
            ("custom_name", &self.set_custom_name),
        ];
        pairs
            .into_iter()
            .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
            .collect()
    }

    fn wants_display(&self) -> bool {
        self.info
            || self.cards
            || self.rites
            || self.notes
            || self.snapshots
            || self.raw.is_some()
    }

    fn wants_mutation(&self) -> bool {
        self.add_card.is_some()
            || self.remove_card.is_some()
            || self.add_rite.is_some()
            || self.remove_rite.is_some()
            || !self.set_raw.is_empty()
            || (self.card.is_some() && !self.card_edits().is_empty())
            || (self.rite.is_some() && !self.rite_edits().is_empty())
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CoreError> {
    let card_catalog = match &cli.data_dir {
        Some(dir) => CardCatalog::load(&dir.join("cards.json"))?,
        None => CardCatalog::empty(),
    };
    let rite_catalog = cli.data_dir.as_ref().and_then(|dir| {
        RiteCatalog::open(&dir.join("rite"), &dir.join("rite_map_info.json"))
            .map_err(|e| eprintln!("warning: rite catalog unavailable: {e}"))
            .ok()
    });

    let engine = Engine::new(card_catalog);
    let mut session = engine.open(&cli.path)?;

    apply_mutations(cli, &mut session)?;

    if cli.save {
        if !cli.yes {
            return Err(CoreError::business_rule(format!(
                "refusing to overwrite {} without --yes",
                cli.path.display()
            )));
        }
        session.save()?;
        println!("saved {}", cli.path.display());
    }
    if let Some(output) = &cli.output {
        store::write_save(session.config(), output)?;
        println!("wrote {}", output.display());
    }

    if let Some(slot) = cli.snapshot {
        if !(1..=ARCHIVE_SLOTS).contains(&slot) {
            return Err(CoreError::range(format!(
                "snapshot slot must be 1-{ARCHIVE_SLOTS}, got {slot}"
            )));
        }
        let name = cli.name.as_deref().unwrap_or("未命名存档");
        session.snapshot(slot - 1, name, cli.overwrite)?;
        println!("snapshot {name:?} saved to slot {slot}");
    }

    let quiet_run =
        cli.wants_mutation() || cli.save || cli.output.is_some() || cli.snapshot.is_some();
    if cli.wants_display() || !quiet_run {
        display(cli, &session, rite_catalog.as_ref())?;
    }

    Ok(())
}

fn apply_mutations(cli: &Cli, session: &mut Session) -> Result<(), CoreError> {
    if let Some(uid) = cli.card {
        for (field, value) in cli.card_edits() {
            session.set_card_field(uid, field, value)?;
        }
    }
    if let Some(uid) = cli.rite {
        for (field, value) in cli.rite_edits() {
            session.set_rite_field(uid, field, value)?;
        }
    }

    if let Some(id) = cli.add_card {
        let uid = session.add_card(id)?;
        println!("added card id {id} as uid {uid}");
        // With no --card target the edit flags configure the new card.
        if cli.card.is_none() {
            for (field, value) in cli.card_edits() {
                session.set_card_field_in(uid, field, value, EditContext::NewCard)?;
            }
        }
    }
    if let Some(uid) = cli.remove_card {
        session.remove_card(uid)?;
        println!("removed card uid {uid}");
    }
    if let Some(id) = cli.add_rite {
        let uid = session.add_rite(id)?;
        println!("added rite id {id} as uid {uid}");
        if cli.rite.is_none() {
            for (field, value) in cli.rite_edits() {
                session.set_rite_field(uid, field, value)?;
            }
        }
    }
    if let Some(uid) = cli.remove_rite {
        session.remove_rite(uid)?;
        println!("removed rite uid {uid}");
    }

    for entry in &cli.set_raw {
        let Some((key, value)) = entry.split_once('=') else {
            return Err(CoreError::type_mismatch(format!(
                "--set expects KEY=VALUE, got {entry:?}"
            )));
        };
        session.set_raw(key, value)?;
    }

    Ok(())
}

fn display(
    cli: &Cli,
    session: &Session,
    rite_catalog: Option<&RiteCatalog>,
) -> Result<(), CoreError> {
    let show_info = cli.info || !cli.wants_display();

    if cli.json {
        let mut out = JsonMap::new();
        if show_info {
            out.insert("info".into(), info_json(session));
        }
        if cli.cards {
            out.insert(
                "cards".into(),
                JsonValue::Array(
                    session
                        .config()
                        .cards
                        .iter()
                        .map(|card| card_json(session, card))
                        .collect(),
                ),
            );
        }
        if cli.rites {
            out.insert(
                "rites".into(),
                JsonValue::Array(
                    session
                        .config()
                        .rites()
                        .iter()
                        .map(|rite| rite_json(rite, rite_catalog))
                        .collect(),
                ),
            );
        }
        if cli.notes {
            out.insert("notes".into(), session.config().serialize()["notes"].clone());
        }
        if let Some(key) = &cli.raw {
            out.insert(
                key.clone(),
                session.config().raw(key).cloned().unwrap_or(JsonValue::Null),
            );
        }
        if cli.snapshots {
            let index = ArchiveIndex::load_or_init(session.path())?;
            out.insert(
                "snapshots".into(),
                serde_json::to_value(index.slots())
                    .map_err(|e| CoreError::io(format!("failed to encode snapshots: {e}")))?,
            );
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonValue::Object(out))
                .map_err(|e| CoreError::io(format!("failed to encode output: {e}")))?
        );
        return Ok(());
    }

    if show_info {
        print_info(session);
    }
    if cli.cards {
        print_cards(session);
    }
    if cli.rites {
        print_rites(session, rite_catalog);
    }
    if cli.notes {
        print_notes(session);
    }
    if let Some(key) = &cli.raw {
        match session.config().raw(key) {
            Some(value) => println!(
                "{key} = {}",
                serde_json::to_string_pretty(value)
                    .map_err(|e| CoreError::io(format!("failed to encode {key}: {e}")))?
            ),
            None => println!("{key} is not present in this save"),
        }
    }
    if cli.snapshots {
        print_snapshots(session)?;
    }

    Ok(())
}

fn info_json(session: &Session) -> JsonValue {
    let config = session.config();
    json!({
        "configId": config.config_id,
        "configVersion": config.config_version,
        "name": config.name,
        "difficulty": config.difficulty,
        "round": config.round,
        "saveTime": config.save_time.map(|t| t.format()),
        "card_uid_index": config.card_uid_index,
        "rite_uid_index": config.rite_uid_index,
        "card_count": config.cards.len(),
        "rite_count": config.rites().len(),
        "sudan_pool_cards": config.sudan_pool_cards(),
    })
}

fn card_json(session: &Session, card: &Card) -> JsonValue {
    let mut value = card.serialize();
    if let Some(name) = session.catalog().name(card.id)
        && let Some(map) = value.as_object_mut()
    {
        map.insert("catalog_name".into(), name.into());
    }
    value
}

fn rite_json(rite: &Rite, rite_catalog: Option<&RiteCatalog>) -> JsonValue {
    let mut value = rite.serialize();
    if let Some(name) = rite_catalog.and_then(|catalog| catalog.name(rite.id))
        && let Some(map) = value.as_object_mut()
    {
        map.insert("catalog_name".into(), name.into());
    }
    value
}

fn print_info(session: &Session) {
    let config = session.config();
    println!("configId:       {}", config.config_id);
    if let Some(version) = config.config_version {
        println!("configVersion:  {version}");
    }
    if let Some(name) = &config.name {
        println!("name:           {name}");
    }
    if let Some(difficulty) = config.difficulty {
        println!("difficulty:     {difficulty}");
    }
    if let Some(round) = config.round {
        println!("round:          {round}");
    }
    if let Some(time) = config.save_time {
        println!("saveTime:       {}", time.format());
    }
    if let Some(index) = config.card_uid_index {
        println!("card_uid_index: {index}");
    }
    if let Some(index) = config.rite_uid_index {
        println!("rite_uid_index: {index}");
    }
    println!("cards:          {}", config.cards.len());
    println!("rites:          {}", config.rites().len());
    if !config.sudan_pool_cards().is_empty() {
        println!("sudan pool:     {:?}", config.sudan_pool_cards());
    }
}

fn print_cards(session: &Session) {
    println!(
        "{:>6} {:>9} {:<16} {:>5} {:>4} {:>6} {:>3} {:>6}  {}",
        "uid", "id", "name", "count", "life", "rareup", "bag", "bagpos", "tag"
    );
    for card in &session.config().cards {
        let name = session.catalog().name(card.id).unwrap_or("-");
        let display_name = if card.custom_name.is_empty() {
            name
        } else {
            card.custom_name.as_str()
        };
        println!(
            "{:>6} {:>9} {:<16} {:>5} {:>4} {:>6} {:>3} {:>6}  {}",
            card.uid,
            card.id,
            display_name,
            card.count,
            card.life,
            card.rareup,
            card.bag,
            card.bagpos,
            JsonValue::Object(card.tag.clone()),
        );
    }
}

fn print_rites(session: &Session, rite_catalog: Option<&RiteCatalog>) {
    println!(
        "{:>6} {:>9} {:<20} {:>5} {:>7} {:>11} {:>10} {:>5}  {}",
        "uid", "id", "name", "start", "is_show", "start_round", "start_life", "life", "slots"
    );
    for rite in session.config().rites() {
        let name = rite_catalog
            .and_then(|catalog| catalog.name(rite.id))
            .unwrap_or("-");
        let display_name = if rite.custom_name.is_empty() {
            name
        } else {
            rite.custom_name.as_str()
        };
        let filled = rite.cards.iter().filter(|slot| slot.is_some()).count();
        println!(
            "{:>6} {:>9} {:<20} {:>5} {:>7} {:>11} {:>10} {:>5}  {}/{}",
            rite.uid,
            rite.id,
            display_name,
            rite.start,
            rite.is_show,
            rite.start_round,
            rite.start_life,
            rite.life,
            filled,
            rite.cards.len(),
        );
    }
}

fn print_notes(session: &Session) {
    for (group_index, group) in session.config().notes().iter().enumerate() {
        if group.is_empty() {
            println!("notes[{group_index}]: (empty)");
            continue;
        }
        println!("notes[{group_index}]:");
        for item in group {
            println!(
                "  type={} id={} uid={} count={}",
                item.note_type, item.id, item.uid, item.count
            );
        }
    }
}

fn print_snapshots(session: &Session) -> Result<(), CoreError> {
    let index = ArchiveIndex::load_or_init(session.path())?;
    for (i, slot) in index.slots().iter().enumerate() {
        match slot {
            Some(slot) => println!(
                "{:03} {}  存活天数:{} 苏丹卡剩余:{} 处刑日残余:{}  {}",
                i + 1,
                slot.name,
                slot.live_days,
                slot.left_sudan,
                slot.execution_day,
                slot.save_time,
            ),
            None => println!("{:03} (空)", i + 1),
        }
    }
    Ok(())
}
