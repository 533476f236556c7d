use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;

use log::{info, warn};

use crate::error::CoreError;
use crate::literal;
use crate::save::{Card, Rite, SaveConfig};
use crate::store;
use crate::watch::FileWatcher;

use super::card_catalog::{ADHERENT_TAG, CHAR_TYPE, CardCatalog, SUDAN_TYPE};
use super::validate::{self, EditContext, FieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loaded,
    ConflictPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Replace the in-memory state with whatever is on disk now.
    Reload,
    /// Keep the in-memory state; the next save overwrites the external edit.
    DiscardExternal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    CardEdited(i64),
    CardAdded(i64),
    CardRemoved(i64),
    RiteEdited(i64),
    RiteAdded(i64),
    RiteRemoved(i64),
    RawEdited(String),
    Reloaded,
    Saved,
}

/// Sent to every subscriber after a successful mutation, so each dependent
/// view refreshes from the one owned config instead of sharing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub revision: u64,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    catalog: CardCatalog,
}

impl Engine {
    pub fn new(catalog: CardCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    pub fn open(&self, path: &Path) -> Result<Session, CoreError> {
        let config = store::load_save(path)?;
        Ok(Session {
            path: path.to_path_buf(),
            config,
            catalog: self.catalog.clone(),
            state: SessionState::Loaded,
            watcher: None,
            watch_interval: FileWatcher::DEFAULT_INTERVAL,
            subscribers: Vec::new(),
            revision: 0,
        })
    }
}

/// One open save file. The session is the single owner of its `SaveConfig`;
/// all mutation flows through it and is validated before anything changes.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    config: SaveConfig,
    catalog: CardCatalog,
    state: SessionState,
    watcher: Option<FileWatcher>,
    watch_interval: Duration,
    subscribers: Vec<Sender<ChangeEvent>>,
    revision: u64,
}

impl Session {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self) -> Receiver<ChangeEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, kind: ChangeKind) {
        self.revision += 1;
        let event = ChangeEvent {
            revision: self.revision,
            kind,
        };
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn ensure_editable(&self) -> Result<(), CoreError> {
        match self.state {
            SessionState::Loaded => Ok(()),
            SessionState::ConflictPending => Err(CoreError::conflict(
                "save file changed on disk; reload or discard the external change first",
            )),
        }
    }

    pub fn set_card_field(&mut self, uid: i64, field: &str, input: &str) -> Result<(), CoreError> {
        self.set_card_field_in(uid, field, input, EditContext::ExistingCard)
    }

    pub fn set_card_field_in(
        &mut self,
        uid: i64,
        field: &str,
        input: &str,
        context: EditContext,
    ) -> Result<(), CoreError> {
        self.ensure_editable()?;
        let index = self
            .config
            .card_index(uid)
            .ok_or_else(|| card_not_found(uid))?;
        let normalized = validate::validate_card_field(
            &self.catalog,
            &self.config.cards[index],
            field,
            input,
            context,
        )?;
        apply_card_field(&mut self.config.cards[index], field, normalized)?;
        self.notify(ChangeKind::CardEdited(uid));
        Ok(())
    }

    pub fn set_rite_field(&mut self, uid: i64, field: &str, input: &str) -> Result<(), CoreError> {
        self.ensure_editable()?;
        let index = self
            .config
            .rite_index(uid)
            .ok_or_else(|| rite_not_found(uid))?;
        let normalized = validate::validate_rite_field(field, input)?;
        apply_rite_field(&mut self.config.rites_mut()[index], field, normalized)?;
        self.notify(ChangeKind::RiteEdited(uid));
        Ok(())
    }

    /// Targeted edit of an unmodeled top-level value; the replacement must
    /// keep the existing JSON kind.
    pub fn set_raw(&mut self, key: &str, input: &str) -> Result<(), CoreError> {
        self.ensure_editable()?;
        if SaveConfig::is_modeled_key(key) {
            return Err(CoreError::unsupported(format!(
                "{key} is a modeled field; edit it through its typed operation"
            )));
        }
        let existing = self.config.raw(key).ok_or_else(|| {
            CoreError::business_rule(format!(
                "save has no key {key:?}; use insert_raw to create one"
            ))
        })?;
        let value = validate::validate_raw_edit(key, existing, input)?;
        self.config.set_raw_value(key, value);
        self.notify(ChangeKind::RawEdited(key.to_string()));
        Ok(())
    }

    /// Introduces a new unmodeled top-level key.
    pub fn insert_raw(&mut self, key: &str, input: &str) -> Result<(), CoreError> {
        self.ensure_editable()?;
        if SaveConfig::is_modeled_key(key) {
            return Err(CoreError::unsupported(format!(
                "{key} is a modeled field; edit it through its typed operation"
            )));
        }
        if self.config.raw(key).is_some() {
            return Err(CoreError::business_rule(format!(
                "save already has a key {key:?}; use set_raw to change it"
            )));
        }
        let value = literal::parse_value(input)?;
        self.config.set_raw_value(key, value);
        self.notify(ChangeKind::RawEdited(key.to_string()));
        Ok(())
    }

    /// Creates a card with the editor defaults. Sudan-type ids join the
    /// sudan pool and are tagged with their 1-based pool position; character
    /// ids start as adherents.
    pub fn add_card(&mut self, id: i64) -> Result<i64, CoreError> {
        self.ensure_editable()?;
        let uid = self.config.allocate_card_uid();
        let mut card = Card::with_defaults(uid, id);
        match self.catalog.card_type(id) {
            Some(SUDAN_TYPE) => {
                let pool = self.config.sudan_pool_cards_mut();
                pool.push(id);
                let pool_index = pool.len() as i64;
                card.set_sudan_pool_index(pool_index);
            }
            Some(CHAR_TYPE) => {
                card.tag.insert(ADHERENT_TAG.into(), 1.into());
            }
            _ => {}
        }
        self.config.cards.push(card);
        info!("added card id {id} as uid {uid}");
        self.notify(ChangeKind::CardAdded(uid));
        Ok(uid)
    }

    pub fn remove_card(&mut self, uid: i64) -> Result<(), CoreError> {
        self.ensure_editable()?;
        let index = self
            .config
            .card_index(uid)
            .ok_or_else(|| card_not_found(uid))?;

        if self.catalog.card_type(self.config.cards[index].id) == Some(SUDAN_TYPE) {
            self.shrink_sudan_pool(index);
        }

        self.config.cards.remove(index);
        info!("removed card uid {uid}");
        self.notify(ChangeKind::CardRemoved(uid));
        Ok(())
    }

    /// Drops the removed card's pool entry and renumbers the surviving
    /// in-play sudan cards' position tags so they stay a sub-permutation of
    /// `1..=pool.len()`.
    fn shrink_sudan_pool(&mut self, card_index: usize) {
        let uid = self.config.cards[card_index].uid;
        let Some(removed_pos) = self.config.cards[card_index].sudan_pool_index() else {
            warn!("sudan card uid {uid} carries no sudan_pool_index tag; pool left untouched");
            return;
        };

        let pool = self.config.sudan_pool_cards_mut();
        if removed_pos < 1 || removed_pos as usize > pool.len() {
            warn!(
                "sudan card uid {uid} has sudan_pool_index {removed_pos} outside pool of {}; pool left untouched",
                pool.len()
            );
            return;
        }
        pool.remove(removed_pos as usize - 1);

        let catalog = &self.catalog;
        for (i, card) in self.config.cards.iter_mut().enumerate() {
            if i == card_index || catalog.card_type(card.id) != Some(SUDAN_TYPE) {
                continue;
            }
            if let Some(pos) = card.sudan_pool_index()
                && pos > removed_pos
            {
                card.set_sudan_pool_index(pos - 1);
            }
        }
    }

    pub fn add_rite(&mut self, id: i64) -> Result<i64, CoreError> {
        self.ensure_editable()?;
        let uid = self.config.allocate_rite_uid();
        self.config.rites_mut().push(Rite::with_defaults(uid, id));
        info!("added rite id {id} as uid {uid}");
        self.notify(ChangeKind::RiteAdded(uid));
        Ok(uid)
    }

    pub fn remove_rite(&mut self, uid: i64) -> Result<(), CoreError> {
        self.ensure_editable()?;
        let index = self
            .config
            .rite_index(uid)
            .ok_or_else(|| rite_not_found(uid))?;
        self.config.rites_mut().remove(index);
        info!("removed rite uid {uid}");
        self.notify(ChangeKind::RiteRemoved(uid));
        Ok(())
    }

    /// Interval used by the next [`Session::attach_watch`].
    pub fn set_watch_interval(&mut self, interval: Duration) {
        self.watch_interval = interval;
    }

    pub fn attach_watch(&mut self) -> Result<(), CoreError> {
        if self.watcher.is_none() {
            let watcher = FileWatcher::watch(&self.path, self.watch_interval).map_err(|e| {
                CoreError::io(format!("failed to watch {}: {e}", self.path.display()))
            })?;
            self.watcher = Some(watcher);
        }
        Ok(())
    }

    pub fn detach_watch(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Polls for externally-originated modifications. Any burst of pending
    /// watch events coalesces into a single `Loaded → ConflictPending`
    /// transition; while a conflict is already pending nothing re-triggers.
    /// Returns true exactly when the transition happens.
    pub fn check_external_change(&mut self) -> bool {
        let Some(watcher) = &self.watcher else {
            return false;
        };
        let changed = watcher.drain();
        if changed && self.state == SessionState::Loaded {
            info!("external modification detected on {}", self.path.display());
            self.state = SessionState::ConflictPending;
            return true;
        }
        false
    }

    pub fn resolve_conflict(&mut self, resolution: ConflictResolution) -> Result<(), CoreError> {
        if self.state != SessionState::ConflictPending {
            return Err(CoreError::unsupported(
                "no external-change conflict is pending",
            ));
        }

        match resolution {
            ConflictResolution::Reload => {
                // On failure the session stays in ConflictPending with its
                // previous in-memory state intact.
                let config = store::load_save(&self.path)?;
                self.config = config;
                if let Some(watcher) = &self.watcher {
                    watcher.drain();
                }
                self.state = SessionState::Loaded;
                self.notify(ChangeKind::Reloaded);
            }
            ConflictResolution::DiscardExternal => {
                if let Some(watcher) = &self.watcher {
                    watcher.drain();
                }
                self.state = SessionState::Loaded;
            }
        }
        Ok(())
    }

    /// Writes the config back over the backing file. Precondition (not
    /// enforced here): the caller has confirmed the overwrite with the user.
    /// The watcher is detached for the duration of the write and rebuilt
    /// afterwards, so a self-save can never surface as an external change.
    pub fn save(&mut self) -> Result<(), CoreError> {
        self.ensure_editable()?;
        let was_watching = self.watcher.is_some();
        self.detach_watch();

        let result = store::write_save(&self.config, &self.path);

        if was_watching && let Err(e) = self.attach_watch() {
            warn!("could not re-attach watch after save: {e}");
        }
        result?;
        self.notify(ChangeKind::Saved);
        Ok(())
    }

    /// Snapshots the current in-memory config into the archive slot.
    /// Occupied slots need `allow_overwrite`.
    pub fn snapshot(
        &mut self,
        slot: usize,
        name: &str,
        allow_overwrite: bool,
    ) -> Result<(), CoreError> {
        let mut index = store::ArchiveIndex::load_or_init(&self.path)?;
        index.write_snapshot(&self.config, &self.catalog, slot, name, allow_overwrite)
    }
}

fn apply_card_field(card: &mut Card, field: &str, value: FieldValue) -> Result<(), CoreError> {
    match (field, value) {
        ("count", FieldValue::Int(v)) => card.count = v,
        ("life", FieldValue::Int(v)) => card.life = v,
        ("rareup", FieldValue::Int(v)) => card.rareup = v,
        ("bag", FieldValue::Int(v)) => card.bag = v,
        ("bagpos", FieldValue::Int(v)) => card.bagpos = v,
        ("tag", FieldValue::Mapping(map)) => card.tag = map,
        ("equip_slots", FieldValue::Sequence(items)) => card.equip_slots = items,
        ("equips", FieldValue::Sequence(items)) => card.equips = items,
        ("custom_name", FieldValue::Str(text)) => card.custom_name = text,
        ("custom_text", FieldValue::Str(text)) => card.custom_text = text,
        (other, _) => {
            return Err(CoreError::unsupported(format!(
                "unknown card field {other:?}"
            )));
        }
    }
    Ok(())
}

fn apply_rite_field(rite: &mut Rite, field: &str, value: FieldValue) -> Result<(), CoreError> {
    match (field, value) {
        ("new_born", FieldValue::Bool(v)) => rite.new_born = v,
        ("is_show", FieldValue::Bool(v)) => rite.is_show = v,
        ("start", FieldValue::Bool(v)) => rite.start = v,
        ("start_round", FieldValue::Int(v)) => rite.start_round = v,
        ("start_life", FieldValue::Int(v)) => rite.start_life = v,
        ("life", FieldValue::Int(v)) => rite.life = v,
        ("custom_name", FieldValue::Str(text)) => rite.custom_name = text,
        (other, _) => {
            return Err(CoreError::unsupported(format!(
                "unknown rite field {other:?}"
            )));
        }
    }
    Ok(())
}

fn card_not_found(uid: i64) -> CoreError {
    CoreError::business_rule(format!("no card with uid {uid}"))
}

fn rite_not_found(uid: i64) -> CoreError {
    CoreError::business_rule(format!("no rite with uid {uid}"))
}
