//! Unit of work over quests, rewards, and items.
//!
//! `QuestManagerContext` owns a `QuestDb` and a list of tracked entries.
//! Nothing touches storage until [`QuestManagerContext::save`], which writes
//! every pending entry inside one transaction:
//!
//! 1. Begin transaction
//! 2. For each pending entry, write items, then the quest, then its rewards
//! 3. Commit, or roll back on the first failure
//! 4. On commit only, copy generated ids back into the tracked entities
//!
//! A failed save leaves tracked entities exactly as they were before it.

use std::collections::{HashMap, HashSet};

use libsql::Connection;
use qm_config::DatabaseConfig;
use qm_core::entities::{Item, Quest, Reward};
use qm_core::enums::EntityKind;
use tracing::{debug, info, warn};

use crate::QuestDb;
use crate::error::DatabaseError;
use crate::helpers::{require_id, row_exists};
use crate::repos::{item, quest, reward};

/// Handle to a quest staged with [`QuestManagerContext::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuestKey(usize);

/// Handle to an item staged with [`QuestManagerContext::add_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey(usize);

/// Handle to a reward staged with [`QuestManagerContext::add_reward`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RewardKey(usize);

/// Any of the typed entry handles.
pub trait EntryKey: Copy {
    #[doc(hidden)]
    fn index(self) -> usize;
}

impl EntryKey for QuestKey {
    fn index(self) -> usize {
        self.0
    }
}

impl EntryKey for ItemKey {
    fn index(self) -> usize {
        self.0
    }
}

impl EntryKey for RewardKey {
    fn index(self) -> usize {
        self.0
    }
}

/// Change-tracking state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Staged, never saved.
    Added,
    /// Saved before, changed since.
    Modified,
    /// Matches what the last save wrote.
    Unchanged,
    /// Removal staged, not yet saved.
    Deleted,
    /// Removed from storage; no longer written.
    Detached,
}

impl EntryState {
    const fn is_pending(self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }
}

/// Rows written by one [`QuestManagerContext::save`].
///
/// An entity that already carries an id counts as inserted when its row did
/// not exist yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
}

impl SaveSummary {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.inserted + self.updated + self.deleted
    }

    const fn tally(&mut self, existed: bool) {
        if existed {
            self.updated += 1;
        } else {
            self.inserted += 1;
        }
    }
}

#[derive(Debug, Clone)]
enum Tracked {
    Quest(Quest),
    Item(Item),
    /// `quest_id` on the reward is always set.
    Reward(Reward),
    QuestRemoval(i64),
}

/// Bookkeeping threaded through the writers of one save.
#[derive(Debug, Default)]
struct Batch {
    summary: SaveSummary,
    /// Reward ids owned by standalone reward entries, per quest. Orphan
    /// pruning never deletes them.
    standalone: HashMap<i64, Vec<i64>>,
}

#[derive(Debug)]
struct Entry {
    state: EntryState,
    entity: Tracked,
}

/// Scoped unit of work over one database connection.
///
/// Open one per logical operation; the connection is released when the
/// context is dropped or [`closed`](Self::close).
pub struct QuestManagerContext {
    db: QuestDb,
    entries: Vec<Entry>,
}

impl QuestManagerContext {
    /// Open a context on the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        Ok(Self::from_db(QuestDb::open(config).await?))
    }

    /// Open a context on a local database file (or `":memory:"`).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        Ok(Self::from_db(QuestDb::open_local(path).await?))
    }

    /// Wrap an already opened database.
    #[must_use]
    pub const fn from_db(db: QuestDb) -> Self {
        Self {
            db,
            entries: Vec::new(),
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &QuestDb {
        &self.db
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    /// Stage a quest with its rewards and their items.
    ///
    /// A quest that already has an id is written as an update on save.
    pub fn add(&mut self, quest: Quest) -> QuestKey {
        QuestKey(self.track(Tracked::Quest(quest)))
    }

    /// Stage a standalone item.
    pub fn add_item(&mut self, item: Item) -> ItemKey {
        ItemKey(self.track(Tracked::Item(item)))
    }

    /// Stage a reward for an existing quest.
    ///
    /// A missing quest is reported by [`save`](Self::save) as
    /// `DatabaseError::ConstraintViolation`.
    pub fn add_reward(&mut self, quest_id: i64, mut reward: Reward) -> RewardKey {
        reward.quest_id = Some(quest_id);
        RewardKey(self.track(Tracked::Reward(reward)))
    }

    /// Stage deletion of a quest. Its rewards go with it; items stay.
    pub fn remove_quest(&mut self, quest_id: i64) {
        self.entries.push(Entry {
            state: EntryState::Deleted,
            entity: Tracked::QuestRemoval(quest_id),
        });
    }

    fn track(&mut self, entity: Tracked) -> usize {
        self.entries.push(Entry {
            state: EntryState::Added,
            entity,
        });
        self.entries.len() - 1
    }

    // -----------------------------------------------------------------------
    // Tracked entities
    // -----------------------------------------------------------------------

    /// The tracked quest, with ids filled in once saved.
    #[must_use]
    pub fn quest(&self, key: QuestKey) -> Option<&Quest> {
        match &self.entries.get(key.0)?.entity {
            Tracked::Quest(quest) => Some(quest),
            _ => None,
        }
    }

    /// Mutable access to a tracked quest. Marks a saved quest as modified.
    pub fn quest_mut(&mut self, key: QuestKey) -> Option<&mut Quest> {
        let entry = self.entries.get_mut(key.0)?;
        let Tracked::Quest(quest) = &mut entry.entity else {
            return None;
        };
        mark_modified(&mut entry.state);
        Some(quest)
    }

    #[must_use]
    pub fn item(&self, key: ItemKey) -> Option<&Item> {
        match &self.entries.get(key.0)?.entity {
            Tracked::Item(item) => Some(item),
            _ => None,
        }
    }

    /// Mutable access to a tracked item. Marks a saved item as modified.
    pub fn item_mut(&mut self, key: ItemKey) -> Option<&mut Item> {
        let entry = self.entries.get_mut(key.0)?;
        let Tracked::Item(item) = &mut entry.entity else {
            return None;
        };
        mark_modified(&mut entry.state);
        Some(item)
    }

    #[must_use]
    pub fn reward(&self, key: RewardKey) -> Option<&Reward> {
        match &self.entries.get(key.0)?.entity {
            Tracked::Reward(reward) => Some(reward),
            _ => None,
        }
    }

    /// Change-tracking state of any staged entry.
    #[must_use]
    pub fn state(&self, key: impl EntryKey) -> Option<EntryState> {
        self.entries.get(key.index()).map(|e| e.state)
    }

    /// Number of entries the next save will write.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.entries.iter().filter(|e| e.state.is_pending()).count()
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.pending_changes() > 0
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Commit every pending entry in one transaction.
    ///
    /// Generated ids are copied into the tracked entities only after the
    /// commit succeeds. Saving with nothing pending is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::ConstraintViolation` for a relationship that
    /// points at a missing row, or another `DatabaseError` if a write fails.
    /// Either way the transaction is rolled back and nothing is committed.
    pub async fn save(&mut self) -> Result<SaveSummary, DatabaseError> {
        let mut work: Vec<(usize, EntryState, Tracked)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.state.is_pending())
            .map(|(idx, e)| (idx, e.state, e.entity.clone()))
            .collect();
        if work.is_empty() {
            debug!("save: nothing pending");
            return Ok(SaveSummary::default());
        }

        let mut batch = Batch {
            standalone: self.standalone_rewards(),
            ..Batch::default()
        };
        let tx = self.db.conn().transaction().await?;
        let written = write_all(&tx, &mut work, &mut batch).await;
        if let Err(error) = written {
            warn!(%error, pending = work.len(), "save failed; rolling back");
            if let Err(rollback_error) = tx.rollback().await {
                warn!(%rollback_error, "rollback failed");
            }
            return Err(error);
        }
        tx.commit().await?;

        let mut removed = HashSet::new();
        for (idx, state, entity) in work {
            if let Tracked::QuestRemoval(quest_id) = entity {
                removed.insert(quest_id);
            }
            let entry = &mut self.entries[idx];
            entry.entity = entity;
            entry.state = if state == EntryState::Deleted {
                EntryState::Detached
            } else {
                EntryState::Unchanged
            };
        }
        self.detach_removed(&removed);

        let summary = batch.summary;
        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            "save committed"
        );
        Ok(summary)
    }

    /// Saved standalone rewards grouped by quest id.
    fn standalone_rewards(&self) -> HashMap<i64, Vec<i64>> {
        let mut owned: HashMap<i64, Vec<i64>> = HashMap::new();
        for entry in &self.entries {
            if let (EntryState::Unchanged, Tracked::Reward(r)) = (entry.state, &entry.entity) {
                if let (Some(quest_id), Some(reward_id)) = (r.quest_id, r.reward_id) {
                    owned.entry(quest_id).or_default().push(reward_id);
                }
            }
        }
        owned
    }

    /// Tracked quests whose rows were just deleted, and standalone rewards
    /// that went with them, stop being written.
    fn detach_removed(&mut self, removed: &HashSet<i64>) {
        if removed.is_empty() {
            return;
        }
        for entry in &mut self.entries {
            let quest_id = match &entry.entity {
                Tracked::Quest(q) => q.quest_id,
                Tracked::Reward(r) => r.quest_id,
                Tracked::Item(_) | Tracked::QuestRemoval(_) => None,
            };
            if quest_id.is_some_and(|id| removed.contains(&id)) {
                entry.state = EntryState::Detached;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Load a quest by id with rewards and their items hydrated.
    ///
    /// Returns `Ok(None)` when no such quest exists. Rewards come back in
    /// insertion order; a quest without rewards has an empty `rewards`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_quest(&self, quest_id: i64) -> Result<Option<Quest>, DatabaseError> {
        quest::get_quest(self.db.conn(), quest_id).await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_item(&self, item_id: i64) -> Result<Option<Item>, DatabaseError> {
        item::get_item(self.db.conn(), item_id).await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_reward(&self, reward_id: i64) -> Result<Option<Reward>, DatabaseError> {
        reward::get_reward(self.db.conn(), reward_id).await
    }

    /// All quests ordered by id, hydrated like [`find_quest`](Self::find_quest).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_quests(&self) -> Result<Vec<Quest>, DatabaseError> {
        quest::list_quests(self.db.conn()).await
    }

    /// Number of stored rewards owned by a quest.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn reward_count(&self, quest_id: i64) -> Result<u64, DatabaseError> {
        quest::count_rewards(self.db.conn(), quest_id).await
    }

    /// Release the connection now. Returns how many pending entries were discarded.
    pub fn close(mut self) -> usize {
        let discarded = self.pending_changes();
        if discarded > 0 {
            warn!(discarded, "closing context with unsaved changes");
        }
        self.entries.clear();
        discarded
    }
}

impl Drop for QuestManagerContext {
    fn drop(&mut self) {
        let pending = self.pending_changes();
        if pending > 0 {
            warn!(pending, "dropping context with unsaved changes");
        }
        debug!("context released");
    }
}

fn mark_modified(state: &mut EntryState) {
    if *state == EntryState::Unchanged {
        *state = EntryState::Modified;
    }
}

async fn write_all(
    conn: &Connection,
    work: &mut [(usize, EntryState, Tracked)],
    batch: &mut Batch,
) -> Result<(), DatabaseError> {
    for (_, state, entity) in work.iter_mut() {
        match entity {
            Tracked::Quest(q) => {
                write_quest(conn, q, *state == EntryState::Modified, batch).await?;
            }
            Tracked::Item(i) => write_item(conn, i, &mut batch.summary).await?,
            Tracked::Reward(r) => {
                let quest_id = require_id(EntityKind::Quest, r.quest_id)?;
                if let Some(i) = r.item.as_mut() {
                    write_item(conn, i, &mut batch.summary).await?;
                }
                let reward_id = write_reward(conn, quest_id, r, &mut batch.summary).await?;
                batch.standalone.entry(quest_id).or_default().push(reward_id);
            }
            Tracked::QuestRemoval(quest_id) => {
                batch.summary.deleted += quest::delete_quest(conn, *quest_id).await?;
            }
        }
    }
    Ok(())
}

/// Items first, then the quest row, then its rewards.
///
/// For a modified quest, stored rewards missing from `rewards` are deleted
/// unless a standalone reward entry owns them.
async fn write_quest(
    conn: &Connection,
    q: &mut Quest,
    prune_orphans: bool,
    batch: &mut Batch,
) -> Result<(), DatabaseError> {
    for r in &mut q.rewards {
        if let Some(i) = r.item.as_mut() {
            write_item(conn, i, &mut batch.summary).await?;
        }
    }

    let quest_id = match q.quest_id {
        Some(id) => {
            let existed = row_exists(conn, EntityKind::Quest, id).await?;
            quest::upsert_quest(conn, id, &q.name).await?;
            batch.summary.tally(existed);
            id
        }
        None => {
            let id = quest::insert_quest(conn, &q.name).await?;
            batch.summary.inserted += 1;
            id
        }
    };
    q.quest_id = Some(quest_id);

    for r in &mut q.rewards {
        r.quest_id = Some(quest_id);
        write_reward(conn, quest_id, r, &mut batch.summary).await?;
    }

    if prune_orphans {
        let mut keep: Vec<i64> = q.rewards.iter().filter_map(|r| r.reward_id).collect();
        if let Some(owned) = batch.standalone.get(&quest_id) {
            keep.extend(owned);
        }
        batch.summary.deleted += reward::delete_rewards_except(conn, quest_id, &keep).await?;
    }
    debug!(quest_id, rewards = q.rewards.len(), "quest written");
    Ok(())
}

async fn write_item(
    conn: &Connection,
    i: &mut Item,
    summary: &mut SaveSummary,
) -> Result<(), DatabaseError> {
    match i.item_id {
        Some(id) => {
            let existed = row_exists(conn, EntityKind::Item, id).await?;
            item::upsert_item(conn, id, &i.name).await?;
            summary.tally(existed);
        }
        None => {
            i.item_id = Some(item::insert_item(conn, &i.name).await?);
            summary.inserted += 1;
        }
    }
    Ok(())
}

/// Write one reward and return its id. The reward's item must already carry an id.
async fn write_reward(
    conn: &Connection,
    quest_id: i64,
    r: &mut Reward,
    summary: &mut SaveSummary,
) -> Result<i64, DatabaseError> {
    if let Some(i) = &r.item {
        require_id(EntityKind::Item, i.item_id)?;
    }
    let reward_id = match r.reward_id {
        Some(id) => {
            let existed = row_exists(conn, EntityKind::Reward, id).await?;
            reward::upsert_reward(conn, id, quest_id, r).await?;
            summary.tally(existed);
            id
        }
        None => {
            let id = reward::insert_reward(conn, quest_id, r).await?;
            summary.inserted += 1;
            id
        }
    };
    r.reward_id = Some(reward_id);
    Ok(reward_id)
}
