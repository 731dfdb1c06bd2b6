//! Quest repository. Quests are always read with their rewards hydrated.

use std::collections::BTreeMap;

use libsql::Connection;
use qm_core::entities::Quest;

use crate::error::DatabaseError;
use crate::repos::reward::{all_rewards, rewards_for_quest};

fn row_to_quest(row: &libsql::Row) -> Result<Quest, DatabaseError> {
    Ok(Quest {
        quest_id: Some(row.get::<i64>(0)?),
        name: row.get::<String>(1)?,
        rewards: Vec::new(),
    })
}

/// Insert a new quest row and return its generated id.
pub async fn insert_quest(conn: &Connection, name: &str) -> Result<i64, DatabaseError> {
    conn.execute("INSERT INTO quests (name) VALUES (?1)", [name]).await?;
    Ok(conn.last_insert_rowid())
}

/// Write a quest row under a known id, creating it if it is missing.
pub async fn upsert_quest(
    conn: &Connection,
    quest_id: i64,
    name: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO quests (quest_id, name) VALUES (?1, ?2)
         ON CONFLICT(quest_id) DO UPDATE SET name = excluded.name",
        libsql::params![quest_id, name],
    )
    .await?;
    Ok(())
}

/// Delete a quest and the rewards it owns. Items are left alone.
///
/// Rewards are deleted explicitly so they count toward the returned total
/// of rows deleted.
pub async fn delete_quest(conn: &Connection, quest_id: i64) -> Result<u64, DatabaseError> {
    let rewards = conn
        .execute(
            "DELETE FROM rewards WHERE quest_id = ?1",
            libsql::params![quest_id],
        )
        .await?;
    let quests = conn
        .execute(
            "DELETE FROM quests WHERE quest_id = ?1",
            libsql::params![quest_id],
        )
        .await?;
    Ok(rewards + quests)
}

/// Load one quest with rewards and their items, or `None`.
pub async fn get_quest(
    conn: &Connection,
    quest_id: i64,
) -> Result<Option<Quest>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT quest_id, name FROM quests WHERE quest_id = ?1",
            libsql::params![quest_id],
        )
        .await?;
    let Some(row) = rows.next().await? else {
        return Ok(None);
    };
    let mut quest = row_to_quest(&row)?;
    quest.rewards = rewards_for_quest(conn, quest_id).await?;
    Ok(Some(quest))
}

/// Every quest ordered by id, each with rewards hydrated.
pub async fn list_quests(conn: &Connection) -> Result<Vec<Quest>, DatabaseError> {
    let mut rows = conn
        .query("SELECT quest_id, name FROM quests ORDER BY quest_id", ())
        .await?;
    let mut quests = BTreeMap::new();
    while let Some(row) = rows.next().await? {
        let quest = row_to_quest(&row)?;
        quests.insert(row.get::<i64>(0)?, quest);
    }

    for reward in all_rewards(conn).await? {
        if let Some(quest) = reward.quest_id.and_then(|id| quests.get_mut(&id)) {
            quest.rewards.push(reward);
        }
    }
    Ok(quests.into_values().collect())
}

/// Count rewards owned by a quest.
pub async fn count_rewards(conn: &Connection, quest_id: i64) -> Result<u64, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM rewards WHERE quest_id = ?1",
            libsql::params![quest_id],
        )
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    let count = row.get::<i64>(0)?;
    u64::try_from(count).map_err(|e| DatabaseError::Query(format!("negative count: {e}")))
}
