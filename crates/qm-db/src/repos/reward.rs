//! Reward repository. Rewards are read joined with their optional item.

use libsql::Connection;
use qm_core::entities::Reward;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_i64, joined_item, placeholders};

const SELECT_REWARD: &str = "SELECT r.reward_id, r.quest_id, r.type, r.quantity, i.item_id, i.name
     FROM rewards r LEFT JOIN items i ON i.item_id = r.item_id";

fn row_to_reward(row: &libsql::Row) -> Result<Reward, DatabaseError> {
    Ok(Reward {
        reward_id: Some(row.get::<i64>(0)?),
        quest_id: Some(row.get::<i64>(1)?),
        reward_type: row.get::<String>(2)?,
        quantity: row.get::<i64>(3)?,
        item: joined_item(get_opt_i64(row, 4)?, row.get::<Option<String>>(5)?)?,
    })
}

async fn collect(mut rows: libsql::Rows) -> Result<Vec<Reward>, DatabaseError> {
    let mut rewards = Vec::new();
    while let Some(row) = rows.next().await? {
        rewards.push(row_to_reward(&row)?);
    }
    Ok(rewards)
}

fn item_id_of(reward: &Reward) -> Option<i64> {
    reward.item.as_ref().and_then(|item| item.item_id)
}

/// Insert a reward under `quest_id` and return its generated id.
///
/// The reward's item, if any, must already have an id.
pub async fn insert_reward(
    conn: &Connection,
    quest_id: i64,
    reward: &Reward,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO rewards (quest_id, type, quantity, item_id) VALUES (?1, ?2, ?3, ?4)",
        libsql::params![
            quest_id,
            reward.reward_type.as_str(),
            reward.quantity,
            item_id_of(reward)
        ],
    )
    .await?;
    Ok(conn.last_insert_rowid())
}

/// Write a reward under a known id, creating the row if it is missing.
pub async fn upsert_reward(
    conn: &Connection,
    reward_id: i64,
    quest_id: i64,
    reward: &Reward,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO rewards (reward_id, quest_id, type, quantity, item_id)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(reward_id) DO UPDATE SET
           quest_id = excluded.quest_id, type = excluded.type,
           quantity = excluded.quantity, item_id = excluded.item_id",
        libsql::params![
            reward_id,
            quest_id,
            reward.reward_type.as_str(),
            reward.quantity,
            item_id_of(reward)
        ],
    )
    .await?;
    Ok(())
}

pub async fn get_reward(
    conn: &Connection,
    reward_id: i64,
) -> Result<Option<Reward>, DatabaseError> {
    let rows = conn
        .query(
            &format!("{SELECT_REWARD} WHERE r.reward_id = ?1"),
            libsql::params![reward_id],
        )
        .await?;
    Ok(collect(rows).await?.into_iter().next())
}

/// Rewards of one quest with items hydrated, in insertion order.
pub async fn rewards_for_quest(
    conn: &Connection,
    quest_id: i64,
) -> Result<Vec<Reward>, DatabaseError> {
    let rows = conn
        .query(
            &format!("{SELECT_REWARD} WHERE r.quest_id = ?1 ORDER BY r.reward_id"),
            libsql::params![quest_id],
        )
        .await?;
    collect(rows).await
}

/// Every reward, grouped by quest, each group in insertion order.
pub async fn all_rewards(conn: &Connection) -> Result<Vec<Reward>, DatabaseError> {
    let rows = conn
        .query(&format!("{SELECT_REWARD} ORDER BY r.quest_id, r.reward_id"), ())
        .await?;
    collect(rows).await
}

/// Delete the quest's rewards whose ids are not in `keep`. Returns rows deleted.
pub async fn delete_rewards_except(
    conn: &Connection,
    quest_id: i64,
    keep: &[i64],
) -> Result<u64, DatabaseError> {
    if keep.is_empty() {
        return Ok(conn
            .execute(
                "DELETE FROM rewards WHERE quest_id = ?1",
                libsql::params![quest_id],
            )
            .await?);
    }

    let sql = format!(
        "DELETE FROM rewards WHERE quest_id = ?1 AND reward_id NOT IN ({})",
        placeholders(2, keep.len())
    );
    let params: Vec<libsql::Value> = std::iter::once(quest_id)
        .chain(keep.iter().copied())
        .map(libsql::Value::Integer)
        .collect();
    Ok(conn.execute(&sql, params).await?)
}
