//! Row-parsing and SQL-building helpers shared by the repos.

use libsql::Connection;
use qm_core::entities::Item;
use qm_core::enums::EntityKind;

use crate::error::DatabaseError;

/// Read a nullable INTEGER column.
///
/// `row.get::<i64>(idx)` on a NULL column returns an error, so nullable
/// columns must go through `Option`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_i64(row: &libsql::Row, idx: i32) -> Result<Option<i64>, DatabaseError> {
    Ok(row.get::<Option<i64>>(idx)?)
}

/// Build the item side of a `rewards LEFT JOIN items` row.
///
/// Both columns are NULL when the reward has no item.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if only one of the two columns is set.
pub fn joined_item(
    item_id: Option<i64>,
    name: Option<String>,
) -> Result<Option<Item>, DatabaseError> {
    match (item_id, name) {
        (Some(id), Some(name)) => Ok(Some(Item {
            item_id: Some(id),
            name,
        })),
        (None, None) => Ok(None),
        (Some(id), None) => Err(DatabaseError::InvalidState(format!(
            "{} {id} joined without a name",
            EntityKind::Item
        ))),
        (None, Some(name)) => Err(DatabaseError::InvalidState(format!(
            "{} '{name}' joined without an id",
            EntityKind::Item
        ))),
    }
}

/// `?2, ?3, ...` for an `IN (...)` list whose values start at parameter `first`.
#[must_use]
pub fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fail with `InvalidState` when an entity expected to be saved has no id.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if `id` is `None`.
pub fn require_id(kind: EntityKind, id: Option<i64>) -> Result<i64, DatabaseError> {
    id.ok_or_else(|| DatabaseError::InvalidState(format!("{kind} has no identifier")))
}

/// Whether `kind`'s table holds a row with primary key `id`.
///
/// # Errors
///
/// Returns `DatabaseError` if the query fails.
pub async fn row_exists(
    conn: &Connection,
    kind: EntityKind,
    id: i64,
) -> Result<bool, DatabaseError> {
    let sql = format!("SELECT 1 FROM {} WHERE {kind}_id = ?1", kind.table());
    let mut rows = conn.query(&sql, libsql::params![id]).await?;
    Ok(rows.next().await?.is_some())
}
