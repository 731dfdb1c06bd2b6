//! Item repository.

use libsql::Connection;
use qm_core::entities::Item;

use crate::error::DatabaseError;

fn row_to_item(row: &libsql::Row) -> Result<Item, DatabaseError> {
    Ok(Item {
        item_id: Some(row.get::<i64>(0)?),
        name: row.get::<String>(1)?,
    })
}

/// Insert a new item and return its generated id.
pub async fn insert_item(conn: &Connection, name: &str) -> Result<i64, DatabaseError> {
    conn.execute("INSERT INTO items (name) VALUES (?1)", [name]).await?;
    Ok(conn.last_insert_rowid())
}

/// Write an item under a known id, creating the row if it is missing.
pub async fn upsert_item(
    conn: &Connection,
    item_id: i64,
    name: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO items (item_id, name) VALUES (?1, ?2)
         ON CONFLICT(item_id) DO UPDATE SET name = excluded.name",
        libsql::params![item_id, name],
    )
    .await?;
    Ok(())
}

pub async fn get_item(conn: &Connection, item_id: i64) -> Result<Option<Item>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT item_id, name FROM items WHERE item_id = ?1",
            libsql::params![item_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_item(&row)?)),
        None => Ok(None),
    }
}
