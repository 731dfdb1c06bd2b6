//! # qm-db
//!
//! libSQL persistence for quests, rewards, and items.
//!
//! [`QuestDb`] owns the connection and schema. [`context::QuestManagerContext`]
//! layers a unit of work on top: stage entity graphs, commit them in one
//! transaction, and read quests back with rewards and items hydrated.
//!
//! Uses the `libsql` crate (C `SQLite` fork) in local mode.

pub mod context;
pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;

#[cfg(test)]
mod test_support;

use error::DatabaseError;
use libsql::Builder;
use qm_config::DatabaseConfig;

/// Database handle for the Quest Manager schema.
///
/// Wraps a libSQL database and its single connection. Dropping the handle
/// closes the connection.
pub struct QuestDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl QuestDb {
    /// Open a local database at the given path (`":memory:"` allowed).
    ///
    /// Foreign keys are enforced and migrations run on every open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        Self::open(&DatabaseConfig::at(path)).await
    }

    /// Open the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Config` for an unusable config, or
    /// `DatabaseError` if opening or migrating fails.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        config.validate()?;

        let db = Builder::new_local(config.path.as_str()).build().await?;
        let conn = db.connect()?;

        // Must be set per connection in SQLite
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let quest_db = Self { db, conn };
        quest_db.run_migrations().await?;
        tracing::debug!(path = %config.path, "opened quest database");
        Ok(quest_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}
