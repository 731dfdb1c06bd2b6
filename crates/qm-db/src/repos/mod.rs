//! Row-level SQL for each table.
//!
//! Functions take a `libsql::Connection` so the unit of work can run them
//! inside a transaction (which dereferences to a connection) and lookups
//! can run them directly.

pub mod item;
pub mod quest;
pub mod reward;
