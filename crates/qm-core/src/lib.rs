//! # qm-core
//!
//! Core types for the Quest Manager data layer.
//!
//! This crate provides the types shared across the Quest Manager crates:
//! - Entity structs for quests, rewards, and items
//! - `EntityKind` for naming entities in errors and SQL
//!
//! Entities carry `Option<i64>` identifiers: `None` while transient, `Some`
//! once a persistence context has saved them.

pub mod entities;
pub mod enums;
