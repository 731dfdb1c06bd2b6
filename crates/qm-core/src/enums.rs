//! Entity kinds for the Quest Manager schema.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three persisted entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Quest,
    Reward,
    Item,
}

impl EntityKind {
    /// Return the string representation used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quest => "quest",
            Self::Reward => "reward",
            Self::Item => "item",
        }
    }

    /// SQL table backing this entity.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Quest => "quests",
            Self::Reward => "rewards",
            Self::Item => "items",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
