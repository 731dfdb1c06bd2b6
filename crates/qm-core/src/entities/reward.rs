use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Item;

/// A reward granted on quest completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Reward {
    pub reward_id: Option<i64>,
    /// Owning quest. Filled in by the persistence context on save and load.
    pub quest_id: Option<i64>,
    /// Free-form tag: `gold`, `item`, `xp`, ...
    #[serde(rename = "type")]
    pub reward_type: String,
    pub quantity: i64,
    pub item: Option<Item>,
}

impl Reward {
    #[must_use]
    pub fn new(reward_type: impl Into<String>, quantity: i64) -> Self {
        Self {
            reward_type: reward_type.into(),
            quantity,
            ..Self::default()
        }
    }

    /// Attach an item to this reward.
    #[must_use]
    pub fn with_item(mut self, item: Item) -> Self {
        self.item = Some(item);
        self
    }
}
