use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Reward;

/// A quest and the rewards it owns.
///
/// `rewards` is always present; a quest without rewards holds an empty vec.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Quest {
    pub quest_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub rewards: Vec<Reward>,
}

impl Quest {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            quest_id: None,
            name: name.into(),
            rewards: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_rewards(mut self, rewards: impl IntoIterator<Item = Reward>) -> Self {
        self.rewards.extend(rewards);
        self
    }

    /// Whether this quest and everything it references have identifiers.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.quest_id.is_some()
            && self.rewards.iter().all(|r| {
                r.reward_id.is_some() && r.item.as_ref().is_none_or(|i| i.item_id.is_some())
            })
    }
}
