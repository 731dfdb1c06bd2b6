use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An item that rewards may grant. Shared, not owned by any reward.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Item {
    pub item_id: Option<i64>,
    pub name: String,
}

impl Item {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            item_id: None,
            name: name.into(),
        }
    }
}
