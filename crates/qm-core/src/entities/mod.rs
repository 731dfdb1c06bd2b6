//! Entity structs for the Quest Manager schema.
//!
//! Each entity maps to a table in the libSQL database (`quests`, `rewards`,
//! `items`). All structs derive `Serialize`, `Deserialize`, and `JsonSchema`
//! for JSON roundtrip and schema validation.

mod item;
mod quest;
mod reward;

pub use item::Item;
pub use quest::Quest;
pub use reward::Reward;
