//! Save-then-reload scenarios across separate contexts.
//!
//! Every test saves in one `QuestManagerContext` and reads back in a fresh
//! one opened on the same database file, so nothing is served from memory.

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

use qm_config::DatabaseConfig;
use qm_core::entities::{Item, Quest, Reward};
use qm_db::context::QuestManagerContext;
use qm_db::error::DatabaseError;

struct TestStore {
    _dir: TempDir,
    path: String,
}

impl TestStore {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quests.db").to_string_lossy().into_owned();
        Self { _dir: dir, path }
    }

    async fn context(&self) -> QuestManagerContext {
        QuestManagerContext::open_local(&self.path).await.unwrap()
    }

    /// Save `quest` in its own context and return the tracked copy with ids.
    async fn save(&self, quest: Quest) -> Quest {
        let mut ctx = self.context().await;
        let key = ctx.add(quest);
        ctx.save().await.unwrap();
        ctx.quest(key).unwrap().clone()
    }

    async fn reload(&self, quest_id: i64) -> Quest {
        self.context()
            .await
            .find_quest(quest_id)
            .await
            .unwrap()
            .expect("quest should exist")
    }
}

#[tokio::test]
async fn find_quest_by_id_matches_added_quest() {
    let store = TestStore::new();
    let expected = store.save(Quest::new("Test Quest #1")).await;

    let actual = store.reload(expected.quest_id.unwrap()).await;
    assert_eq!(actual.quest_id, expected.quest_id);
    assert_eq!(actual.name, "Test Quest #1");
}

#[tokio::test]
async fn quest_without_rewards_reloads_with_empty_rewards() {
    let store = TestStore::new();
    let saved = store.save(Quest::new("Test Quest #1")).await;

    let actual = store.reload(saved.quest_id.unwrap()).await;
    assert!(actual.rewards.is_empty());
}

#[tokio::test]
async fn quest_with_rewards_reloads_every_reward() {
    let store = TestStore::new();
    let saved = store
        .save(Quest::new("Test Quest #1").with_rewards([
            Reward::new("gold", 500),
            Reward::new("item", 600),
        ]))
        .await;

    let actual = store.reload(saved.quest_id.unwrap()).await;
    assert_eq!(actual.rewards.len(), 2);
    assert_eq!(actual.rewards, saved.rewards);
}

#[tokio::test]
async fn reward_associated_to_item_reloads_item() {
    let store = TestStore::new();
    let saved = store
        .save(
            Quest::new("Test Quest #1")
                .with_rewards([Reward::new("item", 1).with_item(Item::new("Item #1"))]),
        )
        .await;
    let item = saved.rewards[0].item.clone().unwrap();

    let actual = store.reload(saved.quest_id.unwrap()).await;
    assert_eq!(actual.rewards.len(), 1);
    let loaded = actual.rewards[0].item.as_ref().unwrap();
    assert_eq!(loaded.item_id, item.item_id);
    assert_eq!(loaded.name, "Item #1");
}

#[tokio::test]
async fn reward_not_associated_to_item_does_not_require_one() {
    let store = TestStore::new();
    let saved = store
        .save(Quest::new("Test Quest #1").with_rewards([Reward::new("gold", 500)]))
        .await;

    let actual = store.reload(saved.quest_id.unwrap()).await;
    assert_eq!(actual.rewards.len(), 1);
    assert!(actual.rewards[0].item.is_none());
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(3)]
#[case(12)]
#[tokio::test]
async fn reward_count_survives_reload(#[case] count: i64) {
    let store = TestStore::new();
    let rewards = (0..count).map(|n| Reward::new("gold", n * 100));
    let saved = store.save(Quest::new("counted").with_rewards(rewards)).await;

    let actual = store.reload(saved.quest_id.unwrap()).await;
    assert_eq!(actual.rewards.len(), usize::try_from(count).unwrap());
    let quantities: Vec<i64> = actual.rewards.iter().map(|r| r.quantity).collect();
    let expected: Vec<i64> = (0..count).map(|n| n * 100).collect();
    assert_eq!(quantities, expected);
}

#[tokio::test]
async fn find_unknown_quest_is_none() {
    let store = TestStore::new();
    let ctx = store.context().await;
    assert!(ctx.find_quest(12_345).await.unwrap().is_none());
}

#[tokio::test]
async fn resaving_reloaded_quest_does_not_duplicate_rows() {
    let store = TestStore::new();
    let saved = store
        .save(Quest::new("q").with_rewards([
            Reward::new("gold", 1).with_item(Item::new("Coin purse")),
        ]))
        .await;
    let quest_id = saved.quest_id.unwrap();

    let reloaded = store.reload(quest_id).await;
    let mut ctx = store.context().await;
    ctx.add(reloaded);
    ctx.save().await.unwrap();

    let ctx = store.context().await;
    assert_eq!(ctx.list_quests().await.unwrap().len(), 1);
    assert_eq!(ctx.reward_count(quest_id).await.unwrap(), 1);
    assert_eq!(store.reload(quest_id).await, saved);
}

#[tokio::test]
async fn shared_item_is_stored_once() {
    let store = TestStore::new();

    let mut ctx = store.context().await;
    let item_key = ctx.add_item(Item::new("Potion"));
    ctx.save().await.unwrap();
    let potion = ctx.item(item_key).unwrap().clone();
    drop(ctx);

    let grant = |qty| Reward::new("item", qty).with_item(potion.clone());
    let first = store.save(Quest::new("first").with_rewards([grant(1)])).await;
    let second = store.save(Quest::new("second").with_rewards([grant(2)])).await;

    let a = store.reload(first.quest_id.unwrap()).await;
    let b = store.reload(second.quest_id.unwrap()).await;
    assert_eq!(a.rewards[0].item, Some(potion.clone()));
    assert_eq!(b.rewards[0].item, Some(potion));

    let ctx = store.context().await;
    let mut rows = ctx
        .db()
        .conn()
        .query("SELECT COUNT(*) FROM items", ())
        .await
        .unwrap();
    let row = rows.next().await.unwrap().unwrap();
    assert_eq!(row.get::<i64>(0).unwrap(), 1);
}

#[tokio::test]
async fn removing_quest_cascades_to_rewards_but_not_items() {
    let store = TestStore::new();
    let saved = store
        .save(Quest::new("doomed").with_rewards([
            Reward::new("item", 1).with_item(Item::new("Relic")),
            Reward::new("gold", 50),
        ]))
        .await;
    let quest_id = saved.quest_id.unwrap();
    let reward_id = saved.rewards[0].reward_id.unwrap();
    let item_id = saved.rewards[0].item.as_ref().unwrap().item_id.unwrap();

    let mut ctx = store.context().await;
    ctx.remove_quest(quest_id);
    ctx.save().await.unwrap();

    let ctx = store.context().await;
    assert!(ctx.find_quest(quest_id).await.unwrap().is_none());
    assert!(ctx.find_reward(reward_id).await.unwrap().is_none());
    assert_eq!(ctx.find_item(item_id).await.unwrap().unwrap().name, "Relic");
}

#[tokio::test]
async fn failed_save_commits_nothing() {
    let store = TestStore::new();

    let mut ctx = store.context().await;
    ctx.add(Quest::new("partial").with_rewards([Reward::new("gold", 1)]));
    ctx.add_item(Item::new("orphan item"));
    ctx.add_reward(9_999, Reward::new("gold", 1));
    let err = ctx.save().await.unwrap_err();
    assert!(matches!(err, DatabaseError::ConstraintViolation(_)), "got {err}");
    drop(ctx);

    let ctx = store.context().await;
    assert!(ctx.list_quests().await.unwrap().is_empty());
    assert!(ctx.find_item(1).await.unwrap().is_none());
}

#[tokio::test]
async fn open_from_config() {
    let store = TestStore::new();
    let config = DatabaseConfig::at(store.path.as_str());

    let mut ctx = QuestManagerContext::open(&config).await.unwrap();
    let key = ctx.add(Quest::new("configured"));
    ctx.save().await.unwrap();
    let quest_id = ctx.quest(key).unwrap().quest_id.unwrap();
    assert_eq!(ctx.close(), 0);

    assert_eq!(store.reload(quest_id).await.name, "configured");
}

#[tokio::test]
async fn dropped_context_discards_unsaved_changes() {
    let store = TestStore::new();
    {
        let mut ctx = store.context().await;
        ctx.add(Quest::new("never saved"));
    }
    let ctx = store.context().await;
    assert!(ctx.list_quests().await.unwrap().is_empty());
}

#[tokio::test]
async fn reward_added_by_id_survives_quest_rename() {
    let store = TestStore::new();
    let quest_id = store.save(Quest::new("q")).await.quest_id.unwrap();

    let mut ctx = store.context().await;
    let quest_key = ctx.add(store.reload(quest_id).await);
    ctx.save().await.unwrap();
    ctx.add_reward(quest_id, Reward::new("gold", 10));
    ctx.save().await.unwrap();
    ctx.quest_mut(quest_key).unwrap().name = "renamed".into();
    assert_eq!(ctx.save().await.unwrap().deleted, 0);
    drop(ctx);

    let actual = store.reload(quest_id).await;
    assert_eq!(actual.name, "renamed");
    assert_eq!(actual.rewards.len(), 1);
    assert_eq!(actual.rewards[0].reward_type, "gold");
}

#[tokio::test]
async fn dangling_reward_rejected_when_opened_from_config() {
    let store = TestStore::new();
    let config = DatabaseConfig::at(store.path.as_str());

    let mut ctx = QuestManagerContext::open(&config).await.unwrap();
    ctx.add_reward(404, Reward::new("gold", 1));
    let err = ctx.save().await.unwrap_err();
    assert!(matches!(err, DatabaseError::ConstraintViolation(_)), "got {err}");
    drop(ctx);

    let ctx = store.context().await;
    assert_eq!(ctx.reward_count(404).await.unwrap(), 0);
}
