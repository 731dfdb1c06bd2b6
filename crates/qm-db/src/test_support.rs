//! Shared test utilities for qm-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use qm_config::LogConfig;
    use tracing_subscriber::EnvFilter;

    use crate::QuestDb;
    use crate::context::QuestManagerContext;

    /// Install a test-writer subscriber filtered by `QUESTMANAGER_LOG`,
    /// falling back to the configured default filter.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_env("QUESTMANAGER_LOG")
            .unwrap_or_else(|_| EnvFilter::new(LogConfig::default().filter));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }

    /// In-memory database with the schema applied.
    pub async fn test_db() -> QuestDb {
        init_tracing();
        QuestDb::open_local(":memory:").await.unwrap()
    }

    /// In-memory context. Everything it saves dies with it.
    pub async fn test_context() -> QuestManagerContext {
        QuestManagerContext::from_db(test_db().await)
    }
}
