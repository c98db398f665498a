//! Search Logger half of C15 (spec.md §4.15): persists a `SearchLog` after
//! every retrieval.

use std::sync::Arc;

use conhub_models::search_log::{SearchLog, SearchResultEntry};
use conhub_ports::store::SearchLogStorePort;
use conhub_ports::PortResult;

pub struct SearchLogger {
    store: Arc<dyn SearchLogStorePort>,
}

impl SearchLogger {
    pub fn new(store: Arc<dyn SearchLogStorePort>) -> Self {
        Self { store }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn log(
        &self,
        query: impl Into<String>,
        collection: impl Into<String>,
        results: Vec<SearchResultEntry>,
        used_web_fallback: bool,
        search_latency_ms: u64,
        user_id: Option<String>,
        session_id: Option<String>,
    ) -> PortResult<()> {
        let mut entry = SearchLog::new(query, collection, results, used_web_fallback, search_latency_ms);
        entry.user_id = user_id;
        entry.session_id = session_id;
        self.store.insert(entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingStore {
        logs: Mutex<Vec<SearchLog>>,
    }

    #[async_trait]
    impl SearchLogStorePort for RecordingStore {
        async fn insert(&self, log: SearchLog) -> PortResult<()> {
            self.logs.lock().unwrap().push(log);
            Ok(())
        }

        async fn recent(&self, _window_days: i64) -> PortResult<Vec<SearchLog>> {
            Ok(self.logs.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn log_persists_user_and_session_ids() {
        let store = Arc::new(RecordingStore { logs: Mutex::new(Vec::new()) });
        let logger = SearchLogger::new(store.clone());
        logger
            .log("học phí", "default", vec![], false, 10, Some("u1".to_string()), Some("s1".to_string()))
            .await
            .unwrap();
        let logs = store.logs.lock().unwrap();
        assert_eq!(logs[0].user_id.as_deref(), Some("u1"));
    }
}
