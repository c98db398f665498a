//! Knowledge Gap detection half of C15 (spec.md §4.15): aggregates recent
//! search logs by normalized query pattern and upserts a `KnowledgeGap`
//! for patterns that are frequent and poorly answered.

use std::collections::HashMap;
use std::sync::Arc;

use conhub_models::search_log::{normalize_query_pattern, KnowledgeGap, SearchLog};
use conhub_ports::store::{KnowledgeGapStorePort, SearchLogStorePort};
use conhub_ports::PortResult;
use tracing::info;

/// Mirrors `conhub_models::search_log`'s private `priority_from` formula
/// (§3): priority = f(query_count, 1 - avg_score), clamped to [0, 10].
fn priority_from(query_count: u64, avg_score: f32) -> u8 {
    let raw = (query_count as f32).ln_1p() * (1.0 - avg_score) * 4.0;
    raw.round().clamp(0.0, 10.0) as u8
}

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_MIN_QUERIES: usize = 3;
pub const DEFAULT_MAX_SCORE: f32 = 0.5;

pub struct GapDetector {
    search_logs: Arc<dyn SearchLogStorePort>,
    gaps: Arc<dyn KnowledgeGapStorePort>,
    window_days: i64,
    min_queries: usize,
    max_score: f32,
}

impl GapDetector {
    pub fn new(search_logs: Arc<dyn SearchLogStorePort>, gaps: Arc<dyn KnowledgeGapStorePort>) -> Self {
        Self {
            search_logs,
            gaps,
            window_days: DEFAULT_WINDOW_DAYS,
            min_queries: DEFAULT_MIN_QUERIES,
            max_score: DEFAULT_MAX_SCORE,
        }
    }

    /// Runs one aggregation pass, upserting a `KnowledgeGap` per qualifying
    /// query pattern. Returns the topics that were created or extended.
    pub async fn run(&self) -> PortResult<Vec<String>> {
        let logs = self.search_logs.recent(self.window_days).await?;
        let mut by_pattern: HashMap<String, Vec<&SearchLog>> = HashMap::new();
        for log in &logs {
            by_pattern.entry(normalize_query_pattern(&log.query)).or_default().push(log);
        }

        let mut touched = Vec::new();
        for (pattern, entries) in by_pattern {
            if entries.len() < self.min_queries {
                continue;
            }
            let top_score = entries.iter().map(|l| l.top_score).fold(0.0_f32, f32::max);
            if top_score >= self.max_score {
                continue;
            }

            self.upsert_gap(&pattern, &entries).await?;
            touched.push(pattern);
        }

        info!(gaps_touched = touched.len(), "knowledge gap aggregation pass completed");
        Ok(touched)
    }

    /// Recomputes the gap's window-derived fields (`sample_queries`,
    /// `query_count`, `avg_score`, `last_query_at`, `priority`) from scratch
    /// against the current set of matching logs, rather than incrementally
    /// extending a persisted counter — `recent()` re-scans the whole window
    /// on every run, so extending would double-count logs seen by a prior
    /// run. Identity fields (`id`, `status`, `first_detected_at`,
    /// `resolution_notes`) are preserved across runs.
    async fn upsert_gap(&self, pattern: &str, entries: &[&SearchLog]) -> PortResult<()> {
        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|l| l.timestamp);

        let mut gap = match self.gaps.find_by_topic(pattern).await? {
            Some(existing) => existing,
            None => {
                let first = sorted.first().expect("entries is non-empty");
                KnowledgeGap::new(pattern, first.query.clone(), first.top_score)
            }
        };

        let mut sample_queries = Vec::new();
        for log in sorted.iter().rev() {
            if sample_queries.len() >= conhub_models::search_log::MAX_SAMPLE_QUERIES {
                break;
            }
            if !sample_queries.contains(&log.query) {
                sample_queries.push(log.query.clone());
            }
        }

        let avg_score = sorted.iter().map(|l| l.top_score as f64).sum::<f64>() / sorted.len() as f64;

        gap.sample_queries = sample_queries;
        gap.query_count = sorted.len() as u64;
        gap.avg_score = avg_score as f32;
        gap.last_query_at = sorted.last().expect("entries is non-empty").timestamp;
        gap.priority = priority_from(gap.query_count, gap.avg_score);

        self.gaps.upsert(gap).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conhub_models::search_log::SearchResultEntry;
    use std::sync::Mutex;

    struct StubLogStore {
        logs: Vec<SearchLog>,
    }

    #[async_trait]
    impl SearchLogStorePort for StubLogStore {
        async fn insert(&self, _log: SearchLog) -> PortResult<()> {
            Ok(())
        }

        async fn recent(&self, _window_days: i64) -> PortResult<Vec<SearchLog>> {
            Ok(self.logs.clone())
        }
    }

    struct InMemoryGapStore {
        gaps: Mutex<HashMap<String, KnowledgeGap>>,
    }

    #[async_trait]
    impl KnowledgeGapStorePort for InMemoryGapStore {
        async fn find_by_topic(&self, topic: &str) -> PortResult<Option<KnowledgeGap>> {
            Ok(self.gaps.lock().unwrap().get(topic).cloned())
        }

        async fn upsert(&self, gap: KnowledgeGap) -> PortResult<()> {
            self.gaps.lock().unwrap().insert(gap.topic.clone(), gap);
            Ok(())
        }
    }

    fn make_log(query: &str, top_score: f32) -> SearchLog {
        SearchLog::new(
            query,
            "default",
            vec![SearchResultEntry {
                document_id: uuid::Uuid::new_v4(),
                chunk_id: uuid::Uuid::new_v4(),
                title: None,
                score: top_score,
            }],
            false,
            5,
        )
    }

    #[tokio::test]
    async fn low_scoring_frequent_pattern_becomes_a_gap() {
        let logs = vec![make_log("học phí kỳ 2", 0.2), make_log("Học Phí Kỳ 2", 0.3), make_log("học phí kỳ 2 ", 0.1)];
        let log_store = Arc::new(StubLogStore { logs });
        let gap_store = Arc::new(InMemoryGapStore { gaps: Mutex::new(HashMap::new()) });
        let detector = GapDetector::new(log_store, gap_store.clone());

        let touched = detector.run().await.unwrap();
        assert_eq!(touched.len(), 1);

        let gap = gap_store.gaps.lock().unwrap().get(&touched[0]).cloned().unwrap();
        assert_eq!(gap.query_count, 3);
    }

    #[tokio::test]
    async fn high_scoring_pattern_is_not_a_gap() {
        let logs = vec![make_log("thời khóa biểu", 0.9), make_log("thời khóa biểu", 0.95), make_log("thời khóa biểu", 0.8)];
        let log_store = Arc::new(StubLogStore { logs });
        let gap_store = Arc::new(InMemoryGapStore { gaps: Mutex::new(HashMap::new()) });
        let detector = GapDetector::new(log_store, gap_store);

        let touched = detector.run().await.unwrap();
        assert!(touched.is_empty());
    }
}
