//! C13 Monitor Scheduler (spec.md §4.13): periodic tick over active Monitor
//! Targets, feeding crawled content into the Ingestion Pipeline. Grounded on
//! `original_source/.../monitor_scheduler.py` and `run_monitor_targets.py`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use conhub_ports::crawler::WebCrawlerPort;
use conhub_ports::store::MonitorTargetStorePort;
use conhub_ports::PortResult;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipeline::{IngestPayload, IngestionPipeline};

pub const DEFAULT_TICK_INTERVAL_HOURS: u64 = 6;
/// Bounded concurrent crawls per tick (§5).
pub const DEFAULT_CONCURRENT_CRAWLS: usize = 4;
const CRAWL_TIMEOUT_SECONDS: u64 = 30;

pub struct MonitorScheduler {
    monitor_store: Arc<dyn MonitorTargetStorePort>,
    crawler: Arc<dyn WebCrawlerPort>,
    pipeline: Arc<IngestionPipeline>,
    concurrency: usize,
}

impl MonitorScheduler {
    pub fn new(
        monitor_store: Arc<dyn MonitorTargetStorePort>,
        crawler: Arc<dyn WebCrawlerPort>,
        pipeline: Arc<IngestionPipeline>,
    ) -> Self {
        Self { monitor_store, crawler, pipeline, concurrency: DEFAULT_CONCURRENT_CRAWLS }
    }

    /// Runs one tick: crawls every due target, returns the source_ids of
    /// targets that were processed (successfully or not). Monitor ticks are
    /// non-overlapping by construction — callers must not invoke `tick`
    /// concurrently with itself (§5).
    pub async fn tick(&self) -> PortResult<Vec<Uuid>> {
        let targets = self.monitor_store.list_active().await?;
        let now = chrono::Utc::now();
        let due: Vec<_> = targets.into_iter().filter(|t| t.is_due(now)).collect();
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(due.len());

        for target in due {
            let semaphore = semaphore.clone();
            let monitor_store = self.monitor_store.clone();
            let crawler = self.crawler.clone();
            let pipeline = self.pipeline.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let target_id = target.id;
                if let Err(err) =
                    process_target(target, monitor_store.as_ref(), crawler.as_ref(), pipeline.as_ref()).await
                {
                    error!(target_id = %target_id, error = %err, "monitor target processing failed");
                }
                target_id
            }));
        }

        let mut processed = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(id) = handle.await {
                processed.push(id);
            }
        }
        Ok(processed)
    }

    /// Runs `tick` on a fixed interval until the returned task is aborted.
    pub fn spawn_periodic(self: Arc<Self>, interval_hours: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_hours.max(1) * 3600));
            loop {
                interval.tick().await;
                match self.tick().await {
                    Ok(processed) => info!(count = processed.len(), "monitor tick completed"),
                    Err(err) => error!(error = %err, "monitor tick failed"),
                }
            }
        })
    }
}

async fn process_target(
    mut target: conhub_models::ingestion::MonitorTarget,
    monitor_store: &dyn MonitorTargetStorePort,
    crawler: &dyn WebCrawlerPort,
    pipeline: &IngestionPipeline,
) -> PortResult<()> {
    let now = chrono::Utc::now();

    let crawl = tokio::time::timeout(
        Duration::from_secs(CRAWL_TIMEOUT_SECONDS),
        crawler.fetch(&target.url, target.selector.as_deref()),
    )
    .await;

    let result = match crawl {
        Ok(Ok(crawl_result)) if !crawl_result.content.is_empty() => {
            let payload = IngestPayload {
                source_id: target.id.to_string(),
                title: if crawl_result.title.is_empty() { target.url.clone() } else { crawl_result.title },
                content: crawl_result.content,
                source_url: target.url.clone(),
                collection: target.collection.clone(),
                category: target.category.clone(),
                metadata: {
                    let mut m = HashMap::new();
                    m.insert("monitor_target_id".to_string(), serde_json::json!(target.id.to_string()));
                    m
                },
                priority: 5,
            };
            pipeline.ingest(payload).await.map(|p| p.content_hash)
        }
        Ok(Ok(_)) => Err(conhub_ports::PortError::invalid("empty content returned from crawler")),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(conhub_ports::PortError::timeout("crawl timed out")),
    };

    match result {
        Ok(content_hash) => target.record_success(now, content_hash),
        Err(err) => {
            warn!(target_id = %target.id, url = %target.url, error = %err, "monitor target check failed");
            target.record_failure(now, err.to_string());
        }
    }

    monitor_store.save(target).await
}
