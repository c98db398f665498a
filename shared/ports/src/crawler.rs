use async_trait::async_trait;

use crate::PortResult;

#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub title: String,
    pub content: String,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait WebCrawlerPort: Send + Sync {
    async fn fetch(&self, url: &str, selector: Option<&str>) -> PortResult<CrawlResult>;
}
