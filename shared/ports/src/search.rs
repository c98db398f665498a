use async_trait::async_trait;

use crate::PortResult;

#[derive(Debug, Clone)]
pub struct WebSearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[async_trait]
pub trait WebSearchPort: Send + Sync {
    /// Returns up to 5 results; appends `site:<domain>` when a filter is
    /// given (§4.8 search_web).
    async fn search(&self, query: &str, domain_filter: Option<&str>) -> PortResult<Vec<WebSearchResult>>;
}
