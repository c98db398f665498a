//! `WebSearchPort` default adapter: calls a configurable JSON search
//! endpoint (e.g. a self-hosted SearXNG/Firecrawl-search instance),
//! matching SPEC_FULL.md's "local lexicon/HTTP stubs" note. Uses the
//! workspace's existing Firecrawl config fields since the teacher already
//! wires that base URL/key pair for web-adjacent lookups.

use async_trait::async_trait;
use conhub_ports::search::{WebSearchPort as WebSearchPortTrait, WebSearchResult};
use conhub_ports::{PortError, PortResult};
use serde::Deserialize;

const MAX_RESULTS: usize = 5;

pub struct HttpWebSearch {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpWebSearch {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), api_key: api_key.into() }
    }
}

#[derive(Debug, Deserialize)]
struct SearchApiResponse {
    #[serde(default)]
    results: Vec<SearchApiResult>,
}

#[derive(Debug, Deserialize)]
struct SearchApiResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
}

#[async_trait]
impl WebSearchPortTrait for HttpWebSearch {
    async fn search(&self, query: &str, domain_filter: Option<&str>) -> PortResult<Vec<WebSearchResult>> {
        let full_query = match domain_filter {
            Some(domain) if !domain.is_empty() => format!("{query} site:{domain}"),
            _ => query.to_string(),
        };

        let mut request = self.client.get(format!("{}/search", self.base_url)).query(&[("q", full_query.as_str())]);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PortError::dependency_unavailable(format!(
                "search endpoint returned status {}",
                response.status()
            )));
        }

        let parsed: SearchApiResponse =
            response.json().await.map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .take(MAX_RESULTS)
            .map(|r| WebSearchResult {
                title: r.title,
                snippet: if r.snippet.is_empty() { r.description } else { r.snippet },
                url: r.url,
            })
            .collect())
    }
}
