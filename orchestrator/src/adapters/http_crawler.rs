//! `WebCrawlerPort` default adapter: plain HTTP GET plus a regex-based
//! HTML-to-text extraction, matching SPEC_FULL.md's "local lexicon/HTTP
//! stubs" note for ports with no dedicated backing crate in this workspace.

use async_trait::async_trait;
use conhub_ports::crawler::{CrawlResult, WebCrawlerPort};
use conhub_ports::{PortError, PortResult};
use regex::Regex;

pub struct HttpCrawler {
    client: reqwest::Client,
}

impl HttpCrawler {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn extract_title(html: &str) -> String {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>")
        .ok()
        .and_then(|re| re.captures(html))
        .map(|c| strip_tags(&c[1]).trim().to_string())
        .unwrap_or_default()
}

/// Strips script/style blocks and any remaining tags, collapsing whitespace.
fn strip_tags(html: &str) -> String {
    let no_scripts = Regex::new(r"(?is)<(script|style)[^>]*>.*?</\1>").unwrap().replace_all(html, " ").to_string();
    let no_tags = Regex::new(r"(?s)<[^>]+>").unwrap().replace_all(&no_scripts, " ").to_string();
    let decoded = no_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_selector_text(html: &str, selector: &str) -> Option<String> {
    // Only supports a bare tag/class/id style selector match against the
    // element's opening tag, sufficient for the monitor's simple crawl
    // targets (no general CSS selector engine is pulled in for this).
    let pattern = format!(r#"(?is)<[a-zA-Z0-9]+[^>]*(?:id|class)=["']?{}["']?[^>]*>(.*?)</[a-zA-Z0-9]+>"#, regex::escape(selector));
    Regex::new(&pattern).ok().and_then(|re| re.captures(html)).map(|c| strip_tags(&c[1]))
}

#[async_trait]
impl WebCrawlerPort for HttpCrawler {
    async fn fetch(&self, url: &str, selector: Option<&str>) -> PortResult<CrawlResult> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::dependency_unavailable(format!(
                "crawl of {url} returned status {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let html = response.text().await.map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        let title = extract_title(&html);
        let content = match selector.and_then(|s| extract_selector_text(&html, s)) {
            Some(text) if !text.is_empty() => text,
            _ => strip_tags(&html),
        };

        Ok(CrawlResult { title, content, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_strips_tags() {
        let html = "<html><head><title>Thông báo</title></head><body><p>Nội dung <b>quan trọng</b>.</p></body></html>";
        assert_eq!(extract_title(html), "Thông báo");
        assert_eq!(strip_tags(html), "Thông báo Nội dung quan trọng .");
    }

    #[test]
    fn selector_match_extracts_only_that_element() {
        let html = r#"<div class="other">skip</div><div id="main">kept text</div>"#;
        assert_eq!(extract_selector_text(html, "main"), Some("kept text".to_string()));
    }
}
