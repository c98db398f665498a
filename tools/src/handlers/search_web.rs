use std::sync::Arc;

use async_trait::async_trait;
use conhub_ports::search::WebSearchPort;
use conhub_ports::{PortError, PortResult};

use crate::types::{get_str, ToolArgs, ToolOutput, ToolType};
use crate::ToolHandler;

/// **search_web** (§4.8): appends `site:<domain>` when a filter is given,
/// returns up to 5 results plus a plain-text summary.
pub struct SearchWebHandler {
    web_search: Arc<dyn WebSearchPort>,
}

impl SearchWebHandler {
    pub fn new(web_search: Arc<dyn WebSearchPort>) -> Self {
        Self { web_search }
    }
}

#[async_trait]
impl ToolHandler for SearchWebHandler {
    fn tool_type(&self) -> ToolType {
        ToolType::SearchWeb
    }

    fn validate(&self, arguments: &ToolArgs) -> PortResult<()> {
        if get_str(arguments, "query").is_some() {
            Ok(())
        } else {
            Err(PortError::invalid("search_web requires query"))
        }
    }

    async fn execute(&self, arguments: ToolArgs) -> PortResult<ToolOutput> {
        let query = get_str(&arguments, "query").unwrap();
        let domain_filter = get_str(&arguments, "domain_filter");

        let results = self.web_search.search(query, domain_filter).await?;
        let top5: Vec<_> = results.into_iter().take(5).collect();

        let summary = top5
            .iter()
            .map(|r| format!("{}: {}", r.title, r.snippet))
            .collect::<Vec<_>>()
            .join("\n");

        let results_json: Vec<_> = top5
            .iter()
            .map(|r| serde_json::json!({"title": r.title, "snippet": r.snippet, "url": r.url}))
            .collect();

        let mut output = ToolOutput::new();
        output.insert("results".into(), serde_json::json!(results_json));
        output.insert("summary".into(), serde_json::json!(summary));
        Ok(output)
    }
}
