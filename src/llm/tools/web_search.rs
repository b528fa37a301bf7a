//! 网络搜索工具

use rig::tool::Tool;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::failure_payload;
use crate::generator::research::toolkit::{ResearchToolkit, ToolError};

#[derive(Clone)]
pub struct WebSearchTool {
    toolkit: Arc<ResearchToolkit>,
}

impl WebSearchTool {
    pub fn new(toolkit: Arc<ResearchToolkit>) -> Self {
        Self { toolkit }
    }
}

#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    #[serde(default)]
    pub query: String,
    pub max_results: Option<i64>,
}

impl Tool for WebSearchTool {
    const NAME: &'static str = "web_search";

    type Error = ToolError;
    type Args = WebSearchArgs;
    type Output = serde_json::Value;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search the web. Returns search results with titles, URLs and snippets. \
                          Pass the whole result to extract_urls_from_search to get a URL list."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "A specific, targeted search query for one research angle"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results (default from configuration)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        debug!("🔧 tool called...web_search@{:?}", args);

        Ok(self
            .toolkit
            .search(&args.query, args.max_results)
            .await
            .unwrap_or_else(failure_payload))
    }
}
