//! 网页抓取工具

use rig::tool::Tool;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::failure_payload;
use crate::generator::research::toolkit::{ResearchToolkit, ToolError};

#[derive(Clone)]
pub struct CrawlUrlsTool {
    toolkit: Arc<ResearchToolkit>,
}

impl CrawlUrlsTool {
    pub fn new(toolkit: Arc<ResearchToolkit>) -> Self {
        Self { toolkit }
    }
}

#[derive(Debug, Deserialize)]
pub struct CrawlUrlsArgs {
    #[serde(default)]
    pub urls: Vec<String>,
    pub max_urls: Option<i64>,
}

impl Tool for CrawlUrlsTool {
    const NAME: &'static str = "crawl_urls";

    type Error = ToolError;
    type Args = CrawlUrlsArgs;
    type Output = serde_json::Value;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Fetch the main text content of web pages, in order. Failures are \
                          reported per URL; the batch summary says how many pages succeeded."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "urls": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "URLs to crawl, most relevant first"
                    },
                    "max_urls": {
                        "type": "integer",
                        "description": "Maximum number of URLs to crawl from the list (default 10)"
                    }
                },
                "required": ["urls"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        debug!(
            "🔧 tool called...crawl_urls@{} urls, max_urls={:?}",
            args.urls.len(),
            args.max_urls
        );

        Ok(self
            .toolkit
            .crawl(&args.urls, args.max_urls)
            .await
            .unwrap_or_else(failure_payload))
    }
}
