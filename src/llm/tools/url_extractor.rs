//! 搜索结果URL提取工具

use rig::tool::Tool;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::failure_payload;
use crate::generator::research::toolkit::{ResearchToolkit, ToolError};

#[derive(Clone)]
pub struct ExtractUrlsTool {
    toolkit: Arc<ResearchToolkit>,
}

impl ExtractUrlsTool {
    pub fn new(toolkit: Arc<ResearchToolkit>) -> Self {
        Self { toolkit }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractUrlsArgs {
    /// 任意形态的搜索结果：JSON对象、数组或纯文本
    #[serde(default)]
    pub search_results: Value,
    pub max_urls: Option<i64>,
}

impl Tool for ExtractUrlsTool {
    const NAME: &'static str = "extract_urls_from_search";

    type Error = ToolError;
    type Args = ExtractUrlsArgs;
    type Output = Value;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Extract an ordered, de-duplicated list of URLs from web_search results \
                          (JSON or plain text)."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "search_results": {
                        "description": "The search results exactly as returned by web_search, as JSON or text"
                    },
                    "max_urls": {
                        "type": "integer",
                        "description": "Maximum number of URLs to return (default 10)"
                    }
                },
                "required": ["search_results"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        debug!("🔧 tool called...extract_urls_from_search@max_urls={:?}", args.max_urls);

        Ok(match self.toolkit.extract_urls(&args.search_results, args.max_urls) {
            Ok(urls) => Value::from(urls),
            Err(e) => failure_payload(e),
        })
    }
}
