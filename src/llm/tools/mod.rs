//! 调研Agent可调用的工具，全部委托给 [`ResearchToolkit`](crate::generator::research::toolkit::ResearchToolkit)

pub mod crawler;
pub mod url_extractor;
pub mod web_search;

pub use crawler::CrawlUrlsTool;
pub use url_extractor::ExtractUrlsTool;
pub use web_search::WebSearchTool;

use crate::generator::research::toolkit::ToolError;

/// 工具层面的失败以数据形式返回给模型，不中断推理循环
pub(crate) fn failure_payload(error: ToolError) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "error": error.to_string(),
    })
}
