//! 调研工具集
//!
//! 三个工具共享一个调用预算；每次搜索和抓取都会写入本次运行的工具日志。

use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::generator::research::memory::{ScopedKeys, SearchRecord, append_journal};
use crate::memory::Memory;
use crate::web::crawler::CrawlOrchestrator;
use crate::web::search::SearchProvider;
use crate::web::url_extractor;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool-call budget exhausted ({budget} calls); write the report with the material already gathered")]
    BudgetExhausted { budget: usize },
    #[error("search failed: {0}")]
    Search(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

pub struct ResearchToolkit {
    search: Arc<dyn SearchProvider>,
    crawler: CrawlOrchestrator,
    memory: Arc<RwLock<Memory>>,
    search_max_results: usize,
    default_max_urls: usize,
    max_urls_cap: usize,
    max_content_chars: Option<usize>,
    budget: usize,
    calls: AtomicUsize,
}

impl ResearchToolkit {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        crawler: CrawlOrchestrator,
        memory: Arc<RwLock<Memory>>,
        config: &Config,
    ) -> Self {
        Self {
            search,
            crawler,
            memory,
            search_max_results: config.search.max_results,
            default_max_urls: config.crawl.default_max_urls,
            max_urls_cap: config.crawl.max_urls_cap,
            max_content_chars: config.crawl.max_content_chars,
            budget: config.research.tool_call_budget(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// 已消耗（含被拒绝）的调用次数
    pub fn calls_made(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn charge(&self, tool: &str) -> Result<(), ToolError> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if previous >= self.budget {
            warn!(tool, budget = self.budget, "tool call rejected, budget exhausted");
            return Err(ToolError::BudgetExhausted {
                budget: self.budget,
            });
        }
        Ok(())
    }

    /// 把模型给出的 `max_urls` 规范到 `[0, max_urls_cap]`
    pub fn clamp_max_urls(&self, requested: Option<i64>) -> usize {
        clamp_max_urls(requested, self.default_max_urls, self.max_urls_cap)
    }

    /// 网络搜索；搜索失败以错误返回，同时记入日志
    pub async fn search(&self, query: &str, max_results: Option<i64>) -> Result<Value, ToolError> {
        self.charge("web_search")?;

        let query = query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("query must not be empty".into()));
        }
        let max_results = max_results
            .map(|n| n.clamp(1, 20) as usize)
            .unwrap_or(self.search_max_results);

        let result = self.search.search(query, max_results).await;
        let record = SearchRecord {
            query: query.to_string(),
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        self.journal(ScopedKeys::SEARCH, &record).await;

        match result {
            Ok(payload) => {
                debug!(query, provider = self.search.name(), "search succeeded");
                let text = payload.into_string();
                Ok(serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text })))
            }
            Err(e) => {
                warn!(query, error = %e, "search failed");
                Err(ToolError::Search(e.to_string()))
            }
        }
    }

    /// URL提取，搜索结果可以是JSON值或文本
    pub fn extract_urls(
        &self,
        search_results: &Value,
        max_urls: Option<i64>,
    ) -> Result<Vec<String>, ToolError> {
        self.charge("extract_urls_from_search")?;

        let payload = match search_results {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Ok(url_extractor::extract_urls(
            &payload,
            self.clamp_max_urls(max_urls),
        ))
    }

    /// 有界抓取；返回给模型的JSON中正文可能被截断
    pub async fn crawl(&self, urls: &[String], max_urls: Option<i64>) -> Result<Value, ToolError> {
        self.charge("crawl_urls")?;

        let outcome = self.crawler.crawl(urls, self.clamp_max_urls(max_urls)).await;
        self.journal(ScopedKeys::CRAWL, &outcome.digest()).await;

        Ok(outcome.to_tool_payload(self.max_content_chars))
    }

    async fn journal<T: serde::Serialize>(&self, kind: &str, entry: &T) {
        let mut memory = self.memory.write().await;
        if let Err(e) = append_journal(&mut memory, kind, entry) {
            warn!(kind, error = %e, "failed to record tool journal entry");
        }
    }
}

pub fn clamp_max_urls(requested: Option<i64>, default: usize, cap: usize) -> usize {
    match requested {
        None => default.min(cap),
        Some(n) => n.clamp(0, cap as i64) as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::fetch::{FetchError, FetchOptions, FetchSession, FetchedPage, PageFetcher};
    use crate::web::search::{SearchError, SearchHit, SearchResultPayload};
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticSearch {
        fail: bool,
    }

    #[async_trait]
    impl SearchProvider for StaticSearch {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn search(&self, query: &str, _max: usize) -> Result<SearchResultPayload, SearchError> {
            if self.fail {
                return Err(SearchError::Provider("quota exceeded".into()));
            }
            Ok(SearchResultPayload::from_hits(
                query,
                &[SearchHit {
                    title: "A".into(),
                    url: "https://a.example".into(),
                    snippet: String::new(),
                }],
            ))
        }
    }

    struct EchoFetcher;
    struct EchoSession;

    #[async_trait]
    impl PageFetcher for EchoFetcher {
        async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError> {
            Ok(Box::new(EchoSession))
        }
    }

    #[async_trait]
    impl FetchSession for EchoSession {
        async fn fetch(&mut self, url: &str, _o: &FetchOptions) -> Result<FetchedPage, FetchError> {
            Ok(FetchedPage {
                success: true,
                cleaned_content: Some(format!("content of {} ", url).repeat(10)),
                markup_content: None,
                title: Some("Echo".into()),
            })
        }

        async fn close(&mut self) {}
    }

    fn toolkit(fail_search: bool, tool_calls_per_angle: usize) -> (ResearchToolkit, Arc<RwLock<Memory>>) {
        let mut config = Config::default();
        config.research.tool_calls_per_angle = tool_calls_per_angle;
        config.research.max_angles = 1;
        config.crawl.max_content_chars = Some(20);
        let memory = Arc::new(RwLock::new(Memory::new()));
        let crawler = CrawlOrchestrator::new(
            Arc::new(EchoFetcher),
            FetchOptions::default(),
            Duration::from_secs(5),
        );
        (
            ResearchToolkit::new(
                Arc::new(StaticSearch { fail: fail_search }),
                crawler,
                memory.clone(),
                &config,
            ),
            memory,
        )
    }

    #[test]
    fn test_clamp_max_urls() {
        assert_eq!(clamp_max_urls(None, 10, 20), 10);
        assert_eq!(clamp_max_urls(None, 30, 20), 20);
        assert_eq!(clamp_max_urls(Some(-3), 10, 20), 0);
        assert_eq!(clamp_max_urls(Some(5), 10, 20), 5);
        assert_eq!(clamp_max_urls(Some(500), 10, 20), 20);
    }

    #[tokio::test]
    async fn test_search_extract_crawl_chain() {
        let (toolkit, memory) = toolkit(false, 10);

        let results = toolkit.search("e-bike prices", None).await.unwrap();
        assert_eq!(results["query"], "e-bike prices");

        let urls = toolkit.extract_urls(&results, None).unwrap();
        assert_eq!(urls, vec!["https://a.example"]);

        let crawled = toolkit.crawl(&urls, None).await.unwrap();
        assert_eq!(crawled["successful_count"], 1);
        assert!(
            crawled["records"][0]["content"]
                .as_str()
                .unwrap()
                .ends_with("[truncated]")
        );

        let memory = memory.read().await;
        assert_eq!(memory.list_keys("tool_journal"), vec!["crawl-0001", "search-0001"]);
    }

    #[tokio::test]
    async fn test_failed_search_is_journaled() {
        let (toolkit, memory) = toolkit(true, 10);
        let err = toolkit.search("anything", Some(3)).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));

        let records: Vec<SearchRecord> = memory.read().await.list_values("tool_journal", "search");
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
    }

    #[tokio::test]
    async fn test_extract_accepts_text_payloads() {
        let (toolkit, _) = toolkit(false, 10);
        let text = Value::String("see https://x.example/a, and https://y.example".into());
        assert_eq!(
            toolkit.extract_urls(&text, Some(1)).unwrap(),
            vec!["https://x.example/a"]
        );
        assert!(toolkit.extract_urls(&Value::Null, None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_budget_is_enforced() {
        let (toolkit, memory) = toolkit(false, 2);
        assert_eq!(toolkit.budget(), 2);

        toolkit.search("one", None).await.unwrap();
        toolkit.extract_urls(&Value::Null, None).unwrap();
        let err = toolkit.search("three", None).await.unwrap_err();
        assert!(matches!(err, ToolError::BudgetExhausted { budget: 2 }));
        assert!(matches!(
            toolkit.crawl(&[], None).await,
            Err(ToolError::BudgetExhausted { .. })
        ));
        assert_eq!(toolkit.calls_made(), 4);

        // 被拒绝的调用不写日志
        assert_eq!(memory.read().await.list_keys("tool_journal").len(), 1);
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let (toolkit, memory) = toolkit(false, 10);
        assert!(matches!(
            toolkit.search("   ", None).await,
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(memory.read().await.list_keys("tool_journal").is_empty());
    }
}
