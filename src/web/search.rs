//! 网络搜索能力

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{SearchConfig, SearchProviderKind};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search provider is not configured: {0}")]
    NotConfigured(String),
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{provider} search returned HTTP {status}")]
    Status { provider: &'static str, status: u16 },
    #[error("{0}")]
    Provider(String),
}

/// 单条搜索命中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

/// 搜索结果载荷，对调用方而言是不透明文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultPayload(String);

impl SearchResultPayload {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// 把命中列表规范化为 `{"query": ..., "results": [...]}` 的JSON文本
    pub fn from_hits(query: &str, hits: &[SearchHit]) -> Self {
        let value = serde_json::json!({
            "query": query,
            "results": hits,
        });
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<SearchResultPayload, SearchError>;
}

/// 根据配置创建搜索服务
pub fn build_search_provider(config: &SearchConfig) -> Result<Arc<dyn SearchProvider>, SearchError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?;

    let provider: Arc<dyn SearchProvider> = match config.provider {
        SearchProviderKind::Tavily => Arc::new(TavilySearchProvider::new(
            client,
            required_key(config, "tavily")?,
            config.endpoint.clone(),
        )),
        SearchProviderKind::Brave => Arc::new(BraveSearchProvider::new(
            client,
            required_key(config, "brave")?,
            config.endpoint.clone(),
        )),
        SearchProviderKind::Searxng => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                SearchError::NotConfigured("searxng requires search.endpoint".to_string())
            })?;
            Arc::new(SearxngSearchProvider::new(client, endpoint))
        }
    };
    Ok(provider)
}

fn required_key(config: &SearchConfig, provider: &str) -> Result<String, SearchError> {
    let key = config.api_key.trim();
    if key.is_empty() {
        return Err(SearchError::NotConfigured(format!(
            "{} requires search.api_key (or DEEP_RESEARCH_SEARCH_API_KEY)",
            provider
        )));
    }
    Ok(key.to_string())
}

/// Tavily 搜索
#[derive(Debug, Clone)]
pub struct TavilySearchProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilySearchProvider {
    pub fn new(client: reqwest::Client, api_key: String, endpoint: Option<String>) -> Self {
        Self {
            client,
            api_key,
            endpoint: endpoint.unwrap_or_else(|| "https://api.tavily.com/search".to_string()),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearchProvider {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<SearchResultPayload, SearchError> {
        let body = serde_json::json!({
            "query": query,
            "max_results": max_results.clamp(1, 20),
            "search_depth": "basic",
            "include_answer": false,
            "include_raw_content": false,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                provider: self.name(),
                status: status.as_u16(),
            });
        }

        let parsed: TavilyResponse = response.json().await?;
        let hits: Vec<SearchHit> = parsed
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.content,
            })
            .collect();
        Ok(SearchResultPayload::from_hits(query, &hits))
    }
}

/// Brave 搜索
#[derive(Debug, Clone)]
pub struct BraveSearchProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

impl BraveSearchProvider {
    pub fn new(client: reqwest::Client, api_key: String, endpoint: Option<String>) -> Self {
        Self {
            client,
            api_key,
            endpoint: endpoint
                .unwrap_or_else(|| "https://api.search.brave.com/res/v1/web/search".to_string()),
        }
    }
}

#[async_trait]
impl SearchProvider for BraveSearchProvider {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<SearchResultPayload, SearchError> {
        let count = max_results.clamp(1, 20).to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Subscription-Token", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                provider: self.name(),
                status: status.as_u16(),
            });
        }

        let parsed: BraveResponse = response.json().await?;
        let hits: Vec<SearchHit> = parsed
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.description,
            })
            .collect();
        Ok(SearchResultPayload::from_hits(query, &hits))
    }
}

/// 自建 SearXNG 实例
#[derive(Debug, Clone)]
pub struct SearxngSearchProvider {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

impl SearxngSearchProvider {
    /// `endpoint` 可以是实例根地址，也可以是完整的 `/search` 地址
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        let mut endpoint = endpoint.trim().trim_end_matches('/').to_string();
        if !endpoint.ends_with("/search") {
            endpoint.push_str("/search");
        }
        Self { client, endpoint }
    }
}

#[async_trait]
impl SearchProvider for SearxngSearchProvider {
    fn name(&self) -> &'static str {
        "searxng"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<SearchResultPayload, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                provider: self.name(),
                status: status.as_u16(),
            });
        }

        let parsed: SearxngResponse = response.json().await?;
        let hits: Vec<SearchHit> = parsed
            .results
            .into_iter()
            .take(max_results.max(1))
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.content,
            })
            .collect();
        Ok(SearchResultPayload::from_hits(query, &hits))
    }
}
