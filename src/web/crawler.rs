//! 有界抓取编排器

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::CrawlConfig;
use crate::types::crawl::{CrawlBatchResult, CrawlOutcome, CrawlRecord};
use crate::web::fetch::{FetchOptions, FetchSession, FetchedPage, PageFetcher};

/// 抓取失败但引擎未给出原因时使用的错误描述
pub const GENERIC_FAILURE: &str = "Failed to crawl";

pub struct CrawlOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    options: FetchOptions,
    fetch_timeout: Duration,
}

impl CrawlOrchestrator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, options: FetchOptions, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            options,
            fetch_timeout,
        }
    }

    pub fn from_config(fetcher: Arc<dyn PageFetcher>, config: &CrawlConfig) -> Self {
        Self::new(
            fetcher,
            FetchOptions {
                minimum_word_count: config.min_word_count,
                bypass_cache: config.bypass_cache,
            },
            Duration::from_secs(config.fetch_timeout_seconds),
        )
    }

    /// 抓取 `urls` 的前 `max_urls` 个地址
    ///
    /// 单个URL的任何失败（错误、超时、引擎panic）都只记录在该URL的记录里；
    /// 只有会话无法建立时返回 [`CrawlOutcome::Aborted`]。
    pub async fn crawl(&self, urls: &[String], max_urls: usize) -> CrawlOutcome {
        let targets = &urls[..urls.len().min(max_urls)];
        if targets.is_empty() {
            debug!("crawl requested with no urls");
            return CrawlOutcome::Completed(CrawlBatchResult::from_records(Vec::new()));
        }

        let mut session = match self.fetcher.open_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "failed to open crawl session");
                return CrawlOutcome::Aborted {
                    error: e.to_string(),
                };
            }
        };

        let mut records = Vec::with_capacity(targets.len());
        for (index, url) in targets.iter().enumerate() {
            info!("Crawling URL {}/{}: {}", index + 1, targets.len(), url);
            let record = self.crawl_one(session.as_mut(), url).await;
            match (&record.error, &record.title) {
                (None, title) => info!(
                    words = record.word_count,
                    "Successfully crawled: {}",
                    title.as_deref().unwrap_or(url)
                ),
                (Some(error), _) if error == GENERIC_FAILURE => warn!("Failed to crawl: {}", url),
                (Some(error), _) => warn!("Error crawling {}: {}", url, error),
            }
            records.push(record);
        }

        session.close().await;

        let batch = CrawlBatchResult::from_records(records);
        info!(
            attempted = batch.total_attempted,
            succeeded = batch.successful_count,
            "{}",
            batch.summary
        );
        CrawlOutcome::Completed(batch)
    }

    async fn crawl_one(&self, session: &mut dyn FetchSession, url: &str) -> CrawlRecord {
        let fetch = AssertUnwindSafe(session.fetch(url, &self.options)).catch_unwind();

        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Err(_) => CrawlRecord::failed(
                url,
                format!("Timed out after {}s", self.fetch_timeout.as_secs_f32()),
            ),
            Ok(Err(panic)) => CrawlRecord::failed(url, panic_message(&*panic)),
            Ok(Ok(Err(e))) => CrawlRecord::failed(url, e.to_string()),
            Ok(Ok(Ok(page))) => record_from_page(url, page),
        }
    }
}

fn record_from_page(url: &str, page: FetchedPage) -> CrawlRecord {
    if !page.success {
        return CrawlRecord::failed(url, GENERIC_FAILURE);
    }
    match page.best_content() {
        Some(content) => CrawlRecord::succeeded(url, page.title.clone(), content.to_string()),
        None => CrawlRecord::failed(url, GENERIC_FAILURE),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("fetch engine panicked: {}", detail)
}
