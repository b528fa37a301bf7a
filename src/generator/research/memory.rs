use serde::{Deserialize, Serialize};

use crate::generator::context::GeneratorContext;
use crate::memory::Memory;
use crate::types::crawl::CrawlDigest;

pub struct MemoryScope;

impl MemoryScope {
    /// 工具调用日志
    pub const TOOL_JOURNAL: &'static str = "tool_journal";
    /// 各阶段产出的报告
    pub const REPORTS: &'static str = "reports";
}

pub struct ScopedKeys;

impl ScopedKeys {
    pub const INITIAL_REPORT: &'static str = "initial_report";
    pub const ENHANCED_REPORT: &'static str = "enhanced_report";
    pub const DELIVERED_REPORT: &'static str = "delivered_report";
    pub const SEARCH: &'static str = "search";
    pub const CRAWL: &'static str = "crawl";
}

/// 一次搜索调用的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub query: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 工具日志汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalSummary {
    pub searches_attempted: usize,
    pub searches_succeeded: usize,
    pub crawl_batches: usize,
    pub crawl_batches_aborted: usize,
    pub urls_attempted: usize,
    pub urls_crawled: usize,
}

impl JournalSummary {
    pub fn from_entries(searches: &[SearchRecord], crawls: &[CrawlDigest]) -> Self {
        Self {
            searches_attempted: searches.len(),
            searches_succeeded: searches.iter().filter(|s| s.success).count(),
            crawl_batches: crawls.len(),
            crawl_batches_aborted: crawls.iter().filter(|c| c.is_aborted()).count(),
            urls_attempted: crawls.iter().map(|c| c.total_attempted).sum(),
            urls_crawled: crawls.iter().map(|c| c.successful_count).sum(),
        }
    }

    /// 外部能力整体不可用时给出原因
    ///
    /// 搜索被调用过但从未成功，或所有抓取批次都无法建立会话。
    pub fn capability_outage(&self) -> Option<String> {
        if self.searches_attempted > 0 && self.searches_succeeded == 0 {
            return Some(format!(
                "search capability unavailable: all {} search attempts failed",
                self.searches_attempted
            ));
        }
        if self.crawl_batches > 0 && self.crawl_batches_aborted == self.crawl_batches {
            return Some(format!(
                "fetch capability unavailable: all {} crawl batches aborted",
                self.crawl_batches
            ));
        }
        None
    }
}

/// 向内存追加一条工具日志
pub fn append_journal<T: Serialize>(memory: &mut Memory, kind: &str, entry: &T) -> anyhow::Result<()> {
    let key = memory.next_sequence_key(MemoryScope::TOOL_JOURNAL, kind);
    memory.store(MemoryScope::TOOL_JOURNAL, &key, entry)
}

pub trait ToolJournal {
    async fn search_records(&self) -> Vec<SearchRecord>;

    async fn crawl_digests(&self) -> Vec<CrawlDigest>;

    async fn journal_summary(&self) -> JournalSummary;
}

impl ToolJournal for GeneratorContext {
    async fn search_records(&self) -> Vec<SearchRecord> {
        let memory = self.memory.read().await;
        memory.list_values(MemoryScope::TOOL_JOURNAL, ScopedKeys::SEARCH)
    }

    async fn crawl_digests(&self) -> Vec<CrawlDigest> {
        let memory = self.memory.read().await;
        memory.list_values(MemoryScope::TOOL_JOURNAL, ScopedKeys::CRAWL)
    }

    async fn journal_summary(&self) -> JournalSummary {
        JournalSummary::from_entries(&self.search_records().await, &self.crawl_digests().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(success: bool) -> SearchRecord {
        SearchRecord {
            query: "q".into(),
            success,
            error: (!success).then(|| "HTTP 500".to_string()),
        }
    }

    fn aborted() -> CrawlDigest {
        CrawlDigest {
            total_attempted: 0,
            successful_count: 0,
            failed_count: 0,
            summary: "Crawl aborted: no browser".into(),
            failed_urls: Vec::new(),
            aborted: Some("no browser".into()),
        }
    }

    fn completed(total: usize, ok: usize) -> CrawlDigest {
        CrawlDigest {
            total_attempted: total,
            successful_count: ok,
            failed_count: total - ok,
            summary: format!("Successfully crawled {} out of {} URLs", ok, total),
            failed_urls: Vec::new(),
            aborted: None,
        }
    }

    #[test]
    fn test_no_tool_use_is_not_an_outage() {
        assert_eq!(JournalSummary::default().capability_outage(), None);
    }

    #[test]
    fn test_all_searches_failed() {
        let summary = JournalSummary::from_entries(&[search(false), search(false)], &[]);
        assert!(summary.capability_outage().unwrap().contains("all 2 search attempts"));
    }

    #[test]
    fn test_partial_failures_are_absorbed() {
        let summary = JournalSummary::from_entries(
            &[search(false), search(true)],
            &[aborted(), completed(3, 0)],
        );
        assert_eq!(summary.capability_outage(), None);
        assert_eq!(summary.urls_attempted, 3);
        assert_eq!(summary.urls_crawled, 0);
    }

    #[test]
    fn test_all_crawls_aborted() {
        let summary = JournalSummary::from_entries(&[search(true)], &[aborted(), aborted()]);
        assert!(summary.capability_outage().unwrap().starts_with("fetch capability"));
    }

    #[test]
    fn test_append_journal_keeps_order() {
        let mut memory = Memory::new();
        append_journal(&mut memory, ScopedKeys::SEARCH, &search(true)).unwrap();
        append_journal(&mut memory, ScopedKeys::SEARCH, &search(false)).unwrap();
        append_journal(&mut memory, ScopedKeys::CRAWL, &completed(2, 1)).unwrap();

        let searches: Vec<SearchRecord> =
            memory.list_values(MemoryScope::TOOL_JOURNAL, ScopedKeys::SEARCH);
        assert_eq!(searches, vec![search(true), search(false)]);
        let crawls: Vec<CrawlDigest> = memory.list_values(MemoryScope::TOOL_JOURNAL, ScopedKeys::CRAWL);
        assert_eq!(crawls.len(), 1);
    }
}
