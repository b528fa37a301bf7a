//! 网页抓取相关的数据结构

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// 单个URL的抓取记录
///
/// 只能通过 [`CrawlRecord::succeeded`] 与 [`CrawlRecord::failed`] 构造，
/// 保证 `success` 时必有 `content`，失败时必有 `error`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub word_count: usize,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CrawlRecord {
    /// 抓取成功的记录，字数由内容按空白切分得出
    pub fn succeeded(url: impl Into<String>, title: Option<String>, content: String) -> Self {
        Self {
            url: url.into(),
            title: title.filter(|t| !t.trim().is_empty()),
            word_count: count_words(&content),
            content: Some(content),
            success: true,
            error: None,
        }
    }

    /// 抓取失败的记录
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            content: None,
            word_count: 0,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// 按空白切分统计字数
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 一个抓取批次的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlBatchResult {
    pub total_attempted: usize,
    pub successful_count: usize,
    pub records: Vec<CrawlRecord>,
    pub summary: String,
}

impl CrawlBatchResult {
    /// 由有序记录汇总出批次结果，计数字段全部由记录推导
    pub fn from_records(records: Vec<CrawlRecord>) -> Self {
        let total_attempted = records.len();
        let successful_count = records.iter().filter(|r| r.success).count();
        Self {
            total_attempted,
            successful_count,
            summary: format!(
                "Successfully crawled {} out of {} URLs",
                successful_count, total_attempted
            ),
            records,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.total_attempted - self.successful_count
    }

    pub fn digest(&self) -> CrawlDigest {
        CrawlDigest {
            total_attempted: self.total_attempted,
            successful_count: self.successful_count,
            failed_count: self.failed_count(),
            summary: self.summary.clone(),
            failed_urls: self
                .records
                .iter()
                .filter(|r| !r.success)
                .map(|r| r.url.clone())
                .collect(),
            aborted: None,
        }
    }
}

/// 抓取调用的整体结果
///
/// `Aborted` 只在抓取会话本身无法建立时出现，单个URL的失败总是记录在批次内部。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    Completed(CrawlBatchResult),
    Aborted { error: String },
}

impl CrawlOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CrawlOutcome::Completed(_))
    }

    pub fn batch(&self) -> Option<&CrawlBatchResult> {
        match self {
            CrawlOutcome::Completed(batch) => Some(batch),
            CrawlOutcome::Aborted { .. } => None,
        }
    }

    pub fn digest(&self) -> CrawlDigest {
        match self {
            CrawlOutcome::Completed(batch) => batch.digest(),
            CrawlOutcome::Aborted { error } => CrawlDigest {
                total_attempted: 0,
                successful_count: 0,
                failed_count: 0,
                summary: format!("Crawl aborted: {}", error),
                failed_urls: Vec::new(),
                aborted: Some(error.clone()),
            },
        }
    }

    /// 提供给模型的JSON结构
    ///
    /// `max_content_chars` 只截断发给模型的正文，`word_count` 仍然是完整正文的字数。
    pub fn to_tool_payload(&self, max_content_chars: Option<usize>) -> Value {
        match self {
            CrawlOutcome::Aborted { error } => json!({
                "success": false,
                "error": error,
            }),
            CrawlOutcome::Completed(batch) => {
                let records: Vec<Value> = batch
                    .records
                    .iter()
                    .map(|record| {
                        let mut record = record.clone();
                        if let (Some(limit), Some(content)) = (max_content_chars, &record.content) {
                            record.content = Some(truncate_chars(content, limit));
                        }
                        serde_json::to_value(record).unwrap_or(Value::Null)
                    })
                    .collect();
                json!({
                    "success": true,
                    "total_attempted": batch.total_attempted,
                    "successful_count": batch.successful_count,
                    "records": records,
                    "summary": batch.summary,
                })
            }
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{} …[truncated]", &text[..byte_index]),
        None => text.to_string(),
    }
}

/// 写入工具日志的批次摘要（不含正文）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlDigest {
    pub total_attempted: usize,
    pub successful_count: usize,
    pub failed_count: usize,
    pub summary: String,
    pub failed_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl CrawlDigest {
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}
