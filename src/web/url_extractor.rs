//! 搜索结果URL提取器
//!
//! 搜索结果的格式没有任何保证：可能是JSON对象、JSON数组，也可能是夹杂链接的纯文本。
//! 提取过程永远不会失败，最坏情况下返回空列表。

use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// 默认最多提取的URL数量
pub const DEFAULT_MAX_URLS: usize = 10;

/// 结构化条目中可能保存URL的字段，按优先级排列
const URL_KEYS: [&str; 3] = ["url", "link", "href"];

/// 文本扫描时从候选URL两端剥离的字符
const TRIM_CHARS: &[char] = &['.', ',', ';', ':', '(', ')', '[', ']', '{', '}'];

/// 提取结果来自哪条解析路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// JSON结构解析
    Structured,
    /// 按行扫描文本
    TextScan,
    /// 没有提取到任何URL
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub urls: Vec<String>,
    pub mode: ExtractionMode,
}

/// 从搜索结果中提取去重后的有序URL列表，长度不超过 `max_urls`
pub fn extract_urls(payload: &str, max_urls: usize) -> Vec<String> {
    extract_with_mode(payload, max_urls).urls
}

/// 同 [`extract_urls`]，额外给出所使用的解析路径
pub fn extract_with_mode(payload: &str, max_urls: usize) -> Extraction {
    let (candidates, mode) = match structured_candidates(payload, max_urls) {
        Some(candidates) => (candidates, ExtractionMode::Structured),
        None => (scan_text(payload, max_urls), ExtractionMode::TextScan),
    };

    let urls = dedup_preserving_order(candidates, max_urls);
    let mode = if urls.is_empty() {
        ExtractionMode::Empty
    } else {
        mode
    };

    debug!(?mode, count = urls.len(), max_urls, "extracted urls from search payload");
    Extraction { urls, mode }
}

/// JSON路径；返回 `None` 表示需要退回到文本扫描
fn structured_candidates(payload: &str, max_urls: usize) -> Option<Vec<String>> {
    let parsed: Value = serde_json::from_str(payload).ok()?;

    let entries: &[Value] = match &parsed {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items,
            // `results` 存在但不是列表，视为无法识别的结构
            Some(_) => return None,
            None => std::slice::from_ref(&parsed),
        },
        _ => return None,
    };

    Some(
        entries
            .iter()
            .take(max_urls)
            .filter_map(url_of_entry)
            .collect(),
    )
}

fn url_of_entry(entry: &Value) -> Option<String> {
    let object = entry.as_object()?;
    URL_KEYS
        .iter()
        .find_map(|key| {
            object
                .get(*key)
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
        })
        .map(str::to_string)
}

fn scan_text(payload: &str, max_urls: usize) -> Vec<String> {
    let mut urls = Vec::new();

    'lines: for line in payload.lines() {
        if !line.contains("http") {
            continue;
        }
        for word in line.split_whitespace() {
            if word.starts_with("http://") || word.starts_with("https://") {
                urls.push(word.trim_matches(TRIM_CHARS).to_string());
                if urls.len() >= max_urls {
                    break 'lines;
                }
            }
        }
    }

    urls
}

fn dedup_preserving_order(candidates: Vec<String>, max_urls: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|url| seen.insert(url.clone()))
        .take(max_urls)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_fallback_strips_trailing_punctuation() {
        let urls = extract_urls("see http://a.example and http://b.example.", 10);
        assert_eq!(urls, vec!["http://a.example", "http://b.example"]);
    }

    #[test]
    fn test_structured_results_with_aliases() {
        let payload = r#"{"results": [{"url": "http://x"}, {"link": "http://y"}]}"#;
        let extraction = extract_with_mode(payload, 5);
        assert_eq!(extraction.urls, vec!["http://x", "http://y"]);
        assert_eq!(extraction.mode, ExtractionMode::Structured);
    }

    #[test]
    fn test_structured_list_and_key_priority() {
        let payload = r#"[
            {"href": "http://h", "link": "http://l"},
            {"url": "", "link": "http://second"},
            "not an object",
            {"title": "no url"}
        ]"#;
        assert_eq!(extract_urls(payload, 10), vec!["http://l", "http://second"]);
    }

    #[test]
    fn test_single_object_without_results() {
        let payload = r#"{"title": "Only", "href": "https://only.example"}"#;
        assert_eq!(extract_urls(payload, 10), vec!["https://only.example"]);
    }

    #[test]
    fn test_structured_cap_counts_entries() {
        // 前两个条目都没有URL，但同样占用名额
        let payload = r#"[{"a": 1}, {"b": 2}, {"url": "http://late"}]"#;
        assert!(extract_urls(payload, 2).is_empty());
        assert_eq!(extract_with_mode(payload, 2).mode, ExtractionMode::Empty);
    }

    #[test]
    fn test_results_not_a_list_falls_back_to_text() {
        let payload = r#"{"results": {"url": "http://nested"}, "note": "see https://inline.example"}"#;
        let extraction = extract_with_mode(payload, 10);
        assert_eq!(extraction.mode, ExtractionMode::TextScan);
        assert_eq!(extraction.urls, vec!["https://inline.example\""]);
    }

    #[test]
    fn test_scalar_json_falls_back_to_text() {
        let extraction = extract_with_mode("42", 10);
        assert_eq!(extraction.mode, ExtractionMode::Empty);
        assert!(extraction.urls.is_empty());
    }

    #[test]
    fn test_never_exceeds_max() {
        let text = (0..30)
            .map(|i| format!("https://site{}.example/page", i))
            .collect::<Vec<_>>()
            .join("\n");
        let json = serde_json::json!({
            "results": (0..30)
                .map(|i| serde_json::json!({"url": format!("https://j{}.example", i)}))
                .collect::<Vec<_>>()
        })
        .to_string();

        for n in [0usize, 1, 3, 10, 29, 30, 100] {
            assert!(extract_urls(&text, n).len() <= n);
            assert!(extract_urls(&json, n).len() <= n);
        }
        assert!(extract_urls(&text, 0).is_empty());
    }

    #[test]
    fn test_dedup_preserves_first_occurrence() {
        let payload = "https://b.example\nhttps://a.example https://b.example\n(https://d.example) https://c.example https://a.example";
        assert_eq!(
            extract_urls(payload, 10),
            vec!["https://b.example", "https://a.example", "https://c.example"]
        );

        let json = r#"[{"url":"http://1"},{"url":"http://2"},{"url":"http://1"},{"url":"http://3"}]"#;
        assert_eq!(extract_urls(json, 10), vec!["http://1", "http://2", "http://3"]);
    }

    #[test]
    fn test_text_scan_stops_at_cap_before_dedup() {
        // 扫描阶段按收集数量截止，重复项也计数
        let payload = "http://a.example http://a.example http://b.example";
        assert_eq!(extract_urls(payload, 2), vec!["http://a.example"]);
    }

    #[test]
    fn test_malformed_payload_degrades() {
        assert!(extract_urls("{not json", 10).is_empty());
        assert!(extract_urls("", 10).is_empty());
        assert_eq!(
            extract_urls("{broken: https://x.example/a,", 10),
            vec!["https://x.example/a"]
        );
    }
}
