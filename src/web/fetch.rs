//! 网页抓取能力

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::CrawlConfig;
use crate::types::crawl::count_words;

static NON_CONTENT_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<!--.*?-->")
        .expect("non-content pattern is valid")
});

/// 界面性容器的class/id关键词，这类容器不参与正文评分
const BOILERPLATE_MARKERS: [&str; 12] = [
    "nav", "menu", "sidebar", "footer", "header", "banner", "cookie", "consent", "advert",
    "promo", "subscribe", "newsletter",
];

/// 抓取选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// 清洗后正文的最少字数，低于该值时视为没有实质内容
    pub minimum_word_count: usize,
    /// 跳过一切缓存，总是获取最新内容
    pub bypass_cache: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            minimum_word_count: 100,
            bypass_cache: true,
        }
    }
}

/// 抓取引擎返回的页面
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub success: bool,
    /// 清洗后的正文
    pub cleaned_content: Option<String>,
    /// 整页的纯文本/markdown渲染
    pub markup_content: Option<String>,
    pub title: Option<String>,
}

impl FetchedPage {
    /// 引擎报告失败（未抛出错误）
    pub fn failed() -> Self {
        Self::default()
    }

    /// 优先清洗后的正文，其次整页渲染
    pub fn best_content(&self) -> Option<&str> {
        self.cleaned_content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| {
                self.markup_content
                    .as_deref()
                    .filter(|c| !c.trim().is_empty())
            })
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to open fetch session: {0}")]
    Session(String),
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Engine(String),
}

/// 抓取引擎：每个抓取批次打开一次会话
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError>;
}

/// 抓取会话，调用方保证在批次结束时调用 `close`
#[async_trait]
pub trait FetchSession: Send {
    async fn fetch(&mut self, url: &str, options: &FetchOptions) -> Result<FetchedPage, FetchError>;

    async fn close(&mut self);
}

/// 基于 reqwest 的抓取引擎
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    user_agent: String,
    request_timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(user_agent: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            request_timeout,
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(
            config.user_agent.clone(),
            Duration::from_secs(config.fetch_timeout_seconds),
        )
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Session(e.to_string()))?;

        Ok(Box::new(HttpFetchSession {
            client: Some(client),
        }))
    }
}

/// 一个批次内共享的HTTP客户端
pub struct HttpFetchSession {
    client: Option<reqwest::Client>,
}

#[async_trait]
impl FetchSession for HttpFetchSession {
    async fn fetch(&mut self, url: &str, options: &FetchOptions) -> Result<FetchedPage, FetchError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| FetchError::Engine("fetch session already closed".to_string()))?;

        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }

        let mut request = client.get(parsed);
        if options.bypass_cache {
            request = request
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .header(reqwest::header::PRAGMA, "no-cache");
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Ok(FetchedPage::failed());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let body = response.text().await?;

        Ok(render_page(&body, &content_type, options))
    }

    async fn close(&mut self) {
        self.client.take();
    }
}

/// 把响应体渲染为页面内容
pub fn render_page(body: &str, content_type: &str, options: &FetchOptions) -> FetchedPage {
    let looks_like_html = content_type.contains("html")
        || (content_type.is_empty() && body.trim_start().starts_with('<'));

    if looks_like_html {
        return render_html(body, options);
    }

    if content_type.starts_with("text/") || content_type.contains("json") || content_type.is_empty()
    {
        let text = body.trim();
        if text.is_empty() {
            return FetchedPage::failed();
        }
        return FetchedPage {
            success: true,
            cleaned_content: None,
            markup_content: Some(text.to_string()),
            title: None,
        };
    }

    // 二进制内容（PDF、图片等）不在抓取范围内
    FetchedPage::failed()
}

fn render_html(html: &str, options: &FetchOptions) -> FetchedPage {
    let stripped = NON_CONTENT_BLOCKS.replace_all(html, " ");
    let document = Html::parse_document(&stripped);

    let title = page_title(&document);
    let cleaned_content =
        main_text(&document).filter(|text| count_words(text) >= options.minimum_word_count);
    let markup_content = html2text::from_read(stripped.as_bytes(), 100)
        .ok()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    FetchedPage {
        success: cleaned_content.is_some() || markup_content.is_some(),
        cleaned_content,
        markup_content,
        title,
    }
}

/// 页面标题：`<title>`，其次 `og:title`，最后第一个 `<h1>`
pub fn page_title(document: &Html) -> Option<String> {
    let first_text = |selector: &str| -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        document
            .select(&selector)
            .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .find(|text| !text.is_empty())
    };

    first_text("title")
        .or_else(|| {
            let selector = Selector::parse(r#"meta[property="og:title"]"#).ok()?;
            document
                .select(&selector)
                .filter_map(|el| el.value().attr("content"))
                .map(normalize_whitespace)
                .find(|text| !text.is_empty())
        })
        .or_else(|| first_text("h1"))
}

/// 选出正文密度最高的容器，并返回其文本
pub fn main_text(document: &Html) -> Option<String> {
    let containers = Selector::parse("article, main, section, div").ok()?;
    let links = Selector::parse("a").ok()?;

    let mut best: Option<(i64, String)> = None;
    for element in document.select(&containers).take(20_000) {
        if is_boilerplate(&element) {
            continue;
        }
        let text = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        let text_chars = text.chars().count() as i64;
        if text_chars < 40 {
            continue;
        }
        let link_chars: i64 = element
            .select(&links)
            .map(|a| a.text().map(|t| t.chars().count()).sum::<usize>() as i64)
            .sum();

        let mut score = text_chars - 2 * link_chars;
        match element.value().name() {
            "article" => score += 500,
            "main" => score += 300,
            _ => {}
        }
        if link_chars * 2 > text_chars {
            score -= 500;
        }

        if best.as_ref().is_none_or(|(best_score, _)| score > *best_score) {
            best = Some((score, text));
        }
    }

    best.filter(|(score, _)| *score > 0).map(|(_, text)| text)
}

fn is_boilerplate(element: &ElementRef) -> bool {
    let mut markers = String::new();
    if let Some(class) = element.value().attr("class") {
        markers.push_str(class);
        markers.push(' ');
    }
    if let Some(id) = element.value().attr("id") {
        markers.push_str(id);
    }
    let markers = markers.to_ascii_lowercase();
    !markers.is_empty() && BOILERPLATE_MARKERS.iter().any(|m| markers.contains(m))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_html(words: usize) -> String {
        let body = "lorem ".repeat(words);
        format!(
            r#"<html><head><title> E-Bike  Guide </title><style>.x{{color:red}}</style></head>
            <body>
              <div class="navbar"><a href="/">Home</a> <a href="/shop">Shop</a></div>
              <article><h1>Guide</h1><p>{body}</p><script>var tracking = 1;</script></article>
              <footer class="footer">Copyright</footer>
            </body></html>"#
        )
    }

    #[test]
    fn test_render_html_prefers_article_text() {
        let page = render_page(&article_html(150), "text/html; charset=utf-8", &FetchOptions::default());
        assert!(page.success);
        assert_eq!(page.title.as_deref(), Some("E-Bike Guide"));
        let cleaned = page.cleaned_content.as_deref().unwrap();
        assert!(cleaned.starts_with("Guide lorem"));
        assert!(!cleaned.contains("tracking"));
        assert!(!cleaned.contains("Home"));
        assert!(page.markup_content.is_some());
    }

    #[test]
    fn test_thin_pages_fall_back_to_markup() {
        let page = render_page(&article_html(20), "text/html", &FetchOptions::default());
        assert!(page.success);
        assert!(page.cleaned_content.is_none());
        assert!(page.best_content().unwrap().contains("lorem"));
    }

    #[test]
    fn test_plain_text_and_binary() {
        let options = FetchOptions::default();
        let text = render_page("just text", "text/plain", &options);
        assert!(text.success);
        assert_eq!(text.best_content(), Some("just text"));

        let pdf = render_page("%PDF-1.7", "application/pdf", &options);
        assert!(!pdf.success);
        assert_eq!(pdf.best_content(), None);
    }

    #[test]
    fn test_title_fallbacks() {
        let document = Html::parse_document(
            r#"<html><head><meta property="og:title" content="OG Title"></head><body><h1>H</h1></body></html>"#,
        );
        assert_eq!(page_title(&document).as_deref(), Some("OG Title"));

        let document = Html::parse_document("<html><body><h1>Heading Only</h1></body></html>");
        assert_eq!(page_title(&document).as_deref(), Some("Heading Only"));
    }

    #[tokio::test]
    async fn test_invalid_urls_are_errors() {
        let fetcher = HttpPageFetcher::new("test-agent", Duration::from_secs(5));
        let mut session = fetcher.open_session().await.unwrap();
        let options = FetchOptions::default();

        let err = session.fetch("not a url", &options).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));

        let err = session.fetch("ftp://files.example/a", &options).await.unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));

        session.close().await;
        let err = session.fetch("https://a.example", &options).await.unwrap_err();
        assert!(matches!(err, FetchError::Engine(_)));
    }
}
