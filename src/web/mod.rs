//! 外部网络能力：搜索、网页抓取、URL提取

pub mod crawler;
pub mod fetch;
pub mod search;
pub mod url_extractor;

pub use crawler::CrawlOrchestrator;
pub use fetch::{FetchOptions, FetchSession, FetchedPage, HttpPageFetcher, PageFetcher};
pub use search::{SearchProvider, SearchResultPayload, build_search_provider};
pub use url_extractor::extract_urls;
