pub mod crawl;
pub mod report;

pub use crawl::{CrawlBatchResult, CrawlDigest, CrawlOutcome, CrawlRecord};
pub use report::{Citation, EnhancedReport, Heading, ResearchReport, Section, parse_citations};
