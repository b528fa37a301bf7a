use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// 未指定 `--config` 时尝试加载的配置文件
pub const DEFAULT_CONFIG_FILE: &str = "deep-research.toml";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl LLMProvider {
    /// 本地部署的provider不需要API KEY
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Ollama)
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 搜索服务类型
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    #[default]
    Tavily,
    Brave,
    Searxng,
}

impl std::fmt::Display for SearchProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchProviderKind::Tavily => write!(f, "tavily"),
            SearchProviderKind::Brave => write!(f, "brave"),
            SearchProviderKind::Searxng => write!(f, "searxng"),
        }
    }
}

impl std::str::FromStr for SearchProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tavily" => Ok(SearchProviderKind::Tavily),
            "brave" => Ok(SearchProviderKind::Brave),
            "searxng" => Ok(SearchProviderKind::Searxng),
            _ => Err(format!("Unknown search provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 报告输出目录
    pub output_path: PathBuf,

    /// 是否启用详细日志
    pub verbose: bool,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 搜索服务配置
    pub search: SearchConfig,

    /// 网页抓取配置
    pub crawl: CrawlConfig,

    /// 调研阶段配置
    pub research: ResearchConfig,

    /// 流水线配置
    pub pipeline: PipelineConfig,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 高能效模型，用于常规推理任务
    pub model_efficient: String,

    /// 高质量模型，用于长上下文推理，以及作为efficient失效情况下的兜底
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 单个阶段的推理超时时间（秒），调研阶段另见 `research.timeout_seconds`
    pub timeout_seconds: u64,
}

impl LLMConfig {
    /// 是否具备调用推理引擎的凭据
    pub fn has_credentials(&self) -> bool {
        !self.provider.requires_api_key() || !self.api_key.trim().is_empty()
    }
}

/// 搜索服务配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub provider: SearchProviderKind,

    pub api_key: String,

    /// 自定义接口地址，SearXNG 必填
    pub endpoint: Option<String>,

    /// 单次搜索最多返回的结果数
    pub max_results: usize,

    pub timeout_seconds: u64,
}

/// 网页抓取配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CrawlConfig {
    /// 工具调用未指定 `max_urls` 时的默认值
    pub default_max_urls: usize,

    /// `max_urls` 的上限
    pub max_urls_cap: usize,

    /// 清洗后正文的最少字数
    pub min_word_count: usize,

    pub bypass_cache: bool,

    /// 单个URL的抓取超时（秒）
    pub fetch_timeout_seconds: u64,

    pub user_agent: String,

    /// 发送给模型的单页正文最大字符数
    pub max_content_chars: Option<usize>,
}

/// 调研阶段配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ResearchConfig {
    pub min_angles: usize,

    pub max_angles: usize,

    /// 每个调研角度允许的工具调用次数
    pub tool_calls_per_angle: usize,

    /// 达到最大轮数时，是否基于对话历史做一次总结推理
    pub enable_summary_reasoning: bool,

    /// 调研阶段整体超时（秒），包含全部搜索与抓取
    pub timeout_seconds: u64,
}

impl ResearchConfig {
    /// 单次调研运行的工具调用预算
    pub fn tool_call_budget(&self) -> usize {
        self.tool_calls_per_angle * self.max_angles
    }

    /// ReAct最大轮数：预算内的每次工具调用一轮，另加规划与成文
    pub fn max_turns(&self) -> usize {
        self.tool_call_budget() + 2
    }
}

/// 流水线配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// 润色失败时是否交付初始报告
    pub elaboration_fallback: bool,

    /// 是否同时保存初始报告
    pub save_initial_report: bool,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 加载指定配置文件；未指定时尝试工作目录下的默认文件，都不存在则使用默认配置
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE).to_path_buf();
        if default_path.exists() {
            return Self::from_file(&default_path);
        }
        Ok(Self::default())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./research.reports"),
            verbose: false,
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            crawl: CrawlConfig::default(),
            research: ResearchConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("DEEP_RESEARCH_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api.openai.com/v1"),
            model_efficient: String::from("gpt-4o-mini"),
            model_powerful: String::from("gpt-4o"),
            max_tokens: 16384,
            temperature: 0.2,
            retry_attempts: 3,
            retry_delay_ms: 3000,
            timeout_seconds: 600,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::default(),
            api_key: std::env::var("DEEP_RESEARCH_SEARCH_API_KEY").unwrap_or_default(),
            endpoint: None,
            max_results: 10,
            timeout_seconds: 30,
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            default_max_urls: 10,
            max_urls_cap: 20,
            min_word_count: 100,
            bypass_cache: true,
            fetch_timeout_seconds: 45,
            user_agent: format!(
                "Mozilla/5.0 (compatible; deep-research-rs/{})",
                env!("CARGO_PKG_VERSION")
            ),
            max_content_chars: Some(12_000),
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            min_angles: 4,
            max_angles: 6,
            tool_calls_per_angle: 5,
            enable_summary_reasoning: true,
            timeout_seconds: 3600,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            elaboration_fallback: true,
            save_initial_report: true,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
