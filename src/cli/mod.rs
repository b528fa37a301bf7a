use crate::config::{Config, LLMProvider, SearchProviderKind};
use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::PathBuf;

/// Deep Research - 由Rust与AI驱动的联网调研报告生成引擎
#[derive(Parser, Debug)]
#[command(name = "deep-research-rs")]
#[command(
    about = "Turns a research topic into a citation-backed markdown report: an agent plans research angles, searches and crawls the web, writes an initial report, then elaborates it without touching its structure."
)]
#[command(version)]
pub struct Args {
    /// 调研主题
    pub topic: String,

    /// 输出路径
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// LLM Provider (openai, deepseek, openrouter, anthropic, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// 高能效模型，用于常规推理任务
    #[arg(long)]
    pub model_efficient: Option<String>,

    /// 高质量模型，用于长上下文推理，以及作为efficient失效情况下的兜底
    #[arg(long)]
    pub model_powerful: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 搜索服务 (tavily, brave, searxng)
    #[arg(long)]
    pub search_provider: Option<String>,

    /// 搜索服务 API KEY
    #[arg(long)]
    pub search_api_key: Option<String>,

    /// 搜索服务接口地址
    #[arg(long)]
    pub search_endpoint: Option<String>,

    /// 单次抓取的默认URL数量
    #[arg(long)]
    pub max_urls: Option<usize>,

    /// 润色失败时直接失败，而不是交付初始报告
    #[arg(long)]
    pub no_elaboration_fallback: bool,
}

impl Args {
    /// 将CLI参数转换为配置，命令行参数覆盖配置文件
    pub fn into_config(self) -> Result<Config> {
        let mut config = Config::load(self.config.as_ref())?;

        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            config.llm.provider = provider_str
                .parse::<LLMProvider>()
                .map_err(|e| anyhow!(e))?;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 覆盖搜索配置
        if let Some(provider_str) = self.search_provider {
            config.search.provider = provider_str
                .parse::<SearchProviderKind>()
                .map_err(|e| anyhow!(e))?;
        }
        if let Some(search_api_key) = self.search_api_key {
            config.search.api_key = search_api_key;
        }
        if let Some(search_endpoint) = self.search_endpoint {
            config.search.endpoint = Some(search_endpoint);
        }

        if let Some(max_urls) = self.max_urls {
            config.crawl.default_max_urls = max_urls.min(config.crawl.max_urls_cap);
        }
        if self.no_elaboration_fallback {
            config.pipeline.elaboration_fallback = false;
        }
        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }
}

// Include tests
#[cfg(test)]
mod tests;
