use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    config::Config,
    generator::research::toolkit::ResearchToolkit,
    llm::{ReasoningEngine, client::LLMClient},
    memory::Memory,
    web::{CrawlOrchestrator, HttpPageFetcher, PageFetcher, SearchProvider, build_search_provider},
};

/// 单次流水线运行的上下文
#[derive(Clone)]
pub struct GeneratorContext {
    /// 推理引擎
    pub engine: Arc<dyn ReasoningEngine>,
    /// 调研工具集，调用预算在本次运行内共享
    pub toolkit: Arc<ResearchToolkit>,
    /// 配置
    pub config: Config,
    /// 运行内存，保存工具日志与各阶段报告
    pub memory: Arc<RwLock<Memory>>,
}

/// 流水线依赖的外部能力
#[derive(Clone)]
pub struct Capabilities {
    pub engine: Arc<dyn ReasoningEngine>,
    pub search: Arc<dyn SearchProvider>,
    pub fetcher: Arc<dyn PageFetcher>,
}

impl Capabilities {
    /// 根据配置创建真实的LLM、搜索与抓取实现
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            engine: Arc::new(LLMClient::new(config.clone())?),
            search: build_search_provider(&config.search)?,
            fetcher: Arc::new(HttpPageFetcher::from_config(&config.crawl)),
        })
    }
}

impl GeneratorContext {
    /// 创建新的生成器上下文
    pub fn new(config: Config) -> Result<Self> {
        let capabilities = Capabilities::from_config(&config)?;
        Ok(Self::with_capabilities(config, &capabilities))
    }

    /// 使用给定的外部能力创建上下文，内存与工具预算都是全新的
    pub fn with_capabilities(config: Config, capabilities: &Capabilities) -> Self {
        let memory = Arc::new(RwLock::new(Memory::new()));
        let crawler = CrawlOrchestrator::from_config(capabilities.fetcher.clone(), &config.crawl);
        let toolkit = Arc::new(ResearchToolkit::new(
            capabilities.search.clone(),
            crawler,
            memory.clone(),
            &config,
        ));

        Self {
            engine: capabilities.engine.clone(),
            toolkit,
            config,
            memory,
        }
    }

    /// 存储数据到 Memory
    pub async fn store_to_memory<T>(&self, scope: &str, key: &str, data: T) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        let mut memory = self.memory.write().await;
        memory.store(scope, key, data)
    }

    /// 从 Memory 获取数据
    pub async fn get_from_memory<T>(&self, scope: &str, key: &str) -> Option<T>
    where
        T: for<'a> Deserialize<'a> + Send + Sync,
    {
        let mut memory = self.memory.write().await;
        memory.get(scope, key)
    }

    /// 检查Memory中是否存在指定数据
    pub async fn has_memory_data(&self, scope: &str, key: &str) -> bool {
        let memory = self.memory.read().await;
        memory.has_data(scope, key)
    }

    /// 获取作用域内的所有数据键
    pub async fn list_memory_keys(&self, scope: &str) -> Vec<String> {
        let memory = self.memory.read().await;
        memory.list_keys(scope)
    }

    /// 获取Memory使用统计
    pub async fn get_memory_stats(&self) -> HashMap<String, usize> {
        let memory = self.memory.read().await;
        memory.get_usage_stats()
    }
}
