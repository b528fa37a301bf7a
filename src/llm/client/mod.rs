//! LLM客户端 - 基于rig的推理引擎实现

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    config::Config,
    generator::research::toolkit::ResearchToolkit,
    llm::client::utils::evaluate_befitting_model,
    llm::engine::{ReasoningEngine, ReasoningTask},
};

mod agent_builder;
mod providers;
mod react;
mod react_executor;
mod summary_reasoner;
pub mod utils;

pub use react::{ReActConfig, ReActResponse};

use agent_builder::AgentBuilder;
use providers::ProviderClient;
use react_executor::ReActExecutor;
use summary_reasoner::SummaryReasoner;

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: Config,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: Config) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        Ok(Self { client, config })
    }

    /// 获取Agent构建器
    fn get_agent_builder(&self) -> AgentBuilder<'_> {
        AgentBuilder::new(&self.client, &self.config)
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        utils::retry_with_backoff(&self.config.llm, operation, || true).await
    }

    /// 使用ReAct模式进行多轮工具调用对话
    pub async fn prompt_with_react(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        toolkit: &Arc<ResearchToolkit>,
        react_config: ReActConfig,
    ) -> Result<ReActResponse> {
        let (befitting_model, _) =
            evaluate_befitting_model(&self.config.llm, system_prompt, user_prompt);
        let agent =
            self.get_agent_builder()
                .build_agent_with_tools(&befitting_model, system_prompt, toolkit);

        // 工具调用已消耗预算并写入日志后，重新开始的对话拿不到这些结果，不再重试
        let calls_before = toolkit.calls_made();
        let response = utils::retry_with_backoff(
            &self.config.llm,
            || async { ReActExecutor::execute(&agent, user_prompt, &react_config).await },
            || toolkit.calls_made() == calls_before,
        )
        .await?;

        // 达到最大迭代次数且启用了总结推理，则尝试fallover
        if response.stopped_by_max_depth
            && react_config.enable_summary_reasoning
            && response.chat_history.is_some()
        {
            info!("🔄 启动ReAct Agent总结转直接推理模式...");

            match self
                .try_summary_reasoning(&befitting_model, system_prompt, user_prompt, &response)
                .await
            {
                Ok(summary_response) => {
                    info!("✅ 总结推理完成");
                    return Ok(summary_response);
                }
                Err(e) => {
                    warn!("⚠️ 总结推理失败，返回原始部分结果...{}", e);
                }
            }
        }

        Ok(response)
    }

    /// 尝试总结推理fallover
    async fn try_summary_reasoning(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        original_response: &ReActResponse,
    ) -> Result<ReActResponse> {
        let agent_without_tools = self
            .get_agent_builder()
            .build_agent_without_tools(model, system_prompt);

        let chat_history = original_response
            .chat_history
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("缺少对话历史"))?;

        let summary_result = self
            .retry_with_backoff(|| async {
                SummaryReasoner::summarize_and_reason(
                    &agent_without_tools,
                    system_prompt,
                    user_prompt,
                    chat_history,
                    &original_response.tool_calls_history,
                )
                .await
            })
            .await?;

        Ok(ReActResponse::from_summary_reasoning(
            summary_result,
            original_response.iterations_used,
            original_response.tool_calls_history.clone(),
            chat_history.clone(),
        ))
    }

    /// 单轮对话（不使用工具），高能效模型失败后使用备选模型
    pub async fn prompt_without_react(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String> {
        let (befitting_model, fallover_model) =
            evaluate_befitting_model(&self.config.llm, system_prompt, user_prompt);

        let agent = self
            .get_agent_builder()
            .build_agent_without_tools(&befitting_model, system_prompt);

        match self
            .retry_with_backoff(|| async { agent.prompt(user_prompt).await })
            .await
        {
            Ok(result) => Ok(result),
            Err(e) => match fallover_model {
                Some(model) if model != befitting_model => {
                    warn!(
                        "❌ 调用模型服务出错，尝试 {} 次均失败，尝试使用备选模型{}...{}",
                        self.config.llm.retry_attempts, model, e
                    );
                    let agent = self
                        .get_agent_builder()
                        .build_agent_without_tools(&model, system_prompt);
                    self.retry_with_backoff(|| async { agent.prompt(user_prompt).await })
                        .await
                }
                _ => Err(e),
            },
        }
    }
}

#[async_trait]
impl ReasoningEngine for LLMClient {
    /// 检查模型连接和功能是否正常
    async fn check_connection(&self) -> Result<()> {
        info!("🔄 正在检查模型连接...");
        match self
            .prompt_without_react("You are a helpful assistant.", "Hello")
            .await
        {
            Ok(_) => {
                info!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                warn!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    async fn reason(&self, task: ReasoningTask) -> Result<String> {
        match &task.toolkit {
            Some(toolkit) => {
                let react_config = ReActConfig {
                    max_iterations: task.max_turns,
                    enable_summary_reasoning: self.config.research.enable_summary_reasoning,
                    ..ReActConfig::default()
                };
                info!(
                    agent = %task.agent_name,
                    max_turns = task.max_turns,
                    "♻️ 启动工具调用推理"
                );
                let response = self
                    .prompt_with_react(&task.instructions, &task.input, toolkit, react_config)
                    .await?;
                info!(
                    agent = %task.agent_name,
                    tool_calls = response.tool_calls_history.len(),
                    stopped_by_max_depth = response.stopped_by_max_depth,
                    "推理完成"
                );
                Ok(response.content)
            }
            None => {
                self.prompt_without_react(&task.instructions, &task.input)
                    .await
            }
        }
    }
}
