use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::generator::context::GeneratorContext;
use crate::generator::research::memory::{MemoryScope, ScopedKeys};
use crate::llm::ReasoningTask;
use crate::types::report::ResearchReport;

/// 数据源配置 - 基于Memory Key的直接数据访问机制
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// 本次运行的调研主题
    Topic,
    /// 从Memory中获取数据
    MemoryData {
        scope: &'static str,
        key: &'static str,
    },
}

impl DataSource {
    pub const INITIAL_REPORT: DataSource = DataSource::MemoryData {
        scope: MemoryScope::REPORTS,
        key: ScopedKeys::INITIAL_REPORT,
    };
}

/// Agent数据配置 - 声明所需的数据源
#[derive(Debug, Clone)]
pub struct AgentDataConfig {
    /// 必需的数据源 - 缺少时执行失败
    pub required_sources: Vec<DataSource>,
    /// 可选的数据源 - 缺少时不影响执行
    pub optional_sources: Vec<DataSource>,
}

/// LLM调用方式配置
#[derive(Debug, Clone, PartialEq)]
pub enum LLMCallMode {
    /// 无工具的单轮推理
    Prompt,
    /// 挂载调研工具的多轮推理
    PromptWithTools,
}

/// Prompt模板配置
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// 系统提示词
    pub system_prompt: String,
    /// 开头的说明性指令
    pub opening_instruction: String,
    /// 结尾的强调性指令
    pub closing_instruction: String,
    /// LLM调用方式
    pub llm_call_mode: LLMCallMode,
}

/// 按数据源顺序拼装用户提示词
pub async fn build_user_prompt(
    context: &GeneratorContext,
    template: &PromptTemplate,
    sources: &[DataSource],
    topic: &str,
) -> Result<String> {
    let mut prompt = String::new();
    if !template.opening_instruction.is_empty() {
        prompt.push_str(&template.opening_instruction);
        prompt.push_str("\n\n");
    }

    for source in sources {
        match source {
            DataSource::Topic => {
                prompt.push_str(&format!("RESEARCH TOPIC: {}\n\n", topic));
            }
            DataSource::MemoryData { scope, key } => match *key {
                ScopedKeys::INITIAL_REPORT => {
                    if let Some(report) = context.get_from_memory::<ResearchReport>(scope, key).await
                    {
                        prompt.push_str(&format!(
                            "INITIAL RESEARCH REPORT:\n{}\n\n",
                            report.markdown()
                        ));
                    }
                }
                _ => {
                    if let Some(value) = context.get_from_memory::<serde_json::Value>(scope, key).await
                    {
                        prompt.push_str(&format!(
                            "{}:\n{}\n\n",
                            key.to_uppercase(),
                            serde_json::to_string_pretty(&value)?
                        ));
                    }
                }
            },
        }
    }

    prompt.push_str(&template.closing_instruction);
    Ok(prompt.trim_end().to_string())
}

/// 流水线中的单个Agent阶段
#[async_trait]
pub trait StepForwardAgent: Send + Sync {
    /// Agent的输出类型 - 必须支持JSON序列化
    type Output: for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static;

    /// Agent类型标识
    fn agent_type(&self) -> String;

    fn memory_scope_key(&self) -> String;

    /// 产物在Memory中的键，默认与Agent类型一致
    fn memory_key(&self) -> String {
        self.agent_type()
    }

    /// 数据源配置
    fn data_config(&self) -> AgentDataConfig;

    /// Prompt模板配置
    fn prompt_template(&self, context: &GeneratorContext) -> PromptTemplate;

    /// 阶段超时，默认取推理超时
    fn stage_timeout(&self, context: &GeneratorContext) -> Duration {
        Duration::from_secs(context.config.llm.timeout_seconds)
    }

    /// 把模型输出转换为阶段产物，并校验阶段约束
    async fn post_process(&self, raw: String, context: &GeneratorContext) -> Result<Self::Output>;

    /// 默认实现的execute方法 - 校验数据源、调用推理引擎、后处理并存储结果
    async fn execute(&self, context: &GeneratorContext, topic: &str) -> Result<Self::Output> {
        let config = self.data_config();

        for source in &config.required_sources {
            if let DataSource::MemoryData { scope, key } = source
                && !context.has_memory_data(scope, key).await
            {
                return Err(anyhow!("必需的数据源 {}:{} 不可用", scope, key));
            }
        }

        let all_sources = [config.required_sources, config.optional_sources].concat();
        let template = self.prompt_template(context);
        let user_prompt = build_user_prompt(context, &template, &all_sources, topic).await?;

        let mut task = ReasoningTask::new(self.agent_type(), template.system_prompt, user_prompt);
        if template.llm_call_mode == LLMCallMode::PromptWithTools {
            task = task.with_tools(context.toolkit.clone(), context.config.research.max_turns());
        }

        let timeout = self.stage_timeout(context);
        let raw = tokio::time::timeout(timeout, context.engine.reason(task))
            .await
            .map_err(|_| anyhow!("{} timed out after {}s", self.agent_type(), timeout.as_secs()))??;

        let output = self.post_process(raw, context).await?;

        context
            .store_to_memory(&self.memory_scope_key(), &self.memory_key(), &output)
            .await?;

        info!("✅ Sub-Agent [{}]执行完成", self.agent_type());
        Ok(output)
    }
}
