//! 推理引擎抽象 - 流水线只依赖该trait，具体实现可以替换为mock

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::generator::research::toolkit::ResearchToolkit;

/// 一次推理任务
#[derive(Clone)]
pub struct ReasoningTask {
    /// Agent名称，仅用于日志
    pub agent_name: String,
    /// 系统指令
    pub instructions: String,
    /// 用户输入
    pub input: String,
    /// 可调用的调研工具；为 `None` 时进行无工具的单轮推理
    pub toolkit: Option<Arc<ResearchToolkit>>,
    /// 多轮工具调用的最大轮数
    pub max_turns: usize,
}

impl ReasoningTask {
    pub fn new(
        agent_name: impl Into<String>,
        instructions: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            instructions: instructions.into(),
            input: input.into(),
            toolkit: None,
            max_turns: 1,
        }
    }

    pub fn with_tools(mut self, toolkit: Arc<ResearchToolkit>, max_turns: usize) -> Self {
        self.toolkit = Some(toolkit);
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn uses_tools(&self) -> bool {
        self.toolkit.is_some()
    }
}

impl std::fmt::Debug for ReasoningTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningTask")
            .field("agent_name", &self.agent_name)
            .field("instructions_len", &self.instructions.len())
            .field("input_len", &self.input.len())
            .field("uses_tools", &self.uses_tools())
            .field("max_turns", &self.max_turns)
            .finish()
    }
}

/// 支持工具调用的推理能力
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// 检查模型连接是否正常
    async fn check_connection(&self) -> Result<()>;

    /// 执行推理任务，返回最终文本
    async fn reason(&self, task: ReasoningTask) -> Result<String>;
}
