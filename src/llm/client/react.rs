//! ReAct模式的配置与结果

use rig::completion::Message;

/// ReAct模式配置
#[derive(Debug, Clone)]
pub struct ReActConfig {
    /// 最大迭代次数
    pub max_iterations: usize,
    /// 达到最大迭代次数时是否返回部分结果
    pub return_partial_on_max_depth: bool,
    /// 达到最大迭代次数时是否启用总结推理
    pub enable_summary_reasoning: bool,
}

impl Default for ReActConfig {
    fn default() -> Self {
        Self {
            max_iterations: 32,
            return_partial_on_max_depth: true,
            enable_summary_reasoning: true,
        }
    }
}

/// ReAct响应结果
#[derive(Debug, Clone)]
pub struct ReActResponse {
    /// 最终回复内容
    pub content: String,
    /// 实际使用的迭代次数
    pub iterations_used: usize,
    /// 是否因达到最大迭代次数而停止
    pub stopped_by_max_depth: bool,
    /// 工具调用记录，形如 `name(args)`
    pub tool_calls_history: Vec<String>,
    /// 对话历史（仅在达到最大迭代次数时保留）
    pub chat_history: Option<Vec<Message>>,
}

impl ReActResponse {
    pub fn success(content: String, iterations_used: usize) -> Self {
        Self {
            content,
            iterations_used,
            stopped_by_max_depth: false,
            tool_calls_history: Vec::new(),
            chat_history: None,
        }
    }

    pub fn max_depth_reached_with_history(
        content: String,
        max_depth: usize,
        tool_calls_history: Vec<String>,
        chat_history: Vec<Message>,
    ) -> Self {
        Self {
            content,
            iterations_used: max_depth,
            stopped_by_max_depth: true,
            tool_calls_history,
            chat_history: Some(chat_history),
        }
    }

    pub fn from_summary_reasoning(
        content: String,
        iterations_used: usize,
        tool_calls_history: Vec<String>,
        chat_history: Vec<Message>,
    ) -> Self {
        Self {
            content,
            iterations_used,
            stopped_by_max_depth: false,
            tool_calls_history,
            chat_history: Some(chat_history),
        }
    }
}
