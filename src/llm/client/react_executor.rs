//! ReAct执行器 - 负责执行ReAct模式的多轮对话逻辑

use anyhow::Result;
use rig::completion::{AssistantContent, Message, PromptError};
use tracing::{debug, warn};

use super::providers::ProviderAgent;
use super::react::{ReActConfig, ReActResponse};

/// ReAct执行器
pub struct ReActExecutor;

impl ReActExecutor {
    /// 执行ReAct循环逻辑
    pub async fn execute(
        agent: &ProviderAgent,
        user_prompt: &str,
        config: &ReActConfig,
    ) -> Result<ReActResponse> {
        debug!("♻️ 激活ReAct Agent模式，最大迭代次数: {}", config.max_iterations);

        match agent.multi_turn(user_prompt, config.max_iterations).await {
            Ok(response) => {
                debug!("✅ ReAct Agent任务完成");
                Ok(ReActResponse::success(response, config.max_iterations))
            }
            Err(PromptError::MaxDepthError {
                max_depth,
                chat_history,
                prompt: _,
            }) => {
                warn!("⚠️ 达到最大迭代次数 ({}), 触发中断", max_depth);

                if config.return_partial_on_max_depth {
                    let (content, tool_calls) = Self::extract_partial_result(&chat_history);
                    Ok(ReActResponse::max_depth_reached_with_history(
                        content,
                        max_depth,
                        tool_calls,
                        chat_history.to_vec(),
                    ))
                } else {
                    Err(anyhow::anyhow!(
                        "ReAct Agent因达到最大迭代次数({})而未完成任务",
                        max_depth
                    ))
                }
            }
            Err(e) => Err(anyhow::anyhow!("ReAct Agent任务执行失败: {}", e)),
        }
    }

    /// 从聊天历史中提取部分结果：最后一条助手文本，以及全部工具调用
    fn extract_partial_result(chat_history: &[Message]) -> (String, Vec<String>) {
        let last_assistant_message = chat_history
            .iter()
            .rev()
            .find_map(|msg| match msg {
                Message::Assistant { content, .. } => {
                    let text_content = content
                        .iter()
                        .filter_map(|c| match c {
                            AssistantContent::Text(text) => Some(text.text.clone()),
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                        .join("\n");
                    (!text_content.trim().is_empty()).then_some(text_content)
                }
                _ => None,
            })
            .unwrap_or_default();

        let tool_calls = chat_history
            .iter()
            .filter_map(|msg| match msg {
                Message::Assistant { content, .. } => Some(content.iter()),
                _ => None,
            })
            .flatten()
            .filter_map(|c| match c {
                AssistantContent::ToolCall(tool_call) => Some(format!(
                    "{}({})",
                    tool_call.function.name, tool_call.function.arguments
                )),
                _ => None,
            })
            .collect();

        (last_assistant_message, tool_calls)
    }
}
