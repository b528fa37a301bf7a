//! 总结推理模块 - 当ReAct模式达到最大迭代次数时的fallover机制

use anyhow::Result;
use rig::completion::{AssistantContent, Message};

use super::providers::ProviderAgent;

/// 单条工具结果写入总结提示词的最大字符数
const MAX_TOOL_RESULT_CHARS: usize = 4000;

/// 总结推理器
pub struct SummaryReasoner;

impl SummaryReasoner {
    /// 基于ReAct对话历史和工具调用记录进行总结推理
    pub async fn summarize_and_reason(
        agent_without_tools: &ProviderAgent,
        original_system_prompt: &str,
        original_user_prompt: &str,
        chat_history: &[Message],
        tool_calls_history: &[String],
    ) -> Result<String> {
        let summary_prompt = Self::build_summary_prompt(
            original_system_prompt,
            original_user_prompt,
            chat_history,
            tool_calls_history,
        );

        agent_without_tools.prompt(&summary_prompt).await
    }

    /// 构建总结推理的提示词
    fn build_summary_prompt(
        original_system_prompt: &str,
        original_user_prompt: &str,
        chat_history: &[Message],
        tool_calls_history: &[String],
    ) -> String {
        let mut prompt = String::new();

        prompt.push_str("# Original task\n");
        prompt.push_str(original_system_prompt);
        prompt.push_str("\n\n");

        prompt.push_str("# Original request\n");
        prompt.push_str(original_user_prompt);
        prompt.push_str("\n\n");

        if !tool_calls_history.is_empty() {
            prompt.push_str("# Tool calls already executed\n");
            for (index, tool_call) in tool_calls_history.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", index + 1, tool_call));
            }
            prompt.push('\n');
        }

        let conversation_details = Self::extract_detailed_conversation_info(chat_history);
        if !conversation_details.is_empty() {
            prompt.push_str("# Conversation and tool results\n");
            prompt.push_str(&conversation_details);
            prompt.push_str("\n\n");
        }

        prompt.push_str("# Final task\n");
        prompt.push_str(
            "The research loop was cut off because it reached its tool-call limit. No more tools \
             can be called. Using only the material gathered above, write the complete final \
             report now, following every formatting and citation rule of the original task.\n\n",
        );
        prompt.push_str("Rules:\n");
        prompt.push_str("1. Do not invent sources or facts that do not appear above\n");
        prompt.push_str("2. Cite sources inline as [Source Title](URL)\n");
        prompt.push_str("3. Cover every research angle that has supporting material\n");
        prompt.push_str("4. Output only the report in markdown, with no commentary about the process\n");

        prompt
    }

    /// 提取对话历史中的文本、工具调用与推理过程
    fn extract_detailed_conversation_info(chat_history: &[Message]) -> String {
        let mut details = String::new();

        for (index, message) in chat_history.iter().enumerate() {
            if index == 0 {
                // 第一条为原始请求
                continue;
            }
            match message {
                Message::User { content } => {
                    let rendered = format!("{:?}", content);
                    details.push_str(&format!("## Tool results [turn {}]\n", index + 1));
                    details.push_str(&truncate(&rendered, MAX_TOOL_RESULT_CHARS));
                    details.push_str("\n\n");
                }
                Message::Assistant { content, .. } => {
                    details.push_str(&format!("## Assistant [turn {}]\n", index + 1));

                    let mut has_content = false;
                    for item in content.iter() {
                        match item {
                            AssistantContent::Text(text) => {
                                if !text.text.is_empty() {
                                    details.push_str(&format!("**Text:** {}\n\n", text.text));
                                    has_content = true;
                                }
                            }
                            AssistantContent::ToolCall(tool_call) => {
                                details.push_str(&format!(
                                    "**Tool call:** `{}` \nArguments: `{}`\n\n",
                                    tool_call.function.name, tool_call.function.arguments
                                ));
                                has_content = true;
                            }
                            AssistantContent::Reasoning(reasoning) => {
                                if !reasoning.reasoning.is_empty() {
                                    details.push_str(&format!(
                                        "**Reasoning:** {}\n\n",
                                        reasoning.reasoning.join("\n")
                                    ));
                                    has_content = true;
                                }
                            }
                        }
                    }

                    if !has_content {
                        details.push_str("(empty)\n\n");
                    }
                }
            }
        }

        details
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{}…", &text[..byte_index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_sections() {
        let prompt = SummaryReasoner::build_summary_prompt(
            "You are a research assistant.",
            "electric bicycles",
            &[],
            &["web_search({\"query\":\"e-bike prices\"})".to_string()],
        );

        assert!(prompt.starts_with("# Original task\nYou are a research assistant."));
        assert!(prompt.contains("# Original request\nelectric bicycles"));
        assert!(prompt.contains("1. web_search({\"query\":\"e-bike prices\"})"));
        assert!(!prompt.contains("# Conversation and tool results"));
        assert!(prompt.contains("[Source Title](URL)"));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("short", 10), "short");
    }
}
