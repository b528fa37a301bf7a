use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::LLMConfig;

/// 高能效模型可以处理的提示词长度上限（字节）
const EFFICIENT_PROMPT_LIMIT: usize = 32 * 1024;

/// 根据提示词长度选择模型，返回 (首选模型, 备选模型)
pub fn evaluate_befitting_model(
    llm_config: &LLMConfig,
    system_prompt: &str,
    user_prompt: &str,
) -> (String, Option<String>) {
    if system_prompt.len() + user_prompt.len() <= EFFICIENT_PROMPT_LIMIT {
        return (
            llm_config.model_efficient.clone(),
            Some(llm_config.model_powerful.clone()),
        );
    }
    (llm_config.model_powerful.clone(), None)
}

/// 带退避的重试；`may_retry` 返回 false 时直接返回本次错误
pub async fn retry_with_backoff<T, F, Fut, G>(
    llm_config: &LLMConfig,
    operation: F,
    may_retry: G,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
    G: Fn() -> bool,
{
    let max_retries = llm_config.retry_attempts.max(1);
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                retries += 1;
                if !may_retry() {
                    warn!("❌ 调用模型服务出错，已有副作用，不再重试: {}", err);
                    return Err(err);
                }
                warn!(
                    "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                    retries, max_retries, err
                );
                if retries >= max_retries {
                    return Err(err);
                }
                tokio::time::sleep(Duration::from_millis(llm_config.retry_delay_ms)).await;
            }
        }
    }
}
