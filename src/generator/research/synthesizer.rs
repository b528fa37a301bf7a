use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use crate::generator::research::archetype::render_classification_guide;
use crate::generator::research::memory::{MemoryScope, ScopedKeys, ToolJournal};
use crate::generator::{
    context::GeneratorContext,
    step_forward_agent::{
        AgentDataConfig, DataSource, LLMCallMode, PromptTemplate, StepForwardAgent,
    },
};
use crate::types::report::ResearchReport;

/// 调研综合器 - 按主题类型拆分调研角度，调用搜索与抓取工具收集资料，并写出带引用的初始报告
#[derive(Default, Clone)]
pub struct ResearchSynthesizer;

impl ResearchSynthesizer {
    fn instructions(min_angles: usize, max_angles: usize, tool_budget: usize) -> String {
        format!(
            r#"You are a research assistant that performs comprehensive, multi-angle research on ANY topic or request.

Your adaptive workflow:
{guide}
3. RESEARCH EACH ANGLE: For each relevant research angle:
   - Use web_search with specific, targeted queries tailored to the angle
   - Extract URLs from search results using extract_urls_from_search
   - Use crawl_urls to get detailed content from the most relevant sources
   - Keep only the crawled content that is relevant to the angle
   - A failed search or crawl is not fatal: try another query or continue with what you have

4. SYNTHESIZE COMPREHENSIVE REPORT:
   - Start with a single H1 title naming the research topic
   - Create one markdown section (##) for each research angle
   - Include specific data, facts, quotes, and examples from sources
   - Use in-place citations in the format [Source Title](URL) throughout the text
   - Tailor the depth and style to match the request type

5. QUALITY STANDARDS:
   - Each section should be substantive with specific details and evidence
   - Only cite URLs that appeared in your tool results
   - Use the tone listed for the request type
   - Always cite sources properly with in-place citations

You may make at most {tool_budget} tool calls in total. When a tool reports that the budget is exhausted, write the report with the material already gathered.
Reply with the final markdown report only."#,
            guide = render_classification_guide(min_angles, max_angles).trim_end(),
            tool_budget = tool_budget,
        )
    }
}

#[async_trait]
impl StepForwardAgent for ResearchSynthesizer {
    type Output = ResearchReport;

    fn agent_type(&self) -> String {
        "research_agent".to_string()
    }

    fn memory_scope_key(&self) -> String {
        MemoryScope::REPORTS.to_string()
    }

    fn memory_key(&self) -> String {
        ScopedKeys::INITIAL_REPORT.to_string()
    }

    fn stage_timeout(&self, context: &GeneratorContext) -> Duration {
        Duration::from_secs(context.config.research.timeout_seconds)
    }

    fn data_config(&self) -> AgentDataConfig {
        AgentDataConfig {
            required_sources: vec![DataSource::Topic],
            optional_sources: vec![],
        }
    }

    fn prompt_template(&self, context: &GeneratorContext) -> PromptTemplate {
        let research = &context.config.research;
        PromptTemplate {
            system_prompt: Self::instructions(
                research.min_angles,
                research.max_angles,
                research.tool_call_budget(),
            ),
            opening_instruction: String::new(),
            closing_instruction: "Research this topic from every relevant angle and write the report."
                .to_string(),
            llm_call_mode: LLMCallMode::PromptWithTools,
        }
    }

    async fn post_process(&self, raw: String, context: &GeneratorContext) -> Result<Self::Output> {
        let summary = context.journal_summary().await;
        info!(
            "🔎 工具调用统计: 搜索 {}/{} 成功, 抓取批次 {} 个, 页面 {}/{} 成功",
            summary.searches_succeeded,
            summary.searches_attempted,
            summary.crawl_batches,
            summary.urls_crawled,
            summary.urls_attempted
        );

        if let Some(reason) = summary.capability_outage() {
            return Err(anyhow!(reason));
        }

        let report = ResearchReport::new(raw);
        if report.is_empty() {
            return Err(anyhow!("research agent returned an empty report"));
        }

        let sections = report.sections();
        if sections.is_empty() {
            warn!("⚠️ 初始报告没有按调研角度划分章节");
        }
        let uncited: Vec<&str> = sections
            .iter()
            .filter(|s| s.citations().is_empty())
            .map(|s| s.heading.as_str())
            .collect();
        if !uncited.is_empty() {
            warn!("⚠️ 以下章节缺少引用: {}", uncited.join(", "));
        }

        Ok(report)
    }
}
