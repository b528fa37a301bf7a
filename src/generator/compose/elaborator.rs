use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::info;

use crate::generator::compose::guard;
use crate::generator::research::memory::{MemoryScope, ScopedKeys};
use crate::generator::{
    context::GeneratorContext,
    step_forward_agent::{
        AgentDataConfig, DataSource, LLMCallMode, PromptTemplate, StepForwardAgent,
    },
};
use crate::types::report::{EnhancedReport, ResearchReport};

const ELABORATION_INSTRUCTIONS: &str = r#"You are an expert content enhancer specializing in research elaboration.

When given a research report:
1. Analyze the structure and content of the report
2. Enhance the report by:
   - Including relevant examples, case studies, and real-world applications
   - Expanding on key points with additional context and nuance
   - Adding descriptions of visual elements (charts, diagrams, infographics)
   - Incorporating latest trends and future predictions
   - Suggesting practical implications for different stakeholders
   - Adding proper in-place citations in the format [Source Title](URL)
3. Maintain academic rigor and factual accuracy
4. Preserve the original title and every original section heading, in the original order
5. Do not add "Enhanced Research Report:" or similar prefixes to the title
6. Use consistent in-place citation format: [Source Title](URL) or [Author/Organization](URL)
7. Generate the final report in markdown format with proper headers, subheaders and bullet points
8. Do NOT add meta-commentary such as:
   - "Next Steps" sections
   - A conclusion that mentions the research or writing process
   - Requests for feedback or further input
   - Mentions of data collection phases or AI processes
9. End the report with substantive content. It must read as a complete, standalone professional document."#;

/// 报告润色器 - 在保留标题与章节骨架的前提下扩充初始报告
#[derive(Default, Clone)]
pub struct ReportElaborator;

#[async_trait]
impl StepForwardAgent for ReportElaborator {
    type Output = EnhancedReport;

    fn agent_type(&self) -> String {
        "elaboration_agent".to_string()
    }

    fn memory_scope_key(&self) -> String {
        MemoryScope::REPORTS.to_string()
    }

    fn memory_key(&self) -> String {
        ScopedKeys::ENHANCED_REPORT.to_string()
    }

    fn data_config(&self) -> AgentDataConfig {
        AgentDataConfig {
            required_sources: vec![DataSource::Topic, DataSource::INITIAL_REPORT],
            optional_sources: vec![],
        }
    }

    fn prompt_template(&self, _context: &GeneratorContext) -> PromptTemplate {
        PromptTemplate {
            system_prompt: ELABORATION_INSTRUCTIONS.to_string(),
            opening_instruction: String::new(),
            closing_instruction: "Please enhance this research report with additional information, examples, case studies, and deeper insights while maintaining its academic rigor and factual accuracy.".to_string(),
            llm_call_mode: LLMCallMode::Prompt,
        }
    }

    async fn post_process(&self, raw: String, context: &GeneratorContext) -> Result<Self::Output> {
        let original = context
            .get_from_memory::<ResearchReport>(MemoryScope::REPORTS, ScopedKeys::INITIAL_REPORT)
            .await
            .ok_or_else(|| anyhow!("initial report is missing from run memory"))?;

        let enhanced = guard::enforce(&original, &raw)?;
        info!(
            "✨ 润色完成: {} 个章节, {} 处引用",
            enhanced.report().sections().len(),
            enhanced.report().citations().len()
        );
        Ok(enhanced)
    }
}
