//! Agent构建器

use std::sync::Arc;

use super::providers::{ProviderAgent, ProviderClient};
use crate::{config::Config, generator::research::toolkit::ResearchToolkit};

pub struct AgentBuilder<'a> {
    client: &'a ProviderClient,
    config: &'a Config,
}

impl<'a> AgentBuilder<'a> {
    pub fn new(client: &'a ProviderClient, config: &'a Config) -> Self {
        Self { client, config }
    }

    /// 挂载调研工具（web_search、extract_urls_from_search、crawl_urls）的Agent
    pub fn build_agent_with_tools(
        &self,
        model: &str,
        system_prompt: &str,
        toolkit: &Arc<ResearchToolkit>,
    ) -> ProviderAgent {
        self.client
            .create_agent_with_tools(model, system_prompt, &self.config.llm, toolkit)
    }

    pub fn build_agent_without_tools(&self, model: &str, system_prompt: &str) -> ProviderAgent {
        self.client
            .create_agent(model, system_prompt, &self.config.llm)
    }
}
