#[cfg(test)]
mod tests {
    use crate::config::{
        Config, CrawlConfig, LLMConfig, LLMProvider, ResearchConfig, SearchProviderKind,
    };
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.output_path, PathBuf::from("./research.reports"));
        assert!(!config.verbose);
        assert!(config.pipeline.elaboration_fallback);
        assert!(config.pipeline.save_initial_report);
    }

    #[test]
    fn test_llm_provider_default() {
        let provider = LLMProvider::default();
        assert_eq!(provider, LLMProvider::OpenAI);
    }

    #[test]
    fn test_llm_provider_from_str() {
        assert_eq!(
            "openai".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenAI
        );
        assert_eq!(
            "DeepSeek".parse::<LLMProvider>().unwrap(),
            LLMProvider::DeepSeek
        );
        assert_eq!(
            "openrouter".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenRouter
        );
        assert_eq!(
            "anthropic".parse::<LLMProvider>().unwrap(),
            LLMProvider::Anthropic
        );
        assert_eq!(
            "ollama".parse::<LLMProvider>().unwrap(),
            LLMProvider::Ollama
        );

        assert!("gemini".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_llm_provider_display() {
        assert_eq!(LLMProvider::OpenAI.to_string(), "openai");
        assert_eq!(LLMProvider::DeepSeek.to_string(), "deepseek");
        assert_eq!(LLMProvider::OpenRouter.to_string(), "openrouter");
        assert_eq!(LLMProvider::Anthropic.to_string(), "anthropic");
        assert_eq!(LLMProvider::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_search_provider_parsing() {
        assert_eq!(
            "Brave".parse::<SearchProviderKind>().unwrap(),
            SearchProviderKind::Brave
        );
        assert_eq!(SearchProviderKind::Searxng.to_string(), "searxng");
        assert!("bing".parse::<SearchProviderKind>().is_err());
    }

    #[test]
    fn test_llm_config_default() {
        let config = LLMConfig::default();

        assert_eq!(config.provider, LLMProvider::OpenAI);
        // api_key may be empty if env var is not set
        assert!(!config.api_base_url.is_empty());
        assert!(!config.model_efficient.is_empty());
        assert!(!config.model_powerful.is_empty());
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.timeout_seconds, 600);
    }

    #[test]
    fn test_credentials() {
        let mut config = LLMConfig {
            api_key: String::new(),
            ..LLMConfig::default()
        };
        assert!(!config.has_credentials());

        config.api_key = "   ".to_string();
        assert!(!config.has_credentials());

        config.api_key = "sk-test".to_string();
        assert!(config.has_credentials());

        config.api_key.clear();
        config.provider = LLMProvider::Ollama;
        assert!(config.has_credentials());
    }

    #[test]
    fn test_crawl_defaults() {
        let config = CrawlConfig::default();

        assert_eq!(config.default_max_urls, 10);
        assert_eq!(config.max_urls_cap, 20);
        assert_eq!(config.min_word_count, 100);
        assert!(config.bypass_cache);
        assert!(config.user_agent.contains("deep-research-rs"));
    }

    #[test]
    fn test_research_budget() {
        let config = ResearchConfig {
            tool_calls_per_angle: 4,
            max_angles: 6,
            ..ResearchConfig::default()
        };

        assert_eq!(config.tool_call_budget(), 24);
        assert_eq!(config.max_turns(), 26);
        assert_eq!(ResearchConfig::default().min_angles, 4);
        assert!(ResearchConfig::default().timeout_seconds > LLMConfig::default().timeout_seconds);
    }

    #[test]
    fn test_from_file_partial_sections() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deep-research.toml");

        let content = r#"output_path = "/tmp/reports"

[llm]
provider = "anthropic"
api_key = "key-from-file"
model_efficient = "claude-haiku"

[search]
provider = "searxng"
endpoint = "http://localhost:8888"

[crawl]
max_urls_cap = 8

[pipeline]
elaboration_fallback = false
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.output_path, PathBuf::from("/tmp/reports"));
        assert_eq!(config.llm.provider, LLMProvider::Anthropic);
        assert_eq!(config.llm.api_key, "key-from-file");
        assert_eq!(config.llm.model_efficient, "claude-haiku");
        // 未出现的字段使用默认值
        assert_eq!(config.llm.retry_attempts, 3);
        assert_eq!(config.search.provider, SearchProviderKind::Searxng);
        assert_eq!(config.search.endpoint.as_deref(), Some("http://localhost:8888"));
        assert_eq!(config.crawl.max_urls_cap, 8);
        assert_eq!(config.crawl.default_max_urls, 10);
        assert!(!config.pipeline.elaboration_fallback);
        assert_eq!(config.research.max_angles, 6);
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        assert!(Config::from_file(&missing).is_err());

        let broken = temp_dir.path().join("broken.toml");
        std::fs::write(&broken, "[llm\nprovider = ").unwrap();
        let err = Config::from_file(&broken).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "verbose = true\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.verbose);
    }
}
