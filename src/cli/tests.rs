#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::config::{LLMProvider, SearchProviderKind};
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// 写一个空配置文件，避免读取工作目录下的 deep-research.toml
    fn empty_config(dir: &TempDir) -> String {
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "").unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(["deep-research-rs", "electric bicycles"]).unwrap();

        assert_eq!(args.topic, "electric bicycles");
        assert!(args.output_path.is_none());
        assert!(args.config.is_none());
        assert!(!args.verbose);
        assert!(!args.no_elaboration_fallback);
    }

    #[test]
    fn test_topic_is_required() {
        assert!(Args::try_parse_from(["deep-research-rs"]).is_err());
    }

    #[test]
    fn test_args_short_options() {
        let args = Args::try_parse_from([
            "deep-research-rs",
            "quantum computing",
            "-o",
            "/test/output",
            "-c",
            "/config.toml",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.output_path, Some(PathBuf::from("/test/output")));
        assert_eq!(args.config, Some(PathBuf::from("/config.toml")));
        assert!(args.verbose);
    }

    #[test]
    fn test_args_llm_and_search_options() {
        let args = Args::try_parse_from([
            "deep-research-rs",
            "topic",
            "--llm-provider",
            "deepseek",
            "--llm-api-key",
            "test-key",
            "--model-efficient",
            "deepseek-chat",
            "--max-tokens",
            "2048",
            "--temperature",
            "0.7",
            "--search-provider",
            "brave",
            "--search-api-key",
            "brave-key",
            "--max-urls",
            "5",
            "--no-elaboration-fallback",
        ])
        .unwrap();

        assert_eq!(args.llm_provider, Some("deepseek".to_string()));
        assert_eq!(args.llm_api_key, Some("test-key".to_string()));
        assert_eq!(args.max_tokens, Some(2048));
        assert_eq!(args.temperature, Some(0.7));
        assert_eq!(args.search_provider, Some("brave".to_string()));
        assert_eq!(args.max_urls, Some(5));
        assert!(args.no_elaboration_fallback);
    }

    #[test]
    fn test_into_config_with_overrides() {
        let dir = TempDir::new().unwrap();
        let config_path = empty_config(&dir);
        let args = Args::try_parse_from([
            "deep-research-rs",
            "topic",
            "-c",
            &config_path,
            "-o",
            "/reports",
            "--llm-provider",
            "ollama",
            "--model-efficient",
            "llama3.1",
            "--search-provider",
            "searxng",
            "--search-endpoint",
            "http://localhost:8888",
            "--max-urls",
            "50",
            "--no-elaboration-fallback",
            "-v",
        ])
        .unwrap();

        let config = args.into_config().unwrap();

        assert_eq!(config.output_path, PathBuf::from("/reports"));
        assert_eq!(config.llm.provider, LLMProvider::Ollama);
        assert_eq!(config.llm.model_efficient, "llama3.1");
        assert_eq!(config.search.provider, SearchProviderKind::Searxng);
        assert_eq!(config.search.endpoint.as_deref(), Some("http://localhost:8888"));
        // 超过上限的取上限
        assert_eq!(config.crawl.default_max_urls, config.crawl.max_urls_cap);
        assert!(!config.pipeline.elaboration_fallback);
        assert!(config.verbose);
    }

    #[test]
    fn test_into_config_keeps_file_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep-research.toml");
        std::fs::write(
            &path,
            "output_path = \"/from/file\"\n[llm]\nmodel_powerful = \"big-model\"\n",
        )
        .unwrap();

        let args = Args::try_parse_from([
            "deep-research-rs",
            "topic",
            "-c",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let config = args.into_config().unwrap();

        assert_eq!(config.output_path, PathBuf::from("/from/file"));
        assert_eq!(config.llm.model_powerful, "big-model");
        assert!(config.pipeline.elaboration_fallback);
    }

    #[test]
    fn test_invalid_provider_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config_path = empty_config(&dir);
        let args = Args::try_parse_from([
            "deep-research-rs",
            "topic",
            "-c",
            &config_path,
            "--llm-provider",
            "invalid",
        ])
        .unwrap();

        let err = args.into_config().unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::try_parse_from([
            "deep-research-rs",
            "topic",
            "-c",
            "/nonexistent/deep-research.toml",
        ])
        .unwrap();

        assert!(args.into_config().is_err());
    }
}
