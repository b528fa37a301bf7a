pub mod cli;
pub mod config;
pub mod generator;
pub mod llm;
pub mod memory;
pub mod types;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use generator::workflow::{PipelineController, launch};
