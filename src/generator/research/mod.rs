// 调研阶段：识别请求类型，按角度调用工具收集资料，综合成带引用的初始报告

pub mod archetype;
pub mod memory;
pub mod synthesizer;
pub mod toolkit;

pub use synthesizer::ResearchSynthesizer;
pub use toolkit::{ResearchToolkit, ToolError};
