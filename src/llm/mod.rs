pub mod client;
pub mod engine;
pub mod tools;

pub use engine::{ReasoningEngine, ReasoningTask};
