// 润色阶段：扩充初始报告，再由报告守卫校验标题、骨架与元评论

pub mod elaborator;
pub mod guard;

pub use elaborator::ReportElaborator;
pub use guard::{ElaborationViolation, enforce, find_banned_phrases};
