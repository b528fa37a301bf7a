use std::fmt;

use super::ElaborationStatus;
use crate::generator::outlet::Deliverable;
use crate::types::report::ResearchReport;

/// 流水线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Researching,
    Elaborating,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Researching => "researching",
            PipelineState::Elaborating => "elaborating",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 流水线事件的接收方，默认忽略所有事件
pub trait PipelineObserver: Send + Sync {
    fn on_state_change(&self, _from: PipelineState, _to: PipelineState) {}

    /// 润色开始前给出初始报告
    fn on_initial_report(&self, _report: &ResearchReport) {}

    fn on_final_report(
        &self,
        _report: &ResearchReport,
        _elaboration: &ElaborationStatus,
        _deliverable: &Deliverable,
    ) {
    }

    fn on_failure(&self, _message: &str) {}
}

pub struct SilentObserver;

impl PipelineObserver for SilentObserver {}

/// 命令行观察者：在控制台展示状态和报告
pub struct ConsoleObserver;

impl ConsoleObserver {
    fn final_report_header(elaboration: &ElaborationStatus) -> &'static str {
        match elaboration {
            ElaborationStatus::Enhanced => "📑 Enhanced Research Report",
            ElaborationStatus::FellBack { .. } => "📄 Research Report (initial version)",
        }
    }
}

impl PipelineObserver for ConsoleObserver {
    fn on_state_change(&self, _from: PipelineState, to: PipelineState) {
        match to {
            PipelineState::Researching => println!("\n🔍 Conducting comprehensive research..."),
            PipelineState::Elaborating => {
                println!("\n✨ Enhancing the report with additional information...")
            }
            PipelineState::Done => println!("\n🎉 Research complete"),
            PipelineState::Failed | PipelineState::Idle => {}
        }
    }

    fn on_initial_report(&self, report: &ResearchReport) {
        println!("\n📄 View Initial Research Report\n");
        println!("{}", report);
    }

    fn on_final_report(
        &self,
        report: &ResearchReport,
        elaboration: &ElaborationStatus,
        deliverable: &Deliverable,
    ) {
        println!("\n{}\n", Self::final_report_header(elaboration));
        println!("{}", report);
        println!(
            "\n📥 {} ({}, {} bytes)",
            deliverable.file_name,
            deliverable.mime_type,
            deliverable.content.len()
        );
    }

    fn on_failure(&self, message: &str) {
        eprintln!("\n❌ An error occurred: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(PipelineState::Researching.to_string(), "researching");
        assert_eq!(PipelineState::Failed.to_string(), "failed");
    }

    #[test]
    fn test_final_header_reflects_fallback() {
        assert!(ConsoleObserver::final_report_header(&ElaborationStatus::Enhanced).contains("Enhanced"));
        let fell_back = ElaborationStatus::FellBack {
            reason: "rate limited".into(),
        };
        assert!(!ConsoleObserver::final_report_header(&fell_back).contains("Enhanced"));
    }
}
