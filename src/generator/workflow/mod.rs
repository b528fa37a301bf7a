use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::generator::compose::ReportElaborator;
use crate::generator::context::{Capabilities, GeneratorContext};
use crate::generator::outlet::{Deliverable, DiskOutlet, Outlet};
use crate::generator::research::ResearchSynthesizer;
use crate::generator::research::memory::{JournalSummary, MemoryScope, ScopedKeys, ToolJournal};
use crate::generator::step_forward_agent::StepForwardAgent;
use crate::types::report::ResearchReport;

pub mod observer;

pub use observer::{ConsoleObserver, PipelineObserver, PipelineState, SilentObserver};

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<String, Instant>,
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let start_time = self.phase_start_times.remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations.push((phase_name.to_string(), duration));
        Some(duration)
    }

    pub fn get_total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 已结束的阶段，按结束顺序排列
    pub fn get_phase_durations(&self) -> &[(String, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.get_total_duration().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const RESEARCH: &'static str = "research";
    pub const ELABORATION: &'static str = "elaboration";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    ResearchFailed(String),
    #[error("{0}")]
    ElaborationFailed(String),
}

/// 经过校验的调研请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRequest {
    topic: String,
}

impl ResearchRequest {
    /// 需要推理引擎凭据（本地免密provider除外）与非空主题
    pub fn validate(topic: &str, config: &Config) -> Result<Self, PipelineError> {
        if !config.llm.has_credentials() {
            return Err(PipelineError::InvalidRequest(format!(
                "Please provide an API key for the {} provider.",
                config.llm.provider
            )));
        }
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "Please enter a research topic.".to_string(),
            ));
        }
        Ok(Self {
            topic: topic.to_string(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElaborationStatus {
    Enhanced,
    /// 润色失败，交付的是初始报告
    FellBack { reason: String },
}

/// 一次成功运行的产物
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub topic: String,
    pub initial_report: ResearchReport,
    pub final_report: ResearchReport,
    pub elaboration: ElaborationStatus,
    pub deliverable: Deliverable,
    /// 调研阶段的工具调用统计
    pub tool_usage: JournalSummary,
    pub timing_report: String,
}

/// 流水线控制器：Idle → Researching → Elaborating → Done，出错进入 Failed
pub struct PipelineController {
    config: Config,
    capabilities: Capabilities,
    observer: Arc<dyn PipelineObserver>,
    state: PipelineState,
}

impl PipelineController {
    pub fn new(config: Config, capabilities: Capabilities) -> Self {
        Self {
            config,
            capabilities,
            observer: Arc::new(SilentObserver),
            state: PipelineState::Idle,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, to: PipelineState) {
        let from = self.state;
        info!("🔄 流水线状态: {} → {}", from, to);
        self.state = to;
        self.observer.on_state_change(from, to);
    }

    fn fail(&mut self, error: PipelineError) -> PipelineError {
        error!("❌ 流水线失败: {}", error);
        self.transition(PipelineState::Failed);
        self.observer.on_failure(&error.to_string());
        error
    }

    /// 执行一次完整的调研；每次运行使用全新的内存与工具预算
    pub async fn run(&mut self, topic: &str) -> Result<PipelineOutcome, PipelineError> {
        self.state = PipelineState::Idle;

        let request = match ResearchRequest::validate(topic, &self.config) {
            Ok(request) => request,
            Err(e) => {
                warn!("⚠️ 请求被拒绝: {}", e);
                self.observer.on_failure(&e.to_string());
                return Err(e);
            }
        };
        let topic = request.topic();

        let context = GeneratorContext::with_capabilities(self.config.clone(), &self.capabilities);
        let mut timing = TimingScope::new();

        self.transition(PipelineState::Researching);
        timing.start_phase(TimingKeys::RESEARCH);
        let initial_report = match ResearchSynthesizer.execute(&context, topic).await {
            Ok(report) => report,
            Err(e) => return Err(self.fail(PipelineError::ResearchFailed(format!("{:#}", e)))),
        };
        timing.end_phase(TimingKeys::RESEARCH);
        let tool_usage = context.journal_summary().await;
        self.observer.on_initial_report(&initial_report);

        self.transition(PipelineState::Elaborating);
        timing.start_phase(TimingKeys::ELABORATION);
        let (final_report, elaboration) = match ReportElaborator.execute(&context, topic).await {
            Ok(enhanced) => (enhanced.into_report(), ElaborationStatus::Enhanced),
            Err(e) if self.config.pipeline.elaboration_fallback => {
                let reason = format!("{:#}", e);
                warn!("⚠️ 润色失败，交付初始报告: {}", reason);
                (initial_report.clone(), ElaborationStatus::FellBack { reason })
            }
            Err(e) => {
                return Err(self.fail(PipelineError::ElaborationFailed(format!("{:#}", e))));
            }
        };
        timing.end_phase(TimingKeys::ELABORATION);

        if let Err(e) = context
            .store_to_memory(MemoryScope::REPORTS, ScopedKeys::DELIVERED_REPORT, &final_report)
            .await
        {
            warn!("⚠️ 无法记录交付报告: {}", e);
        }

        let deliverable = Deliverable::report(topic, &final_report);
        self.transition(PipelineState::Done);
        self.observer
            .on_final_report(&final_report, &elaboration, &deliverable);

        Ok(PipelineOutcome {
            topic: topic.to_string(),
            initial_report,
            final_report,
            elaboration,
            deliverable,
            tool_usage,
            timing_report: timing.generate_timing_report(),
        })
    }
}

/// 命令行入口：运行流水线并把报告写入输出目录
pub async fn launch(config: &Config, topic: &str) -> Result<()> {
    ResearchRequest::validate(topic, config)?;

    let capabilities = Capabilities::from_config(config)?;

    // 启动时检查模型连接
    capabilities.engine.check_connection().await?;

    let mut controller = PipelineController::new(config.clone(), capabilities)
        .with_observer(Arc::new(ConsoleObserver));
    let outcome = controller.run(topic).await?;

    let outlet = DiskOutlet::new(&config.output_path);
    if config.pipeline.save_initial_report {
        outlet
            .save(&Deliverable::initial_report(&outcome.topic, &outcome.initial_report))
            .await?;
    }
    outlet.save(&outcome.deliverable).await?;

    if let ElaborationStatus::FellBack { reason } = &outcome.elaboration {
        println!("\n⚠️ 报告润色失败，已交付初始报告: {}", reason);
    }
    println!("\n{}", outcome.timing_report);

    Ok(())
}
