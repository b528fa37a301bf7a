use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::report::ResearchReport;

pub const MARKDOWN_MIME: &str = "text/markdown";

/// 可下载的报告文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deliverable {
    pub file_name: String,
    pub mime_type: &'static str,
    pub content: String,
}

impl Deliverable {
    /// 最终报告
    pub fn report(topic: &str, report: &ResearchReport) -> Self {
        Self {
            file_name: report_file_name(topic),
            mime_type: MARKDOWN_MIME,
            content: report.markdown().to_string(),
        }
    }

    /// 初始报告，文件名带 `_initial` 后缀
    pub fn initial_report(topic: &str, report: &ResearchReport) -> Self {
        Self {
            file_name: format!("{}_initial_report.md", file_stem(topic)),
            mime_type: MARKDOWN_MIME,
            content: report.markdown().to_string(),
        }
    }
}

/// `<主题，空格替换为下划线>_report.md`
pub fn report_file_name(topic: &str) -> String {
    format!("{}_report.md", file_stem(topic))
}

fn file_stem(topic: &str) -> String {
    // 路径分隔符也替换掉，保证文件落在输出目录内
    topic
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

pub trait Outlet {
    async fn save(&self, deliverable: &Deliverable) -> Result<PathBuf>;
}

pub struct DiskOutlet {
    output_dir: PathBuf,
}

impl DiskOutlet {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Outlet for DiskOutlet {
    async fn save(&self, deliverable: &Deliverable) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let output_file_path = self.output_dir.join(&deliverable.file_name);
        fs::write(&output_file_path, &deliverable.content)?;

        info!("💾 已保存报告: {}", output_file_path.display());
        Ok(output_file_path)
    }
}
