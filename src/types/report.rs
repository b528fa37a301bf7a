//! 调研报告文档模型

use markdown::mdast::Node;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static CITATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]\n]+)\]\((https?://[^\s)]+)\)").expect("citation pattern is valid")
});

/// 标题（markdown heading）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub depth: u8,
    pub text: String,
    /// 从1开始的行号
    pub line: usize,
}

/// 按调研角度划分的章节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

impl Section {
    pub fn citations(&self) -> Vec<Citation> {
        parse_citations(&self.body)
    }
}

/// 行内引用 `[Source Title](URL)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

/// 调研报告
///
/// 不可变文档，每个阶段都产出新的报告而不是修改输入。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchReport {
    markdown: String,
}

impl ResearchReport {
    pub fn new(markdown: impl Into<String>) -> Self {
        let markdown = markdown.into();
        Self {
            markdown: markdown.trim().to_string(),
        }
    }

    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    pub fn into_markdown(self) -> String {
        self.markdown
    }

    pub fn is_empty(&self) -> bool {
        self.markdown.is_empty()
    }

    /// 文档中的全部标题（仅顶层块）
    pub fn headings(&self) -> Vec<Heading> {
        let Ok(Node::Root(root)) = markdown::to_mdast(&self.markdown, &markdown::ParseOptions::gfm())
        else {
            return Vec::new();
        };

        root.children
            .iter()
            .filter_map(|node| match node {
                Node::Heading(heading) => Some(Heading {
                    depth: heading.depth,
                    text: node.to_string().trim().to_string(),
                    line: heading.position.as_ref().map(|p| p.start.line).unwrap_or(0),
                }),
                _ => None,
            })
            .collect()
    }

    /// 报告标题：位于所有其他标题之前的一级标题
    pub fn title(&self) -> Option<String> {
        self.title_heading().map(|h| h.text)
    }

    fn title_heading(&self) -> Option<Heading> {
        self.headings().into_iter().next().filter(|h| h.depth == 1)
    }

    /// 除标题以外的全部标题，构成报告的章节骨架
    pub fn skeleton(&self) -> Vec<Heading> {
        let mut headings = self.headings();
        if headings.first().is_some_and(|h| h.depth == 1) {
            headings.remove(0);
        }
        headings
    }

    /// 以标题下最浅层级的标题切分出的章节
    pub fn sections(&self) -> Vec<Section> {
        let skeleton = self.skeleton();
        let Some(section_depth) = skeleton.iter().map(|h| h.depth).min() else {
            return Vec::new();
        };
        let lines: Vec<&str> = self.markdown.lines().collect();

        let anchors: Vec<&Heading> = skeleton
            .iter()
            .filter(|h| h.depth == section_depth)
            .collect();

        anchors
            .iter()
            .enumerate()
            .map(|(index, heading)| {
                let start = heading.line.min(lines.len());
                let end = anchors
                    .get(index + 1)
                    .map(|next| next.line.saturating_sub(1))
                    .unwrap_or(lines.len())
                    .max(start);
                Section {
                    heading: heading.text.clone(),
                    body: lines[start..end].join("\n").trim().to_string(),
                }
            })
            .collect()
    }

    pub fn citations(&self) -> Vec<Citation> {
        parse_citations(&self.markdown)
    }
}

impl std::fmt::Display for ResearchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.markdown)
    }
}

/// 文本中的行内引用
pub fn parse_citations(text: &str) -> Vec<Citation> {
    CITATION_PATTERN
        .captures_iter(text)
        .map(|caps| Citation {
            title: caps[1].trim().to_string(),
            url: caps[2].to_string(),
        })
        .collect()
}

/// 经过润色且通过内容约束校验的报告
///
/// 只能由报告守卫构造：标题与章节骨架与原始报告一致，且不含元评论。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedReport {
    report: ResearchReport,
}

impl EnhancedReport {
    pub(crate) fn new(report: ResearchReport) -> Self {
        Self { report }
    }

    pub fn report(&self) -> &ResearchReport {
        &self.report
    }

    pub fn markdown(&self) -> &str {
        self.report.markdown()
    }

    pub fn into_report(self) -> ResearchReport {
        self.report
    }
}
