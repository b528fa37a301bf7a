//! 报告守卫
//!
//! 润色后的报告必须保留原标题与章节骨架，且不能以元评论收尾。模型输出先经过这里再交付。

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

use crate::types::report::{EnhancedReport, Heading, ResearchReport, parse_citations};

static TITLE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(enhanced|elaborated|improved|expanded|revised)\s+(research\s+)?report\s*[:\-]\s*")
        .expect("title prefix pattern is valid")
});

static BANNED_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(recommended\s+)?(next\s+steps?|further\s+(steps|assistance|questions)|feedback(\s+request)?|questions\s+for\s+you|how\s+(can|may)\s+i\s+help(\s+further)?|additional\s+assistance|closing\s+remarks?)\s*:?\s*$",
    )
    .expect("banned section pattern is valid")
});

static BANNED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(let me know|feel free to (ask|reach out|contact)|if you need (more|any|further)|would you like me to|i hope this|as an ai\b|as a language model|data collection phase|please provide (your )?feedback|if there are (any )?specific aspects|do not hesitate to|this report (was|has been) (generated|compiled|produced) by|my research process|conclusion\W.*\b((research|writing|data collection) process|i (have )?(researched|compiled|collected|gathered)))",
    )
    .expect("banned line pattern is valid")
});

static HORIZONTAL_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([-*_]\s*){3,}$").expect("horizontal rule pattern is valid")
});

static SETEXT_UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(=+|-+)\s*$").expect("setext pattern is valid"));

static HEADING_NUMBERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*\.?\s+").expect("numbering pattern is valid"));

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?](\s+|$)").expect("sentence pattern is valid"));

/// 短于此长度的句子不参与原文匹配
const MIN_SENTENCE_CHARS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElaborationViolation {
    #[error("elaborated report is empty")]
    Empty,
    #[error("elaborated report dropped or reordered section \"{missing}\"")]
    SkeletonBroken { missing: String },
}

/// 校验并清理润色结果
pub fn enforce(
    original: &ResearchReport,
    candidate: &str,
) -> Result<EnhancedReport, ElaborationViolation> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Err(ElaborationViolation::Empty);
    }

    let mut lines: Vec<String> = candidate.lines().map(str::to_string).collect();
    let before = lines.len();

    restore_title(original, &mut lines);
    let lines = drop_banned_sections(original, lines);
    let lines = drop_banned_lines(original, lines);
    let lines = trim_trailing(original, lines);
    debug!(before, after = lines.len(), "report guard applied");

    let report = ResearchReport::new(lines.join("\n"));
    if report.is_empty() {
        return Err(ElaborationViolation::Empty);
    }
    verify_skeleton(original, &report)?;

    Ok(EnhancedReport::new(report))
}

/// 报告中出现的元评论：被禁止的章节标题与短语
pub fn find_banned_phrases(markdown: &str) -> Vec<String> {
    let report = ResearchReport::new(markdown);
    let mut found: Vec<String> = report
        .headings()
        .into_iter()
        .filter(|h| BANNED_SECTION.is_match(&h.text))
        .map(|h| h.text)
        .collect();
    found.extend(BANNED_LINE.find_iter(markdown).map(|m| m.as_str().to_string()));
    found
}

fn normalize_heading(text: &str) -> String {
    let text = text.trim().trim_end_matches(':').trim();
    let text = HEADING_NUMBERING.replace(text, "");
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 解析标题，行号对应 `lines` 的下标+1
fn headings_of(lines: &[String]) -> Vec<Heading> {
    let offset = lines.iter().take_while(|l| l.trim().is_empty()).count();
    ResearchReport::new(lines.join("\n"))
        .headings()
        .into_iter()
        .map(|mut h| {
            h.line += offset;
            h
        })
        .collect()
}

fn replace_heading(lines: &mut Vec<String>, heading: &Heading, replacement: String) {
    let Some(index) = heading.line.checked_sub(1).filter(|i| *i < lines.len()) else {
        return;
    };
    let setext = !lines[index].trim_start().starts_with('#');
    lines[index] = replacement;
    if setext && lines.get(index + 1).is_some_and(|l| SETEXT_UNDERLINE.is_match(l)) {
        lines.remove(index + 1);
    }
}

fn restore_title(original: &ResearchReport, lines: &mut Vec<String>) {
    let first = headings_of(lines).into_iter().next();
    match (original.title(), first) {
        (Some(title), Some(heading)) if heading.depth == 1 => {
            if heading.text != title {
                debug!(from = %heading.text, to = %title, "restoring report title");
            }
            replace_heading(lines, &heading, format!("# {}", title));
        }
        (Some(title), _) => {
            lines.insert(0, String::new());
            lines.insert(0, format!("# {}", title));
        }
        (None, Some(heading)) if heading.depth == 1 => {
            let stripped = TITLE_PREFIX.replace(&heading.text, "").trim().to_string();
            if stripped != heading.text && !stripped.is_empty() {
                replace_heading(lines, &heading, format!("# {}", stripped));
            }
        }
        _ => {}
    }
}

fn drop_banned_sections(original: &ResearchReport, lines: Vec<String>) -> Vec<String> {
    let kept: HashSet<String> = original
        .headings()
        .iter()
        .map(|h| normalize_heading(&h.text))
        .collect();
    let headings = headings_of(&lines);
    let mut dropped = vec![false; lines.len()];

    for (index, heading) in headings.iter().enumerate() {
        if !BANNED_SECTION.is_match(&heading.text) || kept.contains(&normalize_heading(&heading.text))
        {
            continue;
        }
        let start = heading.line.saturating_sub(1).min(lines.len());
        let end = headings[index + 1..]
            .iter()
            .find(|next| next.depth <= heading.depth)
            .map(|next| next.line.saturating_sub(1))
            .unwrap_or(lines.len())
            .clamp(start, lines.len());
        debug!(section = %heading.text, "dropping meta-commentary section");
        dropped[start..end].iter_mut().for_each(|flag| *flag = true);
    }

    lines
        .into_iter()
        .zip(dropped)
        .filter_map(|(line, drop)| (!drop).then_some(line))
        .collect()
}

/// 原报告正文中的句子
fn original_sentences(original: &ResearchReport) -> Vec<String> {
    original
        .markdown()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| SENTENCE_BREAK.split(line))
        .map(str::trim)
        .filter(|sentence| sentence.len() >= MIN_SENTENCE_CHARS)
        .map(str::to_string)
        .collect()
}

/// 纯元评论行：命中禁用短语，且不带引用、不含原报告的句子
fn is_meta_line(line: &str, original: &ResearchReport, sentences: &[String]) -> bool {
    !line.is_empty()
        && BANNED_LINE.is_match(line)
        && parse_citations(line).is_empty()
        && !original.markdown().contains(line)
        && !sentences.iter().any(|sentence| line.contains(sentence.as_str()))
}

fn drop_banned_lines(original: &ResearchReport, lines: Vec<String>) -> Vec<String> {
    let sentences = original_sentences(original);
    let mut in_fence = false;
    let mut dropped: Vec<bool> = lines
        .iter()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                return false;
            }
            !in_fence && is_meta_line(trimmed, original, &sentences)
        })
        .collect();

    keep_sections_populated(&lines, &mut dropped);

    lines
        .into_iter()
        .zip(dropped)
        .filter_map(|(line, drop)| (!drop).then_some(line))
        .collect()
}

/// 章节不能只剩标题：正文全部命中时保留原样
fn keep_sections_populated(lines: &[String], dropped: &mut [bool]) {
    let headings = headings_of(lines);
    for (index, heading) in headings.iter().enumerate() {
        let next = headings.get(index + 1);
        let heading_dropped = heading
            .line
            .checked_sub(1)
            .and_then(|i| dropped.get(i))
            .copied()
            .unwrap_or(false);
        if heading_dropped || next.is_some_and(|n| n.depth > heading.depth) {
            continue;
        }
        let start = heading.line.min(lines.len());
        let end = next
            .map(|n| n.line.saturating_sub(1))
            .unwrap_or(lines.len())
            .clamp(start, lines.len());
        let body: Vec<usize> = (start..end)
            .filter(|i| !lines[*i].trim().is_empty())
            .collect();
        if !body.is_empty() && body.iter().all(|i| dropped[*i]) {
            debug!(section = %heading.text, "keeping the only content of a section");
            body.iter().for_each(|i| dropped[*i] = false);
        }
    }
}

fn trim_trailing(original: &ResearchReport, mut lines: Vec<String>) -> Vec<String> {
    let kept: HashSet<String> = original
        .headings()
        .iter()
        .map(|h| normalize_heading(&h.text))
        .collect();

    while lines.len() > 1 {
        let last = lines[lines.len() - 1].trim();
        let previous_blank = lines[lines.len() - 2].trim().is_empty();
        let removable = last.is_empty()
            || (HORIZONTAL_RULE.is_match(last) && previous_blank)
            || (last.starts_with('#')
                && !kept.contains(&normalize_heading(last.trim_start_matches('#'))));
        if !removable {
            break;
        }
        lines.pop();
    }
    lines
}

fn verify_skeleton(
    original: &ResearchReport,
    enhanced: &ResearchReport,
) -> Result<(), ElaborationViolation> {
    let produced: Vec<String> = enhanced
        .skeleton()
        .iter()
        .map(|h| normalize_heading(&h.text))
        .collect();
    let mut cursor = produced.iter();

    for heading in original.skeleton() {
        let wanted = normalize_heading(&heading.text);
        if !cursor.any(|p| *p == wanted) {
            return Err(ElaborationViolation::SkeletonBroken {
                missing: heading.text,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn original() -> ResearchReport {
        ResearchReport::new(
            "# Electric Bicycles\n\n## Features\n\nTorque sensors [A](https://a.example).\n\n## Pricing\n\nFrom $999 [B](https://b.example).\n",
        )
    }

    #[test]
    fn test_clean_elaboration_passes_through() {
        let candidate = "# Electric Bicycles\n\n## Features\n\nMore detail.\n\n### Case study\n\nA city fleet.\n\n## Pricing\n\nPrices fell in 2024.";
        let enhanced = enforce(&original(), candidate).unwrap();
        assert_eq!(enhanced.markdown(), candidate);
    }

    #[test]
    fn test_prefixed_title_is_restored() {
        let candidate = "# Enhanced Research Report: Electric Bicycles\n\n## Features\n\nx\n\n## Pricing\n\ny";
        let enhanced = enforce(&original(), candidate).unwrap();
        assert_eq!(enhanced.report().title().as_deref(), Some("Electric Bicycles"));
        assert!(!enhanced.markdown().contains("Enhanced"));
    }

    #[test]
    fn test_changed_or_missing_title_is_restored() {
        let changed = "# E-Bikes Explained\n\n## Features\n\nx\n\n## Pricing\n\ny";
        let enhanced = enforce(&original(), changed).unwrap();
        assert!(enhanced.markdown().starts_with("# Electric Bicycles\n"));

        let missing = "## Features\n\nx\n\n## Pricing\n\ny";
        let enhanced = enforce(&original(), missing).unwrap();
        assert!(enhanced.markdown().starts_with("# Electric Bicycles\n\n## Features"));
    }

    #[test]
    fn test_setext_title_is_replaced() {
        let candidate = "Enhanced Report: Electric Bicycles\n===\n\n## Features\n\nx\n\n## Pricing\n\ny";
        let enhanced = enforce(&original(), candidate).unwrap();
        assert!(enhanced.markdown().starts_with("# Electric Bicycles\n\n## Features"));
    }

    #[test]
    fn test_meta_commentary_is_removed() {
        let candidate = "# Electric Bicycles\n\n## Features\n\nx\n\n## Pricing\n\ny\n\nI hope this report is useful.\n\n## Next Steps\n\n- Gather more data\n- Let me know if you need more\n\n---\n\nFeel free to ask follow-up questions.";
        let enhanced = enforce(&original(), candidate).unwrap();
        assert!(enhanced.markdown().ends_with("y"), "{}", enhanced.markdown());
        assert!(find_banned_phrases(enhanced.markdown()).is_empty());
    }

    #[test]
    fn test_process_conclusion_is_removed() {
        let candidate = "# Electric Bicycles\n\n## Features\n\nx\n\n## Pricing\n\ny\n\n**Conclusion:** Throughout the research process I gathered many sources.";
        let enhanced = enforce(&original(), candidate).unwrap();
        assert!(enhanced.markdown().ends_with("y"));
        assert!(!find_banned_phrases(candidate).is_empty());
    }

    #[test]
    fn test_cited_and_original_claims_survive_banned_phrases() {
        let original = ResearchReport::new(
            "# E-Bikes\n\n## Range\n\nDealers: feel free to ask for a test ride [D](https://d.example).\n",
        );
        let candidate = "# E-Bikes\n\n## Range\n\nDealers: feel free to ask for a test ride [D](https://d.example) (2024).\n\nIf you need more range, a 48V battery adds 30% [G](https://g.example).\n\nLet me know if you want a deeper comparison.";
        let enhanced = enforce(&original, candidate).unwrap();
        let markdown = enhanced.markdown();
        assert!(markdown.contains("test ride [D](https://d.example) (2024)."), "{}", markdown);
        assert!(markdown.ends_with("a 48V battery adds 30% [G](https://g.example)."), "{}", markdown);
        assert!(!markdown.contains("deeper comparison"));
    }

    #[test]
    fn test_lightly_edited_original_sentence_is_kept() {
        let original = ResearchReport::new(
            "# E-Bikes\n\n## Dealers\n\nShops say feel free to ask about trade-in offers. Most honour them.\n",
        );
        let candidate = "# E-Bikes\n\n## Dealers\n\nShops say feel free to ask about trade-in offers, often in writing. Most honour them.\n\nFeel free to ask me for more.";
        let enhanced = enforce(&original, candidate).unwrap();
        assert!(enhanced.markdown().ends_with("Most honour them."), "{}", enhanced.markdown());
    }

    #[test]
    fn test_section_is_never_left_bare() {
        let candidate = "# Electric Bicycles\n\n## Features\n\nIf you need more torque, pick a mid-drive.\n\n## Pricing\n\ny";
        let enhanced = enforce(&original(), candidate).unwrap();
        assert!(enhanced.markdown().contains("## Features\n\nIf you need more torque"));
    }

    #[test]
    fn test_content_present_in_original_is_kept() {
        let original = ResearchReport::new(
            "# Support\n\n## Feedback\n\nUsers say: let me know when it ships.\n",
        );
        let candidate = "# Support\n\n## Feedback\n\nUsers say: let me know when it ships.\n\nMore quotes.";
        let enhanced = enforce(&original, candidate).unwrap();
        assert!(enhanced.markdown().contains("## Feedback"));
        assert!(enhanced.markdown().contains("let me know when it ships"));
    }

    #[test]
    fn test_fenced_code_is_untouched() {
        let candidate = "# Electric Bicycles\n\n## Features\n\n```\nlet me know\n```\n\n## Pricing\n\ny";
        let enhanced = enforce(&original(), candidate).unwrap();
        assert!(enhanced.markdown().contains("```\nlet me know\n```"));
    }

    #[test]
    fn test_dropped_section_is_a_violation() {
        let candidate = "# Electric Bicycles\n\n## Features\n\nx";
        assert_eq!(
            enforce(&original(), candidate).unwrap_err(),
            ElaborationViolation::SkeletonBroken {
                missing: "Pricing".into()
            }
        );
    }

    #[test]
    fn test_reordered_sections_are_a_violation() {
        let candidate = "# Electric Bicycles\n\n## Pricing\n\ny\n\n## Features\n\nx";
        assert!(matches!(
            enforce(&original(), candidate),
            Err(ElaborationViolation::SkeletonBroken { .. })
        ));
    }

    #[test]
    fn test_heading_numbering_and_case_are_tolerated() {
        let candidate = "# Electric Bicycles\n\n## 1. features\n\nx\n\n## 2. Pricing:\n\ny";
        assert!(enforce(&original(), candidate).is_ok());
    }

    #[test]
    fn test_empty_candidate() {
        assert_eq!(
            enforce(&original(), "  \n ").unwrap_err(),
            ElaborationViolation::Empty
        );
    }

    #[test]
    fn test_untitled_original_only_strips_prefix() {
        let original = ResearchReport::new("## Overview\n\ntext");
        let enhanced = enforce(&original, "# Enhanced Report: Tea\n\n## Overview\n\nmore").unwrap();
        assert_eq!(enhanced.report().title().as_deref(), Some("Tea"));
    }
}
