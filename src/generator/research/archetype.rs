//! 调研请求类型与对应的调研角度模板

use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Product,
    Market,
    Concept,
    CurrentEvent,
    Process,
    PersonOrOrganization,
    Other,
}

impl Archetype {
    pub const ALL: [Archetype; 7] = [
        Archetype::Product,
        Archetype::Market,
        Archetype::Concept,
        Archetype::CurrentEvent,
        Archetype::Process,
        Archetype::PersonOrOrganization,
        Archetype::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Archetype::Product => "PRODUCTS/SHOPPING",
            Archetype::Market => "MARKETS/INDUSTRIES",
            Archetype::Concept => "CONCEPTS/TOPICS",
            Archetype::CurrentEvent => "CURRENT EVENTS",
            Archetype::Process => "PROCESSES/HOW-TO",
            Archetype::PersonOrOrganization => "PEOPLE/ORGANIZATIONS",
            Archetype::Other => "ANYTHING ELSE",
        }
    }

    /// 识别该类型时提的问题
    pub fn question(&self) -> &'static str {
        match self {
            Archetype::Product => "Is it about a product/service (shopping, comparison, reviews)?",
            Archetype::Market => "Is it about a market/industry (business, technology, trends)?",
            Archetype::Concept => {
                "Is it about a concept/topic (academic, educational, explanatory)?"
            }
            Archetype::CurrentEvent => {
                "Is it about current events (news, developments, updates)?"
            }
            Archetype::Process => {
                "Is it about a process/how-to (instructions, guides, best practices)?"
            }
            Archetype::PersonOrOrganization => {
                "Is it about a person/organization (biography, background, achievements)?"
            }
            Archetype::Other => "Or something else entirely?",
        }
    }

    /// 候选调研角度
    pub fn angles(&self) -> &'static [&'static str] {
        match self {
            Archetype::Product => &[
                "features",
                "pricing",
                "reviews",
                "alternatives",
                "pros/cons",
                "best use cases",
            ],
            Archetype::Market => &[
                "size/trends",
                "key players",
                "technologies",
                "challenges",
                "opportunities",
                "future outlook",
            ],
            Archetype::Concept => &[
                "definition/overview",
                "key aspects",
                "applications",
                "debates",
                "recent developments",
                "implications",
            ],
            Archetype::CurrentEvent => &[
                "background",
                "key facts",
                "different perspectives",
                "impact",
                "timeline",
                "future implications",
            ],
            Archetype::Process => &[
                "overview",
                "step-by-step methods",
                "tools/requirements",
                "best practices",
                "common mistakes",
                "tips",
            ],
            Archetype::PersonOrOrganization => &[
                "background",
                "achievements",
                "current activities",
                "impact",
                "controversies",
                "future plans",
            ],
            Archetype::Other => &[
                "overview",
                "key facts",
                "perspectives",
                "practical implications",
                "recent developments",
                "outlook",
            ],
        }
    }

    /// 该类型报告适合的语气
    pub fn tone(&self) -> &'static str {
        match self {
            Archetype::Product => "practical and comparative",
            Archetype::Market => "analytical",
            Archetype::Concept => "informative",
            Archetype::CurrentEvent => "balanced and factual",
            Archetype::Process => "practical",
            Archetype::PersonOrOrganization => "objective",
            Archetype::Other => "clear and informative",
        }
    }
}

/// 渲染请求分类与角度选择部分的指令
pub fn render_classification_guide(min_angles: usize, max_angles: usize) -> String {
    let mut guide = String::from(
        "1. ANALYZE THE REQUEST: First understand the nature of the research request:\n",
    );
    for archetype in Archetype::ALL {
        let _ = writeln!(guide, "   - {}", archetype.question());
    }

    let _ = writeln!(
        guide,
        "\n2. DETERMINE RESEARCH ANGLES: Based on the request type, break it into {}-{} relevant angles:\n",
        min_angles, max_angles
    );
    for archetype in Archetype::ALL {
        let _ = writeln!(
            guide,
            "   For {}: {} (tone: {})",
            archetype.label(),
            archetype.angles().join(", "),
            archetype.tone()
        );
    }
    guide
}
