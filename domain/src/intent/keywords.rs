//! Keyword tables for domain routing and tool selection.
//!
//! Matching is word-prefix based on normalised text: the keyword `cost`
//! matches "costs" and "costly", `vulnerab` matches "vulnerability".

use crate::tool::ToolDomain;

pub const SECURITY_KEYWORDS: &[&str] = &[
    "security",
    "compliance",
    "finding",
    "vulnerab",
    "guardduty",
    "inspector",
    "config",
    "threat",
    "risk",
    "breach",
    "attack",
    "malware",
    "incident",
];

pub const COST_KEYWORDS: &[&str] = &[
    "cost",
    "spend",
    "budget",
    "expense",
    "billing",
    "price",
    "forecast",
    "money",
    "dollar",
    "fee",
    "charge",
    "payment",
    "financial",
];

pub const ROI_KEYWORDS: &[&str] = &[
    "roi",
    "return",
    "investment",
    "benefit",
    "value",
    "optimi",
    "efficiency",
    "worth",
    "payback",
    "profit",
    "savings",
    "business case",
];

/// Requests for the whole picture: one step per domain.
pub const COMBINED_KEYWORDS: &[&str] = &[
    "comprehensive",
    "everything",
    "complete picture",
    "full picture",
    "big picture",
    "full overview",
    "complete overview",
    "all areas",
    "across the board",
];

/// Phrases that imply a domain when no keyword matched.
const COST_CONTEXT: &[&str] = &["how much", "what does it cost", "$"];
const ROI_CONTEXT: &[&str] = &["worth it", "return on", "pay off", "pays off"];

/// Tool-selection cues within a domain, checked in order.
pub struct ToolCue {
    pub domain: ToolDomain,
    pub tool: &'static str,
    pub cues: &'static [&'static str],
}

pub const TOOL_CUES: &[ToolCue] = &[
    ToolCue {
        domain: ToolDomain::Security,
        tool: "get_security_findings",
        cues: &["finding", "vulnerab", "issue", "alert", "threat"],
    },
    ToolCue {
        domain: ToolDomain::Security,
        tool: "check_compliance",
        cues: &["complian", "encrypt", "access control", "network security"],
    },
    ToolCue {
        domain: ToolDomain::Cost,
        tool: "forecast_costs",
        cues: &["forecast", "future", "predict", "next", "projection"],
    },
    ToolCue {
        domain: ToolDomain::Cost,
        tool: "analyze_cost_trends",
        cues: &["trend", "change", "increase", "decrease", "growth"],
    },
    ToolCue {
        domain: ToolDomain::Cost,
        tool: "get_security_service_costs",
        cues: &["per service", "by service", "each service", "daily"],
    },
    ToolCue {
        domain: ToolDomain::Roi,
        tool: "generate_roi_report",
        cues: &["report", "summary", "overview"],
    },
    ToolCue {
        domain: ToolDomain::Roi,
        tool: "optimize_security_spend",
        cues: &["optimi", "reduce", "cut"],
    },
    ToolCue {
        domain: ToolDomain::Roi,
        tool: "analyze_cost_benefit",
        cues: &["cost benefit", "benefit", "effective"],
    },
];

/// Tool used for a domain when no cue matches.
pub fn default_tool(domain: ToolDomain) -> &'static str {
    match domain {
        ToolDomain::Security => "check_security_services",
        ToolDomain::Cost => "get_cost_breakdown",
        ToolDomain::Roi => "calculate_security_roi",
    }
}

pub fn keywords(domain: ToolDomain) -> &'static [&'static str] {
    match domain {
        ToolDomain::Security => SECURITY_KEYWORDS,
        ToolDomain::Cost => COST_KEYWORDS,
        ToolDomain::Roi => ROI_KEYWORDS,
    }
}

/// Whether `cue` occurs at a word start in normalised `text`.
pub fn has_cue(text: &str, cue: &str) -> bool {
    if cue.starts_with(|c: char| !c.is_alphanumeric()) {
        return text.contains(cue);
    }
    text.match_indices(cue)
        .any(|(i, _)| i == 0 || text[..i].ends_with(' '))
}

/// Whether the text asks about every domain at once.
///
/// A bare "overview" or "summary" with no domain keyword counts too; with a
/// domain keyword it stays a cue for that domain's report tool.
pub fn is_combined(text: &str) -> bool {
    if COMBINED_KEYWORDS.iter().any(|k| has_cue(text, k)) {
        return true;
    }
    ["overview", "summary"].iter().any(|k| has_cue(text, k))
        && ToolDomain::ALL.iter().all(|d| score(*d, text) == 0)
}

pub fn score(domain: ToolDomain, text: &str) -> usize {
    keywords(domain).iter().filter(|k| has_cue(text, k)).count()
}

/// Best-scoring domain for a clause.
///
/// Ties prefer cost, then ROI, then security: business questions that
/// mention "security" usually ask about spend or return.
pub fn classify(text: &str) -> Option<ToolDomain> {
    let ranked = [ToolDomain::Cost, ToolDomain::Roi, ToolDomain::Security];
    let best = ranked
        .iter()
        .map(|d| (*d, score(*d, text)))
        .fold(None::<(ToolDomain, usize)>, |best, (d, s)| match best {
            Some((_, top)) if top >= s => best,
            _ if s > 0 => Some((d, s)),
            _ => best,
        });
    if let Some((domain, _)) = best {
        return Some(domain);
    }
    if COST_CONTEXT.iter().any(|p| has_cue(text, p)) {
        Some(ToolDomain::Cost)
    } else if ROI_CONTEXT.iter().any(|p| has_cue(text, p)) {
        Some(ToolDomain::Roi)
    } else {
        None
    }
}

/// Tool for `domain` selected by the first matching cue.
pub fn select_tool(domain: ToolDomain, text: &str) -> &'static str {
    TOOL_CUES
        .iter()
        .filter(|c| c.domain == domain)
        .find(|c| c.cues.iter().any(|cue| has_cue(text, cue)))
        .map(|c| c.tool)
        .unwrap_or_else(|| default_tool(domain))
}
