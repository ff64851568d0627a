//! Entity extraction (slot filling) for one turn or clause.
//!
//! Case-insensitive and tolerant of common synonyms: "guard duty" and
//! "GuardDuty" both yield `guardduty`, "Oregon" yields `us-west-2`.

use crate::core::string::normalize_phrase;
use crate::core::time_window::TimeWindow;
use crate::tool::is_region_code;
use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use std::sync::LazyLock;

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern).ok()
}

fn captures<'t>(re: &LazyLock<Option<Regex>>, text: &'t str) -> Option<Captures<'t>> {
    re.as_ref().and_then(|re| re.captures(text))
}

// Raw lowercased text (keeps hyphens and slashes)
static REGION_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\b([a-z]{2}(?:-gov)?-[a-z]+-\d)\b"));
static EXPLICIT_WINDOW: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"(\d{4}-\d{2}-\d{2})\s*(?:/|\s+to\s+|\s+through\s+|\s+until\s+|\s+and\s+)\s*(\d{4}-\d{2}-\d{2})")
});

// Normalised text
static RELATIVE_WINDOW: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"\b(?:last|past|previous|prior)\s+(\d+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\s+(day|week|month|quarter|year)s?\b")
});
static DAYS_SHORTHAND: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"\b(\d+)d\b"));
static NAMED_WINDOW: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"\b(last|previous|prior|past|this|current) (week|month|quarter|year)s?\b|\b(month|quarter|year) to date\b|\b(mtd|qtd|ytd|today|yesterday)\b")
});
static FORECAST_HORIZON: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"\bnext\s+(?:(\d+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\s+)?(month|quarter|year)s?\b")
});
static RISK_TOLERANCE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"\b(low|medium|moderate|high) risk(?: tolerance| appetite)?\b|\brisk (?:tolerance|appetite) (?:is |of )?(low|medium|moderate|high)\b|\b(conservative|aggressive)\b")
});
static SEVERITY: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\b(critical|high|medium|low)\b"));
static SAME_REGION: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\b(?:same|that|this|the) region\b"));

const SERVICE_SYNONYMS: &[(&str, &[&str])] = &[
    ("guardduty", &["guardduty", "guard duty"]),
    ("securityhub", &["securityhub", "security hub"]),
    ("inspector", &["inspector"]),
    ("config", &["aws config", "config rules"]),
    ("macie", &["macie"]),
    ("accessanalyzer", &["access analyzer", "accessanalyzer"]),
    ("cloudtrail", &["cloudtrail", "cloud trail"]),
    ("waf", &["waf", "web application firewall"]),
];

const REGION_NAMES: &[(&str, &str)] = &[
    ("northern virginia", "us-east-1"),
    ("n virginia", "us-east-1"),
    ("virginia", "us-east-1"),
    ("ohio", "us-east-2"),
    ("northern california", "us-west-1"),
    ("california", "us-west-1"),
    ("oregon", "us-west-2"),
    ("ireland", "eu-west-1"),
    ("london", "eu-west-2"),
    ("paris", "eu-west-3"),
    ("frankfurt", "eu-central-1"),
    ("stockholm", "eu-north-1"),
    ("tokyo", "ap-northeast-1"),
    ("seoul", "ap-northeast-2"),
    ("singapore", "ap-southeast-1"),
    ("sydney", "ap-southeast-2"),
    ("mumbai", "ap-south-1"),
    ("sao paulo", "sa-east-1"),
    ("canada", "ca-central-1"),
];

const SEVERITY_RANK: &[&str] = &["CRITICAL", "HIGH", "MEDIUM", "LOW"];

/// Longest relative period accepted from text; longer phrases bind nothing.
const MAX_PERIOD_MONTHS: u32 = 120;
const MAX_PERIOD_DAYS: u64 = 3660;

/// Entities extracted from text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slots {
    pub regions: Vec<String>,
    /// "same region" / "that region" without a concrete code
    pub same_region: bool,
    pub services: Vec<String>,
    pub severity: Option<String>,
    pub time_window: Option<TimeWindow>,
    pub forecast_months: Option<u32>,
    pub risk_tolerance: Option<String>,
    pub report_type: Option<String>,
    pub compliance_type: Option<String>,
    pub granularity: Option<String>,
}

impl Slots {
    /// Extract all slots from `text`, resolving relative dates against
    /// `reference`.
    pub fn extract(text: &str, reference: NaiveDate) -> Self {
        let lowered = text.to_lowercase();
        let normalized = normalize_phrase(text);

        let risk_tolerance = extract_risk_tolerance(&normalized);
        let severity_text = match RISK_TOLERANCE.as_ref() {
            Some(re) => re.replace_all(&normalized, " ").into_owned(),
            None => normalized.clone(),
        };

        Self {
            regions: extract_regions(&lowered, &normalized),
            same_region: captures(&SAME_REGION, &normalized).is_some(),
            services: extract_services(&normalized),
            severity: extract_severity(&severity_text),
            time_window: extract_time_window(&lowered, &normalized, reference),
            forecast_months: extract_forecast_months(&normalized),
            risk_tolerance,
            report_type: first_mapped(
                &normalized,
                &[
                    ("quarterly", "quarterly_review"),
                    ("detailed", "detailed_analysis"),
                    ("in depth", "detailed_analysis"),
                    ("deep dive", "detailed_analysis"),
                    ("executive", "executive_summary"),
                ],
            ),
            compliance_type: first_mapped(
                &normalized,
                &[
                    ("encrypt", "encryption"),
                    ("network", "network_security"),
                    ("access control", "access_control"),
                    ("iam", "access_control"),
                ],
            ),
            granularity: first_mapped(&normalized, &[("daily", "DAILY"), ("monthly", "MONTHLY")]),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Field-wise merge where values present in `self` win over `base`.
    pub fn overlay(&self, base: &Slots) -> Slots {
        fn pick<T: Clone>(own: &Option<T>, base: &Option<T>) -> Option<T> {
            own.clone().or_else(|| base.clone())
        }
        fn pick_list(own: &[String], base: &[String]) -> Vec<String> {
            if own.is_empty() { base.to_vec() } else { own.to_vec() }
        }

        Slots {
            regions: pick_list(&self.regions, &base.regions),
            same_region: self.same_region || base.same_region,
            services: pick_list(&self.services, &base.services),
            severity: pick(&self.severity, &base.severity),
            time_window: pick(&self.time_window, &base.time_window),
            forecast_months: pick(&self.forecast_months, &base.forecast_months),
            risk_tolerance: pick(&self.risk_tolerance, &base.risk_tolerance),
            report_type: pick(&self.report_type, &base.report_type),
            compliance_type: pick(&self.compliance_type, &base.compliance_type),
            granularity: pick(&self.granularity, &base.granularity),
        }
    }
}

fn word_number(s: &str) -> Option<u32> {
    const WORDS: [&str; 12] = [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
        "twelve",
    ];
    s.parse::<u32>().ok().or_else(|| {
        WORDS
            .iter()
            .position(|w| *w == s)
            .and_then(|i| u32::try_from(i + 1).ok())
    })
}

/// Position of `phrase` at a word start, if present.
fn word_position(text: &str, phrase: &str) -> Option<usize> {
    text.match_indices(phrase)
        .find(|(i, _)| {
            let starts = *i == 0 || text[..*i].ends_with(' ');
            let end = i + phrase.len();
            let ends = end == text.len() || text[end..].starts_with(' ');
            starts && ends
        })
        .map(|(i, _)| i)
}

fn first_mapped(text: &str, table: &[(&str, &str)]) -> Option<String> {
    table
        .iter()
        .filter_map(|(phrase, value)| {
            text.match_indices(phrase)
                .find(|(i, _)| *i == 0 || text[..*i].ends_with(' '))
                .map(|(i, _)| (i, *value))
        })
        .min_by_key(|(i, _)| *i)
        .map(|(_, value)| value.to_string())
}

fn extract_regions(lowered: &str, normalized: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    if let Some(re) = REGION_CODE.as_ref() {
        for caps in re.captures_iter(lowered) {
            if let Some(m) = caps.get(1)
                && is_region_code(m.as_str())
            {
                found.push((m.start(), m.as_str().to_string()));
            }
        }
    }
    // Names are located in normalised text; positions from the two texts
    // are only compared against each other for ordering.
    for (name, code) in REGION_NAMES {
        if let Some(pos) = word_position(normalized, name) {
            found.push((pos, code.to_string()));
        }
    }
    found.sort_by_key(|(pos, _)| *pos);

    let mut regions: Vec<String> = Vec::new();
    for (_, code) in found {
        if !regions.contains(&code) {
            regions.push(code);
        }
    }
    regions
}

fn extract_services(normalized: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = SERVICE_SYNONYMS
        .iter()
        .filter_map(|(canonical, synonyms)| {
            synonyms
                .iter()
                .filter_map(|s| word_position(normalized, s))
                .min()
                .map(|pos| (pos, *canonical))
        })
        .collect();
    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, s)| s.to_string()).collect()
}

/// Most severe level mentioned.
fn extract_severity(text: &str) -> Option<String> {
    let re = SEVERITY.as_ref()?;
    let mentioned: Vec<String> = re
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
        .collect();
    SEVERITY_RANK
        .iter()
        .find(|level| mentioned.iter().any(|m| m == *level))
        .map(|level| level.to_string())
}

fn extract_risk_tolerance(normalized: &str) -> Option<String> {
    let caps = captures(&RISK_TOLERANCE, normalized)?;
    let word = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str();
    let level = match word {
        "conservative" => "low",
        "aggressive" => "high",
        "moderate" => "medium",
        other => other,
    };
    Some(level.to_string())
}

fn extract_forecast_months(normalized: &str) -> Option<u32> {
    let caps = captures(&FORECAST_HORIZON, normalized)?;
    let count = caps.get(1).and_then(|m| word_number(m.as_str())).unwrap_or(1);
    let unit = match caps.get(2)?.as_str() {
        "quarter" => 3,
        "year" => 12,
        _ => 1,
    };
    count.checked_mul(unit).filter(|months| *months <= MAX_PERIOD_MONTHS)
}

fn last_days_capped(reference: NaiveDate, days: u64) -> Option<TimeWindow> {
    (days <= MAX_PERIOD_DAYS)
        .then(|| TimeWindow::last_days(reference, days))
        .flatten()
}

fn extract_time_window(lowered: &str, normalized: &str, reference: NaiveDate) -> Option<TimeWindow> {
    if let Some(caps) = captures(&EXPLICIT_WINDOW, lowered) {
        let start = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok();
        let end = NaiveDate::parse_from_str(caps.get(2)?.as_str(), "%Y-%m-%d").ok();
        if let (Some(start), Some(end)) = (start, end)
            && let Some(window) = TimeWindow::new(start, end)
        {
            return Some(window);
        }
    }

    if let Some(caps) = captures(&RELATIVE_WINDOW, normalized) {
        let n = word_number(caps.get(1)?.as_str())?;
        return match caps.get(2)?.as_str() {
            "day" => last_days_capped(reference, u64::from(n)),
            "week" => last_days_capped(reference, u64::from(n).checked_mul(7)?),
            unit => {
                let per = match unit {
                    "month" => 1,
                    "quarter" => 3,
                    _ => 12,
                };
                let months = n.checked_mul(per).filter(|m| *m <= MAX_PERIOD_MONTHS)?;
                TimeWindow::last_months(reference, months)
            }
        };
    }

    if let Some(caps) = captures(&DAYS_SHORTHAND, normalized) {
        let days = caps.get(1)?.as_str().parse::<u64>().ok()?;
        if days > 0 {
            return last_days_capped(reference, days);
        }
    }

    let caps = captures(&NAMED_WINDOW, normalized)?;
    if let (Some(qualifier), Some(unit)) = (caps.get(1), caps.get(2)) {
        let current = matches!(qualifier.as_str(), "this" | "current");
        let past = qualifier.as_str() == "past";
        return match (unit.as_str(), current, past) {
            ("week", true, _) => {
                TimeWindow::last_days(reference, u64::from(reference.weekday().num_days_from_monday()) + 1)
            }
            ("week", false, _) => TimeWindow::last_days(reference, 7),
            ("month", true, _) => TimeWindow::month_to_date(reference),
            ("month", false, true) => TimeWindow::last_months(reference, 1),
            ("month", false, false) => TimeWindow::previous_month(reference),
            ("quarter", true, _) => TimeWindow::quarter_to_date(reference),
            ("quarter", false, true) => TimeWindow::last_months(reference, 3),
            ("quarter", false, false) => TimeWindow::previous_quarter(reference),
            ("year", true, _) => TimeWindow::year_to_date(reference),
            _ => TimeWindow::last_months(reference, 12),
        };
    }
    if let Some(unit) = caps.get(3) {
        return match unit.as_str() {
            "month" => TimeWindow::month_to_date(reference),
            "quarter" => TimeWindow::quarter_to_date(reference),
            _ => TimeWindow::year_to_date(reference),
        };
    }
    match caps.get(4)?.as_str() {
        "mtd" => TimeWindow::month_to_date(reference),
        "qtd" => TimeWindow::quarter_to_date(reference),
        "ytd" => TimeWindow::year_to_date(reference),
        "today" => TimeWindow::last_days(reference, 1),
        _ => {
            let yesterday = reference.pred_opt()?;
            TimeWindow::last_days(yesterday, 1)
        }
    }
}
