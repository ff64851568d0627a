//! Query Interpreter: one turn of text → [`CallPlan`].

use super::keywords::{classify, default_tool, is_combined, select_tool};
use super::slots::Slots;
use crate::plan::{ArgValue, CallPlan, CallPlanStep, StepId};
use crate::session::SessionContext;
use crate::tool::{ToolDescriptor, ToolDomain, ToolRegistry};
use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};

/// Clause boundaries. `dep` marks "A based on B" style links.
static CLAUSE_BOUNDARY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?P<dep>\bbased on\b|\busing\b|\bgiven\b|\bin light of\b)|(?P<sep>[,;]|\.\s|\band\b|\balso\b|\bplus\b|\bthen\b|\bas well as\b)",
    )
    .ok()
});

/// Turns text plus conversation state into a call plan.
///
/// Implementations must not fail: anything they cannot map to a tool yields
/// an empty plan tagged `Unrecognized`, and entities they cannot resolve are
/// left as placeholders for the parameter resolver.
pub trait QueryInterpreter: Send + Sync {
    fn interpret(&self, turn: &str, context: &SessionContext) -> CallPlan;
}

#[derive(Debug, Clone)]
struct ClauseGroup {
    text: String,
    domain: Option<ToolDomain>,
    /// Text after this group feeds this group ("X based on Y")
    depends_on_next: bool,
}

/// Rule-based slot filler built on keyword tables.
#[derive(Debug, Clone)]
pub struct KeywordInterpreter {
    registry: Arc<ToolRegistry>,
    reference_date: Option<NaiveDate>,
}

impl KeywordInterpreter {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            reference_date: None,
        }
    }

    /// Resolve relative dates against a fixed day instead of today (UTC).
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    fn split_clauses(text: &str) -> Vec<ClauseGroup> {
        let lowered = text.to_lowercase();
        let mut raw: Vec<(String, bool)> = Vec::new();
        let mut last = 0;
        if let Some(re) = CLAUSE_BOUNDARY.as_ref() {
            for caps in re.captures_iter(&lowered) {
                let Some(m) = caps.get(0) else { continue };
                raw.push((lowered[last..m.start()].to_string(), caps.name("dep").is_some()));
                last = m.end();
            }
        }
        raw.push((lowered[last..].to_string(), false));

        let mut groups: Vec<ClauseGroup> = Vec::new();
        for (text, depends_on_next) in raw {
            if text.trim().is_empty() {
                if depends_on_next && let Some(last) = groups.last_mut() {
                    last.depends_on_next = true;
                }
                continue;
            }
            let domain = classify(&crate::core::string::normalize_phrase(&text));
            match (domain, groups.last_mut()) {
                // Entity-only clause: belongs to the preceding intent
                (None, Some(last)) => {
                    last.text.push(' ');
                    last.text.push_str(&text);
                    last.depends_on_next |= depends_on_next;
                }
                // First intent after leading entity-only text
                (Some(domain), Some(last)) if last.domain.is_none() => {
                    last.text.push(' ');
                    last.text.push_str(&text);
                    last.domain = Some(domain);
                    last.depends_on_next = depends_on_next;
                }
                (domain, _) => groups.push(ClauseGroup {
                    text,
                    domain,
                    depends_on_next,
                }),
            }
        }
        groups
    }

    fn descriptor_for(&self, domain: ToolDomain, text: &str) -> Option<&ToolDescriptor> {
        let normalized = crate::core::string::normalize_phrase(text);
        self.registry
            .lookup(select_tool(domain, &normalized))
            .ok()
            .or_else(|| self.registry.primary_tool(domain))
    }

    /// One independent step per domain, all sharing the turn's entities.
    fn plan_combined(&self, slots: &Slots) -> Option<CallPlan> {
        let mut plan = CallPlan::new();
        for domain in ToolDomain::ALL {
            let Some(descriptor) = self
                .registry
                .lookup(default_tool(domain))
                .ok()
                .or_else(|| self.registry.primary_tool(domain))
            else {
                continue;
            };
            plan.push(|step| bind_slots(step, descriptor, slots), &descriptor.name);
        }
        (!plan.is_empty()).then_some(plan)
    }

    /// Build a plan from recognised intents; `None` if there are none.
    fn plan_intents(&self, turn: &str, reference: NaiveDate) -> Option<CallPlan> {
        let turn_slots = Slots::extract(turn, reference);
        if is_combined(&crate::core::string::normalize_phrase(turn)) {
            return self.plan_combined(&turn_slots);
        }
        let groups = Self::split_clauses(turn);

        let mut plan = CallPlan::new();
        // (group index, step id, tool)
        let mut placed: Vec<(usize, StepId, &ToolDescriptor)> = Vec::new();

        for (index, group) in groups.iter().enumerate() {
            let Some(domain) = group.domain else { continue };
            let Some(descriptor) = self.descriptor_for(domain, &group.text) else {
                continue;
            };
            if placed.iter().any(|(_, _, d)| d.name == descriptor.name) {
                continue;
            }
            let slots = Slots::extract(&group.text, reference).overlay(&turn_slots);
            let id = plan.push(|step| bind_slots(step, descriptor, &slots), &descriptor.name);
            placed.push((index, id, descriptor));
        }

        if plan.is_empty() {
            return None;
        }

        for (position, (group_index, dependent_id, dependent)) in placed.iter().enumerate() {
            if !groups[*group_index].depends_on_next {
                continue;
            }
            // "X based on Y" links forward; a trailing "... based on them"
            // refers back to the preceding intent.
            let upstream = placed
                .get(position + 1)
                .or_else(|| position.checked_sub(1).and_then(|p| placed.get(p)));
            let Some((_, upstream_id, upstream)) = upstream else {
                continue;
            };
            let reverse_edge = plan
                .step(*upstream_id)
                .is_some_and(|s| s.depends_on.contains(dependent_id));
            if reverse_edge {
                continue;
            }
            if let Some(step) = plan.steps.iter_mut().find(|s| s.id == *dependent_id) {
                link_steps(step, dependent, upstream, *upstream_id);
            }
        }

        Some(plan)
    }

    /// Re-run the most recent non-empty plan with new entities
    /// ("what about last month?", or an answer to a clarification).
    fn replan(&self, context: &SessionContext, slots: &Slots) -> Option<CallPlan> {
        let previous = context
            .history()
            .rev()
            .map(|record| &record.plan)
            .find(|plan| !plan.is_empty())?;

        let mut plan = CallPlan::new();
        for step in &previous.steps {
            let Ok(descriptor) = self.registry.lookup(&step.tool_name) else {
                continue;
            };
            plan.steps.push(bind_slots(step.clone(), descriptor, slots));
        }
        (!plan.is_empty()).then_some(plan)
    }
}

impl QueryInterpreter for KeywordInterpreter {
    fn interpret(&self, turn: &str, context: &SessionContext) -> CallPlan {
        let reference = self.reference_date();
        if let Some(plan) = self.plan_intents(turn, reference) {
            return plan;
        }

        let slots = Slots::extract(turn, reference);
        if !slots.is_empty()
            && let Some(plan) = self.replan(context, &slots)
        {
            return plan;
        }

        CallPlan::unrecognized()
    }
}

/// Bind extracted entities to the parameters `descriptor` declares.
/// Existing `FromStep` bindings are kept.
fn bind_slots(mut step: CallPlanStep, descriptor: &ToolDescriptor, slots: &Slots) -> CallPlanStep {
    for name in descriptor.parameters.keys() {
        if matches!(step.arguments.get(name), Some(ArgValue::FromStep { .. })) {
            continue;
        }
        let value = match name.as_str() {
            "region" => slots.regions.first().map(|r| Value::from(r.as_str())),
            "regions" if !slots.regions.is_empty() => Some(Value::from(slots.regions.clone())),
            "services" if !slots.services.is_empty() => Some(Value::from(slots.services.clone())),
            "service" => slots.services.first().map(|s| Value::from(s.as_str())),
            "severity" => slots.severity.clone().map(Value::from),
            "time_window" => slots.time_window.map(|w| Value::from(w.to_string())),
            "period_days" => slots.time_window.map(|w| Value::from(w.days())),
            "forecast_months" => slots.forecast_months.map(Value::from),
            "risk_tolerance" => slots.risk_tolerance.clone().map(Value::from),
            "report_type" => slots.report_type.clone().map(Value::from),
            "compliance_type" => slots.compliance_type.clone().map(Value::from),
            "granularity" => slots.granularity.clone().map(Value::from),
            _ => None,
        };
        match value {
            Some(value) => {
                step.arguments.insert(name.clone(), ArgValue::literal(value));
            }
            None if name == "region" && slots.same_region => {
                step.arguments
                    .entry(name.clone())
                    .or_insert_with(|| ArgValue::Unresolved {
                        hint: "same region".to_string(),
                    });
            }
            None => {}
        }
    }
    step
}

/// Add the dependency edge and, where the upstream payload carries a value
/// the dependent tool accepts, bind it.
fn link_steps(
    step: &mut CallPlanStep,
    dependent: &ToolDescriptor,
    upstream: &ToolDescriptor,
    upstream_id: StepId,
) {
    let spend_source = matches!(
        upstream.name.as_str(),
        "get_cost_breakdown" | "get_security_service_costs"
    );
    let binding = match (dependent.name.as_str(), upstream.name.as_str()) {
        ("calculate_security_roi", _) if spend_source => Some(("security_costs", "/total_cost")),
        ("optimize_security_spend", _) if spend_source => Some(("current_spend", "/services")),
        ("analyze_cost_benefit" | "optimize_security_spend", "get_security_findings") => {
            Some(("risk_metrics", "/risk_metrics"))
        }
        _ => None,
    };
    if let Some((param, pointer)) = binding
        && dependent.parameter(param).is_some()
    {
        step.arguments.insert(
            param.to_string(),
            ArgValue::FromStep {
                step: upstream_id,
                pointer: pointer.to_string(),
            },
        );
    }
    step.depends_on.insert(upstream_id);
}
