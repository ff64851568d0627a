//! Dependency graph checks for call plans.

use super::entities::{CallPlan, StepId};
use crate::core::error::DomainError;
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// Topologically order a plan's steps (Kahn's algorithm).
///
/// Ties are broken by declaration order, so a flat plan orders exactly as
/// declared.
///
/// # Errors
///
/// `DomainError::Configuration` for duplicate step ids, dependencies on
/// unknown steps, self-dependencies and cycles.
pub fn topological_order(plan: &CallPlan) -> Result<Vec<StepId>, DomainError> {
    let mut in_degree: IndexMap<StepId, usize> = IndexMap::with_capacity(plan.steps.len());
    for step in &plan.steps {
        if in_degree.insert(step.id, step.depends_on.len()).is_some() {
            return Err(DomainError::Configuration(format!(
                "duplicate step id {} in call plan",
                step.id
            )));
        }
    }

    let mut dependents: IndexMap<StepId, Vec<StepId>> = IndexMap::new();
    for step in &plan.steps {
        for dep in &step.depends_on {
            if *dep == step.id {
                return Err(DomainError::Configuration(format!(
                    "step {} ({}) depends on itself",
                    step.id, step.tool_name
                )));
            }
            if !in_degree.contains_key(dep) {
                return Err(DomainError::Configuration(format!(
                    "step {} ({}) depends on unknown step {}",
                    step.id, step.tool_name, dep
                )));
            }
            dependents.entry(*dep).or_default().push(step.id);
        }
    }

    let mut queue: VecDeque<StepId> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(plan.steps.len());

    while let Some(id) = queue.pop_front() {
        order.push(id);
        for dependent in dependents.get(&id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*dependent);
                }
            }
        }
    }

    if order.len() != plan.steps.len() {
        let placed: IndexSet<StepId> = order.iter().copied().collect();
        let cyclic: Vec<String> = plan
            .steps
            .iter()
            .filter(|s| !placed.contains(&s.id))
            .map(|s| format!("{} ({})", s.id, s.tool_name))
            .collect();
        return Err(DomainError::Configuration(format!(
            "dependency cycle among steps: {}",
            cyclic.join(", ")
        )));
    }

    Ok(order)
}
