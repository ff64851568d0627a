//! Call plan entities

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a step within one plan (its declaration index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub usize);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value bound to a step argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgValue {
    /// Concrete value extracted from the turn
    Literal { value: Value },
    /// Filled from a dependency's payload at dispatch time.
    /// `pointer` is a JSON Pointer into that payload (`""` = whole payload).
    FromStep { step: StepId, pointer: String },
    /// Mentioned but not resolvable by the interpreter; the resolver
    /// treats it as unbound.
    Unresolved { hint: String },
}

impl ArgValue {
    pub fn literal(value: impl Into<Value>) -> Self {
        ArgValue::Literal {
            value: value.into(),
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            ArgValue::Literal { value } => Some(value),
            _ => None,
        }
    }
}

/// One tool invocation in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPlanStep {
    pub id: StepId,
    pub tool_name: String,
    pub arguments: IndexMap<String, ArgValue>,
    /// Steps whose results must be available before this one runs
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<StepId>,
}

impl CallPlanStep {
    pub fn new(id: StepId, tool_name: impl Into<String>) -> Self {
        Self {
            id,
            tool_name: tool_name.into(),
            arguments: IndexMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with_literal(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), ArgValue::literal(value));
        self
    }

    /// Bind an argument to another step's output; also records the edge.
    pub fn with_step_output(
        mut self,
        name: impl Into<String>,
        step: StepId,
        pointer: impl Into<String>,
    ) -> Self {
        self.arguments.insert(
            name.into(),
            ArgValue::FromStep {
                step,
                pointer: pointer.into(),
            },
        );
        self.depends_on.insert(step);
        self
    }

    pub fn with_unresolved(mut self, name: impl Into<String>, hint: impl Into<String>) -> Self {
        self.arguments
            .insert(name.into(), ArgValue::Unresolved { hint: hint.into() });
        self
    }

    pub fn depends_on(mut self, step: StepId) -> Self {
        self.depends_on.insert(step);
        self
    }

    pub fn literal(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name).and_then(ArgValue::as_literal)
    }
}

/// Outcome of interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTag {
    Ready,
    /// No intent recognised; the caller asks the user to rephrase
    Unrecognized,
}

/// Ordered, possibly dependent set of tool calls derived from one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPlan {
    pub steps: Vec<CallPlanStep>,
    pub tag: PlanTag,
}

impl CallPlan {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            tag: PlanTag::Ready,
        }
    }

    pub fn unrecognized() -> Self {
        Self {
            steps: Vec::new(),
            tag: PlanTag::Unrecognized,
        }
    }

    /// Id the next pushed step will receive.
    pub fn next_id(&self) -> StepId {
        StepId(self.steps.len())
    }

    /// Append a step built from the next id.
    pub fn push(&mut self, build: impl FnOnce(CallPlanStep) -> CallPlanStep, tool_name: &str) -> StepId {
        let id = self.next_id();
        self.steps.push(build(CallPlanStep::new(id, tool_name)));
        id
    }

    pub fn with_step(mut self, step: CallPlanStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step(&self, id: StepId) -> Option<&CallPlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Declaration index of a step.
    pub fn position(&self, id: StepId) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    pub fn is_unrecognized(&self) -> bool {
        self.tag == PlanTag::Unrecognized
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.tool_name.as_str()).collect()
    }

    /// True when no step declares a dependency.
    pub fn is_flat(&self) -> bool {
        self.steps.iter().all(|s| s.depends_on.is_empty())
    }
}

impl Default for CallPlan {
    fn default() -> Self {
        Self::new()
    }
}
