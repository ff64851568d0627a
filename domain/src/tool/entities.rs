//! Tool domain entities

use crate::core::error::DomainError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Analytical domain served by a tool-server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolDomain {
    /// Security posture (GuardDuty, Security Hub, Inspector, compliance)
    Security,
    /// Security service spend (Cost Explorer)
    Cost,
    /// Return on security investment
    Roi,
}

impl ToolDomain {
    pub const ALL: [ToolDomain; 3] = [ToolDomain::Security, ToolDomain::Cost, ToolDomain::Roi];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolDomain::Security => "security",
            ToolDomain::Cost => "cost",
            ToolDomain::Roi => "roi",
        }
    }

    /// Human-readable label used in narratives.
    pub fn label(&self) -> &'static str {
        match self {
            ToolDomain::Security => "security posture",
            ToolDomain::Cost => "cost",
            ToolDomain::Roi => "ROI",
        }
    }
}

impl std::fmt::Display for ToolDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "security" => Ok(ToolDomain::Security),
            "cost" | "costs" => Ok(ToolDomain::Cost),
            "roi" => Ok(ToolDomain::Roi),
            other => Err(format!("unknown tool domain: {}", other)),
        }
    }
}

/// Value type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    StringList,
    Object,
    /// ISO interval `YYYY-MM-DD/YYYY-MM-DD`
    TimeWindow,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::StringList => "string_list",
            ParamType::Object => "object",
            ParamType::TimeWindow => "time_window",
        }
    }
}

/// Additional constraint checked after the type check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValidator {
    /// Value must equal one of the options (case-insensitive; canonicalised
    /// to the listed spelling).
    OneOf(Vec<String>),
    /// Inclusive numeric range.
    Range { min: f64, max: f64 },
    /// AWS region code such as `us-west-2`.
    Region,
}

/// Schema entry for one tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<ParamValidator>,
    /// Resolved values persist in session context across turns.
    #[serde(default)]
    pub sticky: bool,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type,
            required: false,
            default: None,
            validator: None,
            sticky: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_validator(mut self, validator: ParamValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn one_of(self, options: &[&str]) -> Self {
        self.with_validator(ParamValidator::OneOf(
            options.iter().map(|o| o.to_string()).collect(),
        ))
    }

    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }
}

/// Static description of a callable tool
///
/// Immutable once the registry is built; parameter order is the declaration
/// order and is preserved in schema exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name of the tool (e.g., "get_cost_breakdown")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Domain of the tool-server hosting this tool
    pub domain: ToolDomain,
    /// Parameter schema in declaration order
    pub parameters: IndexMap<String, ParamSpec>,
    /// Address of the tool-server endpoint
    pub backend_address: String,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        domain: ToolDomain,
        backend_address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            domain,
            parameters: IndexMap::new(),
            backend_address: backend_address.into(),
        }
    }

    pub fn with_parameter(mut self, param: ParamSpec) -> Self {
        self.parameters.insert(param.name.clone(), param);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.get(name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParamSpec> {
        self.parameters.values().filter(|p| p.required)
    }
}

/// Catalog of callable tools
///
/// Read-only after construction, so it can be shared behind an `Arc`
/// without locking. Lookups accept canonical names, registered aliases and
/// any casing.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDescriptor>,
    /// Alias → canonical name mapping (e.g. "security_status" → "check_security_services")
    aliases: HashMap<String, String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate tool names.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ToolDescriptor>,
    ) -> Result<Self, DomainError> {
        let mut registry = Self::new();
        for tool in descriptors {
            let key = tool.name.to_lowercase();
            if registry.tools.contains_key(&key) {
                return Err(DomainError::DuplicateTool(tool.name));
            }
            registry.tools.insert(key, tool);
        }
        Ok(registry)
    }

    /// Register a tool (builder pattern); a later registration replaces an
    /// earlier one with the same name.
    pub fn register(mut self, tool: ToolDescriptor) -> Self {
        self.tools.insert(tool.name.to_lowercase(), tool);
        self
    }

    /// Register a single alias mapping (builder pattern)
    pub fn register_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases
            .insert(alias.into().to_lowercase(), canonical.into().to_lowercase());
        self
    }

    /// Register multiple aliases at once (builder pattern)
    pub fn register_aliases(
        mut self,
        mappings: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        for (alias, canonical) in mappings {
            self.aliases
                .insert(alias.into().to_lowercase(), canonical.into().to_lowercase());
        }
        self
    }

    /// Resolve a name (canonical or alias, any case) to the canonical key.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let key = name.trim().to_lowercase();
        if let Some((canonical, _)) = self.tools.get_key_value(&key) {
            return Some(canonical.as_str());
        }
        self.aliases
            .get(&key)
            .filter(|canonical| self.tools.contains_key(*canonical))
            .map(|s| s.as_str())
    }

    /// Look up a tool descriptor by canonical name or alias.
    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor, DomainError> {
        self.resolve(name)
            .and_then(|canonical| self.tools.get(canonical))
            .ok_or_else(|| DomainError::UnknownTool(name.to_string()))
    }

    /// All tools in registration order.
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.values().map(|t| t.name.as_str())
    }

    pub fn tools_for(&self, domain: ToolDomain) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().filter(move |t| t.domain == domain)
    }

    /// First registered tool of a domain; the domain's default entry point.
    pub fn primary_tool(&self, domain: ToolDomain) -> Option<&ToolDescriptor> {
        self.tools_for(domain).next()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
