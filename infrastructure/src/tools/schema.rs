//! JSON Schema export of tool descriptors.
//!
//! Produces one `{name, description, input_schema}` object per tool, the
//! shape tool-servers advertise in their tool listings. Used by
//! `--list-tools --output json`.

use insights_domain::{ParamSpec, ParamType, ParamValidator, ToolDescriptor, ToolRegistry};
use serde_json::{Map, Value, json};

fn param_schema(param: &ParamSpec) -> Value {
    let mut prop = Map::new();
    match param.param_type {
        ParamType::String => {
            prop.insert("type".to_string(), json!("string"));
        }
        ParamType::Integer => {
            prop.insert("type".to_string(), json!("integer"));
        }
        ParamType::Number => {
            prop.insert("type".to_string(), json!("number"));
        }
        ParamType::Boolean => {
            prop.insert("type".to_string(), json!("boolean"));
        }
        ParamType::Object => {
            prop.insert("type".to_string(), json!("object"));
        }
        ParamType::StringList => {
            prop.insert("type".to_string(), json!("array"));
            prop.insert("items".to_string(), json!({"type": "string"}));
        }
        ParamType::TimeWindow => {
            prop.insert("type".to_string(), json!("string"));
            prop.insert(
                "pattern".to_string(),
                json!(r"^\d{4}-\d{2}-\d{2}/\d{4}-\d{2}-\d{2}$"),
            );
        }
    }
    prop.insert("description".to_string(), json!(param.description));

    match &param.validator {
        Some(ParamValidator::OneOf(options)) => {
            // Lists constrain their items
            if let Some(Value::Object(items)) = prop.get_mut("items") {
                items.insert("enum".to_string(), json!(options));
            } else {
                prop.insert("enum".to_string(), json!(options));
            }
        }
        Some(ParamValidator::Range { min, max }) => {
            prop.insert("minimum".to_string(), json!(min));
            prop.insert("maximum".to_string(), json!(max));
        }
        Some(ParamValidator::Region) | None => {}
    }
    if let Some(default) = &param.default {
        prop.insert("default".to_string(), default.clone());
    }
    Value::Object(prop)
}

/// Schema for one tool; properties keep declaration order.
pub fn tool_to_schema(tool: &ToolDescriptor) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in tool.parameters.values() {
        properties.insert(param.name.clone(), param_schema(param));
        if param.required {
            required.push(json!(param.name));
        }
    }

    json!({
        "name": tool.name,
        "description": tool.description,
        "domain": tool.domain,
        "input_schema": {
            "type": "object",
            "properties": properties,
            "required": required,
        }
    })
}

/// Schemas for every registered tool, in registration order.
pub fn registry_schema(registry: &ToolRegistry) -> Vec<Value> {
    registry.list().into_iter().map(tool_to_schema).collect()
}
