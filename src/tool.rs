//! Agent-facing tool definitions derived from operation descriptors.

use serde::Serialize;
use serde_json::{json, Value};

use crate::model::Shape;
use crate::types::OperationDescriptor;

/// A callable tool as advertised to an agent framework.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

impl ToolDefinition {
    /// Build the tool for one operation.
    ///
    /// The input carries the endpoint (`url`, `method`), the raw `params` and the
    /// request `body`; the output wraps the decoded `response`. Legs without a
    /// model fall back to an open object. Component definitions of a leg are
    /// moved to the root of the enclosing schema so their `$ref`s resolve.
    pub fn from_operation(operation: &OperationDescriptor) -> Self {
        let (body, body_defs) = leg_schema(operation.request_model());
        let (response, response_defs) = leg_schema(operation.response_model());

        let input_schema = json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "default": operation.url },
                "method": { "type": "string", "default": operation.method.as_str() },
                "params": {
                    "type": "array",
                    "items": { "type": "object" },
                    "default": operation.params,
                },
                "body": body,
            },
            "required": ["url", "method"],
        });
        let output_schema = json!({
            "type": "object",
            "properties": {
                "response": response,
            },
        });

        Self {
            name: operation.operation_id.clone(),
            description: operation.description.clone(),
            input_schema: with_definitions(input_schema, body_defs),
            output_schema: with_definitions(output_schema, response_defs),
        }
    }
}

fn leg_schema(shape: Option<&Shape>) -> (Value, Option<Value>) {
    let Some(shape) = shape else {
        return (json!({ "type": "object" }), None);
    };
    let mut schema = shape.to_json_schema();
    let definitions = schema.as_object_mut().and_then(|map| map.remove("$defs"));
    (schema, definitions)
}

fn with_definitions(mut schema: Value, definitions: Option<Value>) -> Value {
    if let (Some(definitions), Some(map)) = (definitions, schema.as_object_mut()) {
        map.insert("$defs".into(), definitions);
    }
    schema
}
