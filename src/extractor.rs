//! Operation extraction - builds descriptors for the tagged operations of a document.

use serde_json::Value;

use crate::resolver::Resolver;
use crate::synthesizer::Synthesizer;
use crate::types::{BodyModel, ExtractOptions, HttpMethod, OperationDescriptor, JSON_MEDIA_TYPE};

/// Extract every operation tagged with `options.tag`, in document order.
///
/// Operations are never dropped because a model could not be built: the failing
/// leg is recorded as [`BodyModel::Omitted`] and extraction continues.
pub fn extract_operations(document: &Value, options: &ExtractOptions) -> Vec<OperationDescriptor> {
    let resolver = Resolver::new(document);
    let mut operations = Vec::new();

    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        tracing::debug!("document has no paths");
        return operations;
    };

    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };

        for (key, details) in item {
            let Some(method) = HttpMethod::parse(key) else {
                tracing::debug!("skipping '{}' under path '{}'", key, path);
                continue;
            };
            if !has_tag(details, &options.tag) {
                continue;
            }

            operations.push(build_descriptor(&resolver, path, method, details));
        }
    }

    operations
}

fn has_tag(details: &Value, tag: &str) -> bool {
    details
        .get("tags")
        .and_then(Value::as_array)
        .map_or(false, |tags| tags.iter().any(|t| t.as_str() == Some(tag)))
}

fn build_descriptor(
    resolver: &Resolver<'_>,
    path: &str,
    method: HttpMethod,
    details: &Value,
) -> OperationDescriptor {
    let operation_id = string_field(details, "operationId");

    let request_schema = details
        .get("requestBody")
        .and_then(json_schema_of);
    // The first declared response, whatever its status code
    let response_schema = details
        .get("responses")
        .and_then(Value::as_object)
        .and_then(|responses| responses.values().next())
        .and_then(json_schema_of);

    OperationDescriptor {
        url: path.to_string(),
        method,
        description: string_field(details, "description"),
        params: details
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        request_body: body_model(resolver, request_schema, &operation_id, "request"),
        response_body: body_model(resolver, response_schema, &operation_id, "response"),
        operation_id,
    }
}

/// `content["application/json"].schema` of a request body or response.
fn json_schema_of(body: &Value) -> Option<&Value> {
    body.get("content")?
        .get(JSON_MEDIA_TYPE)?
        .get("schema")
        .filter(|schema| !schema.is_null())
}

fn body_model(
    resolver: &Resolver<'_>,
    schema: Option<&Value>,
    operation_id: &str,
    leg: &str,
) -> BodyModel {
    let Some(schema) = schema else {
        return BodyModel::NotDeclared;
    };

    let resolved = resolver.resolve(schema);
    match Synthesizer::with_resolver(*resolver).synthesize(&resolved) {
        Ok(shape) => BodyModel::Synthesized { shape },
        Err(e) => {
            tracing::warn!(
                "omitting {} model for operation '{}': {}",
                leg,
                operation_id,
                e
            );
            BodyModel::Omitted {
                reason: e.to_string(),
            }
        }
    }
}

fn string_field(details: &Value, key: &str) -> String {
    details
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
