//! Payload validation against synthesized models.

use serde_json::Value;

use crate::error::{SchemaError, ValidateError};
use crate::model::Shape;
use crate::registry::OperationRegistry;

/// Which side of an operation a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Request,
    Response,
}

impl Leg {
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Request => "request",
            Leg::Response => "response",
        }
    }

    /// Create leg from a request flag (true = Request, false = Response).
    pub fn from_request_flag(is_request: bool) -> Self {
        if is_request {
            Leg::Request
        } else {
            Leg::Response
        }
    }
}

/// Validate a payload against one leg of a registered operation.
///
/// Returns the payload with declared defaults filled in.
///
/// # Errors
///
/// Returns `ValidateError::UnknownOperation` or `ValidateError::NoModel` when there
/// is nothing to validate against, and `ValidateError::Invalid` when the payload
/// doesn't match the model.
pub fn validate_operation(
    registry: &OperationRegistry,
    operation_id: &str,
    leg: Leg,
    payload: &Value,
) -> Result<Value, ValidateError> {
    let operation = registry
        .get(operation_id)
        .ok_or_else(|| ValidateError::UnknownOperation {
            operation_id: operation_id.to_string(),
        })?;

    let shape = match leg {
        Leg::Request => operation.request_model(),
        Leg::Response => operation.response_model(),
    }
    .ok_or_else(|| ValidateError::NoModel {
        operation_id: operation_id.to_string(),
        leg: leg.as_str(),
    })?;

    validate(shape, payload)
}

/// Validate a payload against a model.
///
/// Defaults are filled in first, so optional fields may be absent and required
/// fields with a declared default need not be supplied. Date-time fields are
/// checked for RFC 3339 format.
///
/// # Errors
///
/// Returns `ValidateError::Invalid` with every violation found.
pub fn validate(shape: &Shape, payload: &Value) -> Result<Value, ValidateError> {
    let mut filled = payload.clone();
    shape.apply_defaults(&mut filled);

    let schema = shape.to_json_schema();
    let validator = jsonschema::options()
        .should_validate_formats(true)
        .build(&schema)
        .map_err(|e| ValidateError::InvalidSchema {
            message: e.to_string(),
        })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(&filled)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(filled)
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesizer::synthesize;
    use crate::types::ExtractOptions;
    use serde_json::json;

    fn widget() -> Shape {
        synthesize(&json!({ "$ref": { "name": "Widget", "schema": {
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "qty": { "type": "integer", "default": 0 },
                "seen_at": { "type": "string", "format": "date-time" }
            }
        } } }))
        .unwrap()
    }

    #[test]
    fn valid_payload_gets_defaults() {
        let filled = validate(&widget(), &json!({ "name": "gear" })).unwrap();
        assert_eq!(
            filled,
            json!({ "name": "gear", "qty": 0, "seen_at": null })
        );
    }

    #[test]
    fn missing_required_field() {
        let result = validate(&widget(), &json!({ "qty": 2 }));
        assert!(matches!(result, Err(ValidateError::Invalid { .. })));
    }

    #[test]
    fn wrong_type() {
        let result = validate(&widget(), &json!({ "name": 123 }));
        assert!(matches!(result, Err(ValidateError::Invalid { .. })));
    }

    #[test]
    fn optional_accepts_null() {
        let result = validate(&widget(), &json!({ "name": "gear", "qty": null }));
        assert!(result.is_ok());
    }

    #[test]
    fn date_time_format_checked() {
        let ok = validate(
            &widget(),
            &json!({ "name": "gear", "seen_at": "2024-05-01T10:00:00Z" }),
        );
        assert!(ok.is_ok());

        let bad = validate(&widget(), &json!({ "name": "gear", "seen_at": "yesterday" }));
        assert!(matches!(bad, Err(ValidateError::Invalid { .. })));
    }

    #[test]
    fn array_errors_carry_paths() {
        let shape = Shape::ArrayOf(Box::new(widget()));
        let result = validate(&shape, &json!([{ "name": "a" }, { "name": 1 }]));
        match result {
            Err(ValidateError::Invalid { errors }) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].path, "/1/name");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn validate_operation_legs() {
        let doc = json!({
            "paths": { "/widgets": { "post": {
                "operationId": "createWidget",
                "tags": ["Customer-Agent"],
                "requestBody": { "content": { "application/json": { "schema": {
                    "type": "object",
                    "required": ["name"],
                    "properties": { "name": { "type": "string" } }
                } } } }
            } } }
        });
        let registry = OperationRegistry::from_document(&doc, &ExtractOptions::default());

        assert!(validate_operation(&registry, "createWidget", Leg::Request, &json!({ "name": "x" })).is_ok());
        assert!(matches!(
            validate_operation(&registry, "createWidget", Leg::Response, &json!({})),
            Err(ValidateError::NoModel { leg: "response", .. })
        ));
        assert!(matches!(
            validate_operation(&registry, "deleteWidget", Leg::Request, &json!({})),
            Err(ValidateError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn leg_from_flag() {
        assert_eq!(Leg::from_request_flag(true), Leg::Request);
        assert_eq!(Leg::from_request_flag(false), Leg::Response);
    }
}
