//! Core types for operation extraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Shape;

/// Prefix that marks a string value as a reference to a component.
pub const COMPONENT_REF_PREFIX: &str = "#/components";

/// Capability tag selected when no other tag is configured.
pub const DEFAULT_TAG: &str = "Customer-Agent";

/// The only media type whose schemas are turned into models.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// HTTP verbs an operation can be exposed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Parse a path-item key (case-insensitive).
    ///
    /// Returns `None` for anything that is not one of the supported verbs.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for operation extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Only operations whose `tags` contain this value are extracted.
    pub tag: String,
}

impl ExtractOptions {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new(DEFAULT_TAG)
    }
}

/// Outcome of building the model for one request or response leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BodyModel {
    /// The operation declares no JSON schema for this leg.
    NotDeclared,
    Synthesized {
        /// Serialized together with its component definitions.
        #[serde(serialize_with = "crate::model::serialize_document")]
        shape: Shape,
    },
    /// A schema is declared but no model could be built from it.
    Omitted { reason: String },
}

impl BodyModel {
    pub fn shape(&self) -> Option<&Shape> {
        match self {
            BodyModel::Synthesized { shape } => Some(shape),
            _ => None,
        }
    }
}

/// One exposed operation with its request/response models.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDescriptor {
    pub url: String,
    pub method: HttpMethod,
    pub operation_id: String,
    pub description: String,
    /// The document's `parameters` list, untouched.
    pub params: Vec<Value>,
    pub request_body: BodyModel,
    pub response_body: BodyModel,
}

impl OperationDescriptor {
    pub fn request_model(&self) -> Option<&Shape> {
        self.request_body.shape()
    }

    pub fn response_model(&self) -> Option<&Shape> {
        self.response_body.shape()
    }
}
