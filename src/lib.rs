//! OpenAPI Tool Models
//!
//! Turns a vendor's OpenAPI document into validating request/response models for
//! the operations an agent is allowed to call.
//!
//! The pipeline has three stages:
//!
//! 1. [`resolve`] inlines `#/components/...` pointers as `{name, schema}` pairs,
//!    one level deep.
//! 2. [`synthesize`] turns a resolved schema fragment into a [`Shape`]: an object
//!    model, an array of models, or a scalar. A component referenced from several
//!    places is expanded once and shared.
//! 3. [`extract_operations`] selects the operations carrying a capability tag and
//!    pairs their endpoint metadata with request/response models.
//!
//! # Example
//!
//! ```
//! use openapi_tool_models::{extract_operations, validate, ExtractOptions};
//! use serde_json::json;
//!
//! let document = json!({
//!     "paths": {
//!         "/widgets": {
//!             "post": {
//!                 "operationId": "createWidget",
//!                 "tags": ["Customer-Agent"],
//!                 "requestBody": {
//!                     "content": {
//!                         "application/json": {
//!                             "schema": { "$ref": "#/components/schemas/Widget" }
//!                         }
//!                     }
//!                 }
//!             }
//!         }
//!     },
//!     "components": {
//!         "schemas": {
//!             "Widget": {
//!                 "type": "object",
//!                 "required": ["name"],
//!                 "properties": {
//!                     "name": { "type": "string" },
//!                     "qty": { "type": "integer", "default": 0 }
//!                 }
//!             }
//!         }
//!     }
//! });
//!
//! let operations = extract_operations(&document, &ExtractOptions::new("Customer-Agent"));
//! let model = operations[0].request_model().unwrap();
//!
//! let filled = validate(model, &json!({ "name": "gear" })).unwrap();
//! assert_eq!(filled["qty"], 0);
//! ```
//!
//! # Field Rules
//!
//! | Property | Default declared | Result |
//! |----------|------------------|--------|
//! | required | no | must be supplied |
//! | required | yes | keeps the default |
//! | optional | no | nullable, defaults to `null` |
//! | optional | yes | nullable, keeps the default |

mod error;
mod extractor;
mod loader;
mod model;
mod registry;
mod resolver;
mod synthesizer;
mod tool;
mod types;
mod validator;

pub use error::{LoadError, SchemaError, SynthesisError, ValidateError};
pub use extractor::extract_operations;
pub use loader::{is_url, load_document, load_document_auto, load_document_str};
pub use model::{
    Component, FieldSpec, ObjectModel, ScalarKind, Shape, ShapeDocument, DYNAMIC_MODEL_NAME,
};
pub use registry::OperationRegistry;
pub use resolver::{as_reference_pair, reference_name, resolve, Resolver};
pub use synthesizer::{synthesize, Synthesizer, MAX_REFERENCE_DEPTH};
pub use tool::ToolDefinition;
pub use types::{
    BodyModel, ExtractOptions, HttpMethod, OperationDescriptor, DEFAULT_TAG, JSON_MEDIA_TYPE,
};
pub use validator::{validate, validate_operation, Leg};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
