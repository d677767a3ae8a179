//! Model synthesis - turns a resolved schema fragment into a [`Shape`].
//!
//! The top-level fragment must be an array, an inline object schema, or a
//! `{"$ref": {name, schema}}` reference whose schema is an object. Properties map
//! to scalar kinds, nested objects, or arrays; anything unrecognised becomes
//! [`ScalarKind::Any`] rather than failing.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::SynthesisError;
use crate::model::{Component, FieldSpec, ObjectModel, ScalarKind, Shape, DYNAMIC_MODEL_NAME};
use crate::resolver::{as_reference_pair, is_reference, Resolver};
use crate::types::json_type_name;

/// Maximum number of nested component expansions before truncating.
pub const MAX_REFERENCE_DEPTH: usize = 32;

/// Synthesize a model without expanding references nested in properties.
///
/// # Errors
///
/// Returns `SynthesisError` if the fragment is not an array or object schema, or
/// references a component that does not exist.
pub fn synthesize(fragment: &Value) -> Result<Shape, SynthesisError> {
    Synthesizer::new().synthesize(fragment)
}

/// Builds shapes, optionally expanding references nested in properties.
///
/// Each component is expanded at most once per synthesizer; later references
/// share the finished [`Component`].
#[derive(Debug, Default)]
pub struct Synthesizer<'a> {
    resolver: Option<Resolver<'a>>,
    // Components currently being expanded, outermost first
    expanding: Vec<String>,
    finished: HashMap<String, Arc<Component>>,
}

impl<'a> Synthesizer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand property-level references against the resolver's document.
    ///
    /// A component that is already being expanded (directly or through other
    /// components) becomes [`Shape::Recursive`] instead of recursing again.
    pub fn with_resolver(resolver: Resolver<'a>) -> Self {
        Self {
            resolver: Some(resolver),
            ..Self::default()
        }
    }

    /// Synthesize the top-level model for a request or response body.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError::SchemaShape` for fragments that are neither an
    /// array nor an object schema, and `SynthesisError::UnresolvedReference` for
    /// references to missing components.
    pub fn synthesize(&mut self, fragment: &Value) -> Result<Shape, SynthesisError> {
        if type_of(fragment) == Some("array") {
            let items = fragment.get("items").cloned().unwrap_or(Value::Object(Map::new()));
            let items = self.resolve_pointers(&items);
            let element = self.synthesize(&items)?;
            return Ok(Shape::ArrayOf(Box::new(element)));
        }

        if let Some(reference) = fragment.get("$ref") {
            let Some((name, schema)) = as_reference_pair(reference) else {
                return Err(SynthesisError::SchemaShape {
                    found: format!("unresolved $ref ({})", json_type_name(reference)),
                });
            };
            if schema.is_null() {
                return Err(SynthesisError::UnresolvedReference {
                    name: name.to_string(),
                });
            }
            if type_of(schema) != Some("object") {
                return Err(SynthesisError::SchemaShape {
                    found: format!("reference '{}' to a {} schema", name, describe(schema)),
                });
            }
            return Ok(self.component_shape(name, schema));
        }

        if type_of(fragment) == Some("object") {
            return Ok(Shape::Object(self.object_model(DYNAMIC_MODEL_NAME, fragment)));
        }

        Err(SynthesisError::SchemaShape {
            found: describe(fragment),
        })
    }

    /// Number of distinct components expanded so far.
    pub fn component_count(&self) -> usize {
        self.finished.len()
    }

    fn component_shape(&mut self, name: &str, schema: &Value) -> Shape {
        if self.expanding.iter().any(|n| n == name) || self.expanding.len() >= MAX_REFERENCE_DEPTH
        {
            tracing::debug!("not expanding recursive reference to '{}'", name);
            return Shape::Recursive(name.to_string());
        }
        if let Some(done) = self.finished.get(name) {
            return Shape::Component(Arc::clone(done));
        }

        self.expanding.push(name.to_string());
        let shape = match type_of(schema) {
            Some("object") => Shape::Object(self.object_model(name, schema)),
            // Non-object components (enums, aliases) are synthesized like an inline property
            _ => self.property_shape(name, schema),
        };
        self.expanding.pop();

        let component = Arc::new(Component {
            name: name.to_string(),
            shape,
        });
        self.finished.insert(name.to_string(), Arc::clone(&component));
        Shape::Component(component)
    }

    fn object_model(&mut self, name: &str, schema: &Value) -> ObjectModel {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut fields = Vec::new();
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (prop_name, prop) in properties {
                let is_required = required.contains(&prop_name.as_str());
                fields.push(self.field_spec(prop_name, prop, is_required));
            }
        }

        ObjectModel {
            name: name.to_string(),
            fields,
        }
    }

    fn field_spec(&mut self, name: &str, prop: &Value, required: bool) -> FieldSpec {
        let shape = self.property_shape(name, prop);

        // Optional fields always carry a default, null when none is declared
        let default = if required {
            prop.get("default").cloned()
        } else {
            Some(prop.get("default").cloned().unwrap_or(Value::Null))
        };

        FieldSpec {
            name: name.to_string(),
            shape,
            required,
            nullable: !required,
            default,
            description: prop
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            example: prop.get("example").filter(|v| !v.is_null()).cloned(),
        }
    }

    fn property_shape(&mut self, name: &str, prop: &Value) -> Shape {
        if let Some(reference) = prop.get("$ref") {
            return self.reference_shape(reference);
        }

        let format = prop.get("format").and_then(Value::as_str);
        if let Some(kind) = ScalarKind::from_json_type(type_of(prop), format) {
            return Shape::Scalar(kind);
        }

        match type_of(prop) {
            Some("array") => {
                let element = match prop.get("items") {
                    Some(items) => self.property_shape(name, items),
                    None => Shape::Scalar(ScalarKind::Any),
                };
                Shape::ArrayOf(Box::new(element))
            }
            // "object": nested model named after the property, open when it has no properties
            _ => Shape::Object(self.object_model(name, prop)),
        }
    }

    fn reference_shape(&mut self, reference: &Value) -> Shape {
        let Some(resolver) = self.resolver else {
            return Shape::Scalar(ScalarKind::Any);
        };

        let pair = match reference {
            Value::String(pointer) if is_reference(pointer) => resolver.dereference(pointer),
            other => other.clone(),
        };
        let Some((name, schema)) = as_reference_pair(&pair) else {
            return Shape::Scalar(ScalarKind::Any);
        };

        if schema.is_null() {
            return Shape::Scalar(ScalarKind::Any);
        }
        self.component_shape(name, schema)
    }

    fn resolve_pointers(&self, fragment: &Value) -> Value {
        match self.resolver {
            Some(resolver) => resolver.resolve(fragment),
            None => fragment.clone(),
        }
    }
}

fn type_of(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

fn describe(schema: &Value) -> String {
    match type_of(schema) {
        Some(ty) => format!("type '{}'", ty),
        None => format!("untyped {}", json_type_name(schema)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;
    use serde_json::json;

    fn widget_schema() -> Value {
        json!({
            "type": "object",
            "required": ["name", "size"],
            "properties": {
                "name": { "type": "string", "description": "Display name", "example": "gear" },
                "size": { "type": "integer", "default": 5 },
                "qty": { "type": "integer", "default": 0 },
                "note": { "type": "string" },
                "created_at": { "type": "string", "format": "date-time" },
                "price": { "type": "number" },
                "active": { "type": "boolean" },
                "meta": { "type": "object" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "blob": {}
            }
        })
    }

    fn widget_ref() -> Value {
        json!({ "$ref": { "name": "Widget", "schema": widget_schema() } })
    }

    fn widget_model() -> ObjectModel {
        match synthesize(&widget_ref()).unwrap() {
            Shape::Component(component) => match &component.shape {
                Shape::Object(model) => model.clone(),
                other => panic!("expected object, got {:?}", other),
            },
            other => panic!("expected component, got {:?}", other),
        }
    }

    fn widget_component() -> Shape {
        Shape::Component(Arc::new(Component {
            name: "Widget".into(),
            shape: Shape::Object(widget_model()),
        }))
    }

    fn component_of(shape: &Shape) -> &Component {
        match shape {
            Shape::Component(component) => component,
            other => panic!("expected component, got {:?}", other),
        }
    }

    #[test]
    fn reference_pair_becomes_named_model() {
        let model = widget_model();
        assert_eq!(model.name, "Widget");
        let names: Vec<&str> = model.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "name",
                "size",
                "qty",
                "note",
                "created_at",
                "price",
                "active",
                "meta",
                "tags",
                "blob"
            ]
        );
    }

    #[test]
    fn required_without_default_has_no_default() {
        let model = widget_model();
        let name = model.field("name").unwrap();
        assert!(name.required);
        assert!(!name.nullable);
        assert_eq!(name.default, None);
    }

    #[test]
    fn required_with_default_keeps_it() {
        let size = widget_model().field("size").cloned().unwrap();
        assert!(size.required);
        assert_eq!(size.default, Some(json!(5)));
    }

    #[test]
    fn optional_fields_are_nullable_with_default() {
        let model = widget_model();
        let qty = model.field("qty").unwrap();
        assert!(!qty.required);
        assert!(qty.nullable);
        assert_eq!(qty.default, Some(json!(0)));

        let note = model.field("note").unwrap();
        assert!(note.nullable);
        assert_eq!(note.default, Some(Value::Null));
    }

    #[test]
    fn property_types_map_to_shapes() {
        let model = widget_model();
        let shape = |n: &str| model.field(n).unwrap().shape.clone();
        assert_eq!(shape("name"), Shape::Scalar(ScalarKind::String));
        assert_eq!(shape("created_at"), Shape::Scalar(ScalarKind::DateTime));
        assert_eq!(shape("price"), Shape::Scalar(ScalarKind::Number));
        assert_eq!(shape("active"), Shape::Scalar(ScalarKind::Boolean));
        assert_eq!(shape("blob"), Shape::Scalar(ScalarKind::Any));
        assert_eq!(
            shape("tags"),
            Shape::ArrayOf(Box::new(Shape::Scalar(ScalarKind::String)))
        );
        assert_eq!(
            shape("meta"),
            Shape::Object(ObjectModel {
                name: "meta".into(),
                fields: vec![]
            })
        );
    }

    #[test]
    fn metadata_kept_only_when_present() {
        let model = widget_model();
        let name = model.field("name").unwrap();
        assert_eq!(name.description.as_deref(), Some("Display name"));
        assert_eq!(name.example, Some(json!("gear")));

        let qty = model.field("qty").unwrap();
        assert_eq!(qty.description, None);
        assert_eq!(qty.example, None);
    }

    #[test]
    fn array_of_reference_matches_standalone_model() {
        let array = json!({ "type": "array", "items": widget_ref() });
        let shape = synthesize(&array).unwrap();
        assert_eq!(shape, Shape::ArrayOf(Box::new(widget_component())));
    }

    #[test]
    fn nested_arrays_recurse() {
        let array = json!({ "type": "array", "items": { "type": "array", "items": widget_ref() } });
        let shape = synthesize(&array).unwrap();
        assert_eq!(
            shape,
            Shape::ArrayOf(Box::new(Shape::ArrayOf(Box::new(widget_component()))))
        );
    }

    #[test]
    fn inline_object_uses_dynamic_name() {
        let shape = synthesize(&json!({
            "type": "object",
            "properties": { "ok": { "type": "boolean" } }
        }))
        .unwrap();
        assert_eq!(shape.object_model().unwrap().name, "DynamicModel");
    }

    #[test]
    fn reference_to_non_object_errors() {
        let fragment = json!({ "$ref": { "name": "Id", "schema": { "type": "string" } } });
        assert!(matches!(
            synthesize(&fragment),
            Err(SynthesisError::SchemaShape { .. })
        ));
    }

    #[test]
    fn missing_reference_errors() {
        let fragment = json!({ "$ref": { "name": "Gadget", "schema": null } });
        assert_eq!(
            synthesize(&fragment),
            Err(SynthesisError::UnresolvedReference {
                name: "Gadget".into()
            })
        );
    }

    #[test]
    fn unresolved_pointer_errors() {
        let fragment = json!({ "$ref": "#/components/schemas/Widget" });
        assert!(matches!(
            synthesize(&fragment),
            Err(SynthesisError::SchemaShape { .. })
        ));
    }

    #[test]
    fn scalar_top_level_errors() {
        let err = synthesize(&json!({ "type": "string" })).unwrap_err();
        assert_eq!(
            err,
            SynthesisError::SchemaShape {
                found: "type 'string'".into()
            }
        );
        assert!(synthesize(&Value::Null).is_err());
        assert!(synthesize(&json!({ "type": "array" })).is_err());
    }

    #[test]
    fn synthesis_is_deterministic() {
        assert_eq!(synthesize(&widget_ref()), synthesize(&widget_ref()));
    }

    #[test]
    fn nested_reference_without_resolver_is_any() {
        let fragment = json!({ "$ref": { "name": "Order", "schema": {
            "type": "object",
            "properties": { "widget": { "$ref": "#/components/schemas/Widget" } }
        } } });
        let model = synthesize(&fragment).unwrap();
        assert_eq!(
            model.object_model().unwrap().field("widget").unwrap().shape,
            Shape::Scalar(ScalarKind::Any)
        );
    }

    #[test]
    fn nested_reference_with_resolver_expands() {
        let doc = json!({
            "components": { "schemas": {
                "Widget": widget_schema(),
                "Order": {
                    "type": "object",
                    "properties": {
                        "widget": { "$ref": "#/components/schemas/Widget" },
                        "lines": { "type": "array", "items": { "$ref": "#/components/schemas/Widget" } }
                    }
                }
            } }
        });
        let resolver = Resolver::new(&doc);
        let fragment = resolver.resolve(&json!({ "$ref": "#/components/schemas/Order" }));
        let shape = Synthesizer::with_resolver(resolver).synthesize(&fragment).unwrap();

        let order = shape.object_model().unwrap();
        assert_eq!(order.field("widget").unwrap().shape, widget_component());
        assert_eq!(
            order.field("lines").unwrap().shape,
            Shape::ArrayOf(Box::new(widget_component()))
        );
    }

    #[test]
    fn repeated_reference_shares_one_expansion() {
        let doc = json!({
            "components": { "schemas": {
                "Widget": widget_schema(),
                "Order": {
                    "type": "object",
                    "properties": {
                        "first": { "$ref": "#/components/schemas/Widget" },
                        "second": { "$ref": "#/components/schemas/Widget" }
                    }
                }
            } }
        });
        let resolver = Resolver::new(&doc);
        let fragment = resolver.resolve(&json!({ "$ref": "#/components/schemas/Order" }));
        let mut synthesizer = Synthesizer::with_resolver(resolver);
        let shape = synthesizer.synthesize(&fragment).unwrap();

        let order = shape.object_model().unwrap();
        match (&order.field("first").unwrap().shape, &order.field("second").unwrap().shape) {
            (Shape::Component(a), Shape::Component(b)) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("expected components, got {:?}", other),
        }
        assert_eq!(synthesizer.component_count(), 2);
    }

    #[test]
    fn diamond_chain_expands_each_component_once() {
        // C0..C24, each with two properties pointing at the next one
        let depth = 24;
        let mut schemas = Map::new();
        for i in 0..depth {
            let next = json!({ "$ref": format!("#/components/schemas/C{}", i + 1) });
            schemas.insert(
                format!("C{}", i),
                json!({ "type": "object", "properties": { "a": next, "b": next } }),
            );
        }
        schemas.insert(
            format!("C{}", depth),
            json!({ "type": "object", "properties": { "leaf": { "type": "string" } } }),
        );
        let doc = json!({ "components": { "schemas": schemas } });

        let resolver = Resolver::new(&doc);
        let fragment = resolver.resolve(&json!({ "$ref": "#/components/schemas/C0" }));
        let mut synthesizer = Synthesizer::with_resolver(resolver);
        let shape = synthesizer.synthesize(&fragment).unwrap();

        assert_eq!(synthesizer.component_count(), depth + 1);
        assert_eq!(shape.definitions().len(), depth + 1);
        let schema = shape.to_json_schema();
        assert_eq!(schema["$defs"].as_object().unwrap().len(), depth + 1);
        assert!(schema.to_string().len() < 400 * (depth + 1));
    }

    #[test]
    fn cyclic_reference_is_truncated() {
        let doc = json!({
            "components": { "schemas": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": { "type": "integer" },
                        "next": { "$ref": "#/components/schemas/Node" }
                    }
                }
            } }
        });
        let resolved = resolve(&doc);
        let resolver = Resolver::new(&resolved);
        let fragment = resolver.resolve(&json!({ "$ref": "#/components/schemas/Node" }));
        let shape = Synthesizer::with_resolver(resolver).synthesize(&fragment).unwrap();

        let node = shape.object_model().unwrap();
        assert_eq!(node.field("next").unwrap().shape, Shape::Recursive("Node".into()));
    }

    #[test]
    fn recursive_array_alias_is_truncated_inside_its_component() {
        let doc = json!({
            "components": { "schemas": {
                "Node": {
                    "type": "object",
                    "properties": { "children": { "$ref": "#/components/schemas/Forest" } }
                },
                "Forest": { "type": "array", "items": { "$ref": "#/components/schemas/Forest" } }
            } }
        });
        let resolver = Resolver::new(&doc);
        let fragment = resolver.resolve(&json!({ "$ref": "#/components/schemas/Node" }));
        let shape = Synthesizer::with_resolver(resolver).synthesize(&fragment).unwrap();

        let node = shape.object_model().unwrap();
        let forest = component_of(&node.field("children").unwrap().shape);
        assert_eq!(forest.name, "Forest");
        assert_eq!(
            forest.shape,
            Shape::ArrayOf(Box::new(Shape::Recursive("Forest".into())))
        );
    }

    #[test]
    fn mutual_recursion_is_truncated() {
        let doc = json!({
            "components": { "schemas": {
                "A": { "type": "object", "properties": { "b": { "$ref": "#/components/schemas/B" } } },
                "B": { "type": "object", "properties": { "a": { "$ref": "#/components/schemas/A" } } }
            } }
        });
        let resolver = Resolver::new(&doc);
        let fragment = resolver.resolve(&json!({ "$ref": "#/components/schemas/A" }));
        let shape = Synthesizer::with_resolver(resolver).synthesize(&fragment).unwrap();

        let b = component_of(&shape.object_model().unwrap().field("b").unwrap().shape);
        let a = b.shape.object_model().unwrap().field("a").unwrap();
        assert_eq!(a.shape, Shape::Recursive("A".into()));
    }
}
