//! Synthesized model shapes.
//!
//! A [`Shape`] describes what a JSON payload must look like. It is built from a
//! resolved schema fragment by the synthesizer and interpreted at validation time,
//! either directly (default filling) or through its JSON Schema rendering.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Model name used for inline object schemas that carry no reference name.
pub const DYNAMIC_MODEL_NAME: &str = "DynamicModel";

/// Leaf value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    /// `type: string` with `format: date-time`.
    DateTime,
    /// Unknown or missing `type`; accepts any value.
    Any,
}

impl ScalarKind {
    /// Map a JSON Schema `type`/`format` pair to a scalar kind.
    ///
    /// Returns `None` for the composite types (`object`, `array`).
    pub fn from_json_type(json_type: Option<&str>, format: Option<&str>) -> Option<Self> {
        match json_type {
            Some("string") if format == Some("date-time") => Some(ScalarKind::DateTime),
            Some("string") => Some(ScalarKind::String),
            Some("integer") => Some(ScalarKind::Integer),
            Some("number") => Some(ScalarKind::Number),
            Some("boolean") => Some(ScalarKind::Boolean),
            Some("object") | Some("array") => None,
            _ => Some(ScalarKind::Any),
        }
    }

    fn to_json_schema(self) -> Value {
        match self {
            ScalarKind::String => json!({ "type": "string" }),
            ScalarKind::Integer => json!({ "type": "integer" }),
            ScalarKind::Number => json!({ "type": "number" }),
            ScalarKind::Boolean => json!({ "type": "boolean" }),
            ScalarKind::DateTime => json!({ "type": "string", "format": "date-time" }),
            ScalarKind::Any => json!({}),
        }
    }
}

/// Schema description of a payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum Shape {
    Scalar(ScalarKind),
    Object(ObjectModel),
    ArrayOf(Box<Shape>),
    /// A named component. Every reference to the same component shares one
    /// expansion; serialized as the component name.
    #[serde(serialize_with = "component_name")]
    Component(Arc<Component>),
    /// A component reference that was not expanded because it is already being
    /// expanded further up, or the expansion got too deep. It stands for the
    /// component's own shape when that is defined elsewhere in the tree, and
    /// accepts anything otherwise.
    Recursive(String),
}

/// A named component shape from `components.schemas`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub name: String,
    pub shape: Shape,
}

/// A named object model with its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectModel {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

/// One property of an object model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub shape: Shape,
    pub required: bool,
    /// Optional fields also accept `null`.
    pub nullable: bool,
    /// `None` means the caller must supply a value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// A shape with every component it refers to listed once.
#[derive(Debug, Serialize)]
pub struct ShapeDocument<'a> {
    pub root: &'a Shape,
    pub definitions: Vec<&'a Component>,
}

type Definitions<'a> = HashMap<&'a str, &'a Component>;

impl ObjectModel {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the fields that must be present in a payload.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required && f.default.is_none())
            .map(|f| f.name.as_str())
    }
}

impl Shape {
    /// The object model at the top of this shape, looking through arrays and
    /// components.
    pub fn object_model(&self) -> Option<&ObjectModel> {
        match self {
            Shape::Object(model) => Some(model),
            Shape::ArrayOf(inner) => inner.object_model(),
            Shape::Component(component) => component.shape.object_model(),
            _ => None,
        }
    }

    /// Components reachable from this shape, each once, in first-seen order.
    pub fn definitions(&self) -> Vec<&Component> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_definitions(&mut seen, &mut out);
        out
    }

    fn collect_definitions<'s>(
        &'s self,
        seen: &mut HashSet<&'s str>,
        out: &mut Vec<&'s Component>,
    ) {
        match self {
            Shape::Object(model) => {
                for field in &model.fields {
                    field.shape.collect_definitions(seen, out);
                }
            }
            Shape::ArrayOf(inner) => inner.collect_definitions(seen, out),
            Shape::Component(component) => {
                if seen.insert(component.name.as_str()) {
                    out.push(component);
                    component.shape.collect_definitions(seen, out);
                }
            }
            Shape::Scalar(_) | Shape::Recursive(_) => {}
        }
    }

    /// The shape plus its component table, for serialization.
    pub fn document(&self) -> ShapeDocument<'_> {
        ShapeDocument {
            root: self,
            definitions: self.definitions(),
        }
    }

    /// Render as a JSON Schema (draft 2020-12 compatible) document.
    ///
    /// Components are emitted once under `$defs` and referenced with `$ref`, so
    /// the output grows with the number of distinct components rather than the
    /// number of paths through them.
    pub fn to_json_schema(&self) -> Value {
        let definitions = self.definitions();
        let table: Definitions<'_> = definitions
            .iter()
            .map(|component| (component.name.as_str(), *component))
            .collect();

        let mut schema = self.render(&table);
        if definitions.is_empty() {
            return schema;
        }

        let mut defs = Map::new();
        for component in &definitions {
            let body = if is_alias_cycle(component, &table) {
                json!({})
            } else {
                component.shape.render(&table)
            };
            defs.insert(component.name.clone(), body);
        }
        if let Value::Object(map) = &mut schema {
            map.insert("$defs".into(), Value::Object(defs));
        }
        schema
    }

    fn render(&self, table: &Definitions<'_>) -> Value {
        match self {
            Shape::Scalar(kind) => kind.to_json_schema(),
            Shape::Object(model) => {
                let mut properties = Map::new();
                for field in &model.fields {
                    properties.insert(field.name.clone(), field.render(table));
                }
                let required: Vec<Value> = model
                    .required_fields()
                    .map(|name| Value::String(name.to_string()))
                    .collect();

                let mut schema = Map::new();
                schema.insert("type".into(), json!("object"));
                schema.insert("title".into(), json!(model.name));
                schema.insert("properties".into(), Value::Object(properties));
                if !required.is_empty() {
                    schema.insert("required".into(), Value::Array(required));
                }
                Value::Object(schema)
            }
            Shape::ArrayOf(inner) => json!({
                "type": "array",
                "items": inner.render(table),
            }),
            Shape::Component(component) => definition_ref(&component.name),
            Shape::Recursive(name) if table.contains_key(name.as_str()) => definition_ref(name),
            // Cut off before its component was ever expanded
            Shape::Recursive(_) => json!({}),
        }
    }

    /// Insert declared defaults for absent fields, recursing into present ones.
    ///
    /// Values that do not match the shape are left untouched; validation reports them.
    pub fn apply_defaults(&self, value: &mut Value) {
        let table: Definitions<'_> = self
            .definitions()
            .into_iter()
            .map(|component| (component.name.as_str(), component))
            .collect();
        self.fill_defaults(value, &table, 0);
    }

    // `hops` counts component indirections taken without descending into the
    // value; it bounds alias cycles.
    fn fill_defaults(&self, value: &mut Value, table: &Definitions<'_>, hops: usize) {
        if hops > table.len() {
            return;
        }
        match (self, value) {
            (Shape::Object(model), Value::Object(map)) => {
                for field in &model.fields {
                    match map.get_mut(&field.name) {
                        Some(child) => field.shape.fill_defaults(child, table, 0),
                        None => {
                            if let Some(default) = &field.default {
                                map.insert(field.name.clone(), default.clone());
                            }
                        }
                    }
                }
            }
            (Shape::ArrayOf(inner), Value::Array(items)) => {
                for item in items {
                    inner.fill_defaults(item, table, 0);
                }
            }
            (Shape::Component(component), value) => {
                component.shape.fill_defaults(value, table, hops + 1);
            }
            (Shape::Recursive(name), value) => {
                if let Some(component) = table.get(name.as_str()) {
                    component.shape.fill_defaults(value, table, hops + 1);
                }
            }
            _ => {}
        }
    }
}

impl FieldSpec {
    fn render(&self, table: &Definitions<'_>) -> Value {
        let mut schema = self.shape.render(table);
        if self.nullable {
            schema = or_null(schema);
        }
        let Value::Object(map) = &mut schema else {
            return schema;
        };

        if let Some(description) = &self.description {
            map.insert("description".into(), json!(description));
        }
        if let Some(example) = &self.example {
            map.insert("examples".into(), json!([example]));
        }
        if let Some(default) = &self.default {
            map.insert("default".into(), default.clone());
        }
        schema
    }
}

/// Widen a rendered schema to also accept `null`.
fn or_null(mut schema: Value) -> Value {
    let ty = schema.get("type").and_then(Value::as_str).map(str::to_owned);
    match ty {
        Some(ty) => {
            schema["type"] = json!([ty, "null"]);
            schema
        }
        None if schema.get("$ref").is_some() => json!({ "anyOf": [schema, { "type": "null" }] }),
        None => schema,
    }
}

fn definition_ref(name: &str) -> Value {
    // JSON Pointer escaping (~ = ~0, / = ~1)
    let escaped = name.replace('~', "~0").replace('/', "~1");
    json!({ "$ref": format!("#/$defs/{}", escaped) })
}

/// True when a component only forwards to other components and ends up back at
/// itself without any structure in between.
fn is_alias_cycle(component: &Component, table: &Definitions<'_>) -> bool {
    let mut current = &component.shape;
    for _ in 0..=table.len() {
        let next = match current {
            Shape::Component(c) => c.name.as_str(),
            Shape::Recursive(name) => name.as_str(),
            _ => return false,
        };
        if next == component.name {
            return true;
        }
        match table.get(next) {
            Some(c) => current = &c.shape,
            None => return false,
        }
    }
    false
}

fn component_name<S: Serializer>(
    component: &Arc<Component>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&component.name)
}

/// Serialize a shape as a [`ShapeDocument`].
pub(crate) fn serialize_document<S: Serializer>(
    shape: &Shape,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    shape.document().serialize(serializer)
}
