//! Reference resolution - inlines `#/components/...` pointers one level deep.
//!
//! Every string that starts with `#/components` is replaced by a reference pair
//! `{"name": <component name>, "schema": <component fragment>}`. The fragment inside
//! a pair is left as written in the document: self-referential components would
//! otherwise expand forever. Deeper expansion happens on demand in the synthesizer,
//! which tracks the components it is currently expanding.

use serde_json::{Map, Value};

use crate::types::COMPONENT_REF_PREFIX;

/// Resolve every reference pointer in a whole document against itself.
pub fn resolve(document: &Value) -> Value {
    Resolver::new(document).resolve(document)
}

/// Resolves reference pointers against one document's `components.schemas` table.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    schemas: Option<&'a Map<String, Value>>,
}

impl<'a> Resolver<'a> {
    pub fn new(document: &'a Value) -> Self {
        let schemas = document
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(Value::as_object);
        Self { schemas }
    }

    /// Look up a component schema by name.
    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        self.schemas.and_then(|schemas| schemas.get(name))
    }

    /// Resolve the pointers in `fragment`, one level deep.
    ///
    /// Reference pairs already present in `fragment` are kept as they are, so
    /// resolving an already resolved tree is a no-op.
    pub fn resolve(&self, fragment: &Value) -> Value {
        self.resolve_value(fragment)
    }

    /// Build the reference pair for a pointer string.
    ///
    /// A pointer naming a missing component yields a `null` schema.
    pub fn dereference(&self, pointer: &str) -> Value {
        let name = reference_name(pointer);
        let schema = match self.lookup(&name) {
            Some(schema) => schema.clone(),
            None => {
                tracing::debug!("unresolved reference {}: no component named '{}'", pointer, name);
                Value::Null
            }
        };

        let mut pair = Map::new();
        pair.insert("name".to_string(), Value::String(name));
        pair.insert("schema".to_string(), schema);
        Value::Object(pair)
    }

    fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => self.resolve_object(map),
            Value::Array(arr) => self.resolve_array(arr),
            Value::String(s) if is_reference(s) => self.dereference(s),
            // Other primitives pass through unchanged
            other => other.clone(),
        }
    }

    fn resolve_object(&self, map: &Map<String, Value>) -> Value {
        if self.is_resolved_pair(map) {
            return Value::Object(map.clone());
        }

        let mut result = Map::new();
        for (key, value) in map {
            result.insert(key.clone(), self.resolve_value(value));
        }
        Value::Object(result)
    }

    /// A pair as [`Resolver::dereference`] builds it: its schema is the named
    /// component, or `null` when there is no such component. Other maps with
    /// `name`/`schema` keys are ordinary data and get resolved.
    fn is_resolved_pair(&self, map: &Map<String, Value>) -> bool {
        let Some((name, schema)) = pair_parts(map) else {
            return false;
        };
        match self.lookup(name) {
            Some(component) => same_fragment(schema, component),
            None => schema.is_null(),
        }
    }

    fn resolve_array(&self, arr: &[Value]) -> Value {
        Value::Array(arr.iter().map(|item| self.resolve_value(item)).collect())
    }
}

/// Check if a string is a component reference pointer.
pub fn is_reference(s: &str) -> bool {
    s.starts_with(COMPONENT_REF_PREFIX)
}

/// The component name a pointer refers to: its last segment, JSON-Pointer decoded.
pub fn reference_name(pointer: &str) -> String {
    let segment = pointer.rsplit('/').next().unwrap_or(pointer);
    // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
    segment.replace("~1", "/").replace("~0", "~")
}

/// Split a reference pair into its name and schema.
pub fn as_reference_pair(value: &Value) -> Option<(&str, &Value)> {
    pair_parts(value.as_object()?)
}

/// Structural equality where a pointer and a pair naming the same component
/// match, so a component table that was itself resolved still compares equal.
fn same_fragment(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(pointer), other) | (other, Value::String(pointer))
            if is_reference(pointer) && !other.is_string() =>
        {
            as_reference_pair(other).map_or(false, |(name, _)| name == reference_name(pointer))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, v)| y.get(key).map_or(false, |w| same_fragment(v, w)))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(v, w)| same_fragment(v, w))
        }
        _ => a == b,
    }
}

fn pair_parts(map: &Map<String, Value>) -> Option<(&str, &Value)> {
    if map.len() != 2 {
        return None;
    }
    let name = map.get("name")?.as_str()?;
    let schema = map.get("schema").filter(|s| s.is_object() || s.is_null())?;
    Some((name, schema))
}
