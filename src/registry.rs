//! In-memory registry of extracted operations, keyed by operation id.

use std::collections::HashMap;

use serde_json::Value;

use crate::extractor::extract_operations;
use crate::tool::ToolDefinition;
use crate::types::{ExtractOptions, OperationDescriptor};

/// Read-only collection of operations, built once from a document.
///
/// Keeps document order. When two operations share an id the first one wins and
/// the later one is dropped with a warning.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: Vec<OperationDescriptor>,
    index: HashMap<String, usize>,
}

impl OperationRegistry {
    /// Extract and register the tagged operations of `document`.
    pub fn from_document(document: &Value, options: &ExtractOptions) -> Self {
        let registry: Self = extract_operations(document, options).into_iter().collect();
        tracing::info!(
            "registered {} operation(s) tagged '{}'",
            registry.len(),
            options.tag
        );
        registry
    }

    pub fn get(&self, operation_id: &str) -> Option<&OperationDescriptor> {
        self.index.get(operation_id).map(|&i| &self.operations[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Tool definitions for every registered operation, in order.
    pub fn tools(&self) -> Vec<ToolDefinition> {
        self.operations.iter().map(ToolDefinition::from_operation).collect()
    }

    fn insert(&mut self, operation: OperationDescriptor) {
        if self.index.contains_key(&operation.operation_id) {
            tracing::warn!(
                "duplicate operation id '{}' ({} {}), keeping the first",
                operation.operation_id,
                operation.method,
                operation.url
            );
            return;
        }
        self.index
            .insert(operation.operation_id.clone(), self.operations.len());
        self.operations.push(operation);
    }
}

impl FromIterator<OperationDescriptor> for OperationRegistry {
    fn from_iter<I: IntoIterator<Item = OperationDescriptor>>(iter: I) -> Self {
        let mut registry = Self::default();
        for operation in iter {
            registry.insert(operation);
        }
        registry
    }
}
