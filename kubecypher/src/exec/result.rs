// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query result types

use crate::exec::error::ExecutionResult;
use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Documents per binding plus the shape of the matched pattern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Binding name → matched, created, updated or deleted documents
    pub bindings: BTreeMap<String, Vec<Value>>,
    /// Pattern nodes, and the edges whose endpoints both kept documents
    pub graph: Graph,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents under `binding`, if the binding is part of the result
    pub fn binding(&self, binding: &str) -> Option<&[Value]> {
        self.bindings.get(binding).map(Vec::as_slice)
    }

    /// Total number of documents across bindings
    pub fn document_count(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.document_count() == 0
    }

    /// Bindings as one JSON object, `{binding: [documents]}`
    pub fn bindings_json(&self) -> ExecutionResult<String> {
        Ok(serde_json::to_string_pretty(&self.bindings)?)
    }

    /// The whole result, graph included
    pub fn to_json(&self) -> ExecutionResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_and_json() {
        let mut result = QueryResult::new();
        assert!(result.is_empty());
        result
            .bindings
            .insert("d".into(), vec![json!({"metadata": {"name": "web"}})]);
        result.bindings.insert("p".into(), vec![]);
        assert_eq!(result.document_count(), 1);
        assert_eq!(result.binding("p"), Some(&[][..]));
        assert_eq!(result.binding("x"), None);

        let parsed: Value = serde_json::from_str(&result.bindings_json().unwrap()).unwrap();
        assert_eq!(parsed, json!({"d": [{"metadata": {"name": "web"}}], "p": []}));

        let full: QueryResult = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(full, result);
    }
}
