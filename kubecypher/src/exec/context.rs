// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-session execution context

use serde::{Deserialize, Serialize};

/// Namespace scope and verbosity handed to every execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Active namespace; empty means all namespaces
    pub namespace: String,
    pub debug: bool,
}

impl ExecutionContext {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            debug: false,
        }
    }

    pub fn all_namespaces() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The namespace to scope namespaced requests to, if any
    pub fn namespace_scope(&self) -> Option<&str> {
        if self.namespace.is_empty() {
            None
        } else {
            Some(&self.namespace)
        }
    }
}
