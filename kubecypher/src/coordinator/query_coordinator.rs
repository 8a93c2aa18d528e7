// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query Coordinator - Session-level orchestration of parsing and execution

use crate::ast::parser::parse_query;
use crate::catalog::{CatalogResult, ResolvedKind};
use crate::exec::{
    ConfigError, ExecutionContext, ExecutionResult, ExecutorConfig, QueryExecutor, QueryResult,
};
use crate::gateway::ApiGateway;
use log::info;
use parking_lot::RwLock;
use std::sync::Arc;

/// Query Coordinator - Orchestrates query execution for one session
///
/// Handles:
/// - Query parsing
/// - Execution against the configured gateway
/// - The namespace scope and debug flag every query runs with
/// - Resolver cache diagnostics
pub struct QueryCoordinator {
    executor: QueryExecutor,
    context: RwLock<ExecutionContext>,
}

impl QueryCoordinator {
    /// Create a coordinator over `gateway`
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Example
    /// ```no_run
    /// use kubecypher::gateway::memory::InMemoryGateway;
    /// use kubecypher::{ExecutorConfig, QueryCoordinator};
    /// use std::sync::Arc;
    ///
    /// # async fn demo() {
    /// let gateway = Arc::new(InMemoryGateway::from_file("cluster.json").unwrap());
    /// let coordinator = QueryCoordinator::new(gateway, ExecutorConfig::default()).unwrap();
    /// let result = coordinator
    ///     .process_query(r#"MATCH (d:Deployment {name: "web"}) RETURN d.metadata.name"#)
    ///     .await
    ///     .unwrap();
    /// println!("{}", result.bindings_json().unwrap());
    /// # }
    /// ```
    pub fn new(
        gateway: Arc<dyn ApiGateway>,
        config: ExecutorConfig,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let context = ExecutionContext::new(normalize_namespace(&config.namespace))
            .with_debug(config.debug);
        Ok(Arc::new(Self {
            executor: QueryExecutor::new(gateway, &config),
            context: RwLock::new(context),
        }))
    }

    /// Parse and execute one query under the current context
    pub async fn process_query(&self, query_text: &str) -> ExecutionResult<QueryResult> {
        let query = parse_query(query_text)?;
        let context = self.context();
        self.executor.execute(&query, &context).await
    }

    /// `"all"` or an empty string selects all namespaces
    pub fn set_namespace(&self, namespace: &str) {
        let namespace = normalize_namespace(namespace);
        info!(
            "namespace set to {}",
            if namespace.is_empty() { "all" } else { namespace.as_str() }
        );
        self.context.write().namespace = namespace;
    }

    /// Current namespace; empty means all namespaces
    pub fn namespace(&self) -> String {
        self.context.read().namespace.clone()
    }

    pub fn set_debug(&self, debug: bool) {
        self.context.write().debug = debug;
    }

    /// Flip the debug flag and return the new value
    pub fn toggle_debug(&self) -> bool {
        let mut context = self.context.write();
        context.debug = !context.debug;
        context.debug
    }

    pub fn is_debug(&self) -> bool {
        self.context.read().debug
    }

    /// Snapshot of the context the next query will run with
    pub fn context(&self) -> ExecutionContext {
        self.context.read().clone()
    }

    /// Load every kind from one discovery call into the resolver cache
    pub async fn warm_cache(&self) -> CatalogResult<usize> {
        self.executor
            .resolver()
            .warm(self.executor.dispatcher())
            .await
    }

    /// Resolver cache contents, sorted by identifier
    pub fn dump_cache(&self) -> Vec<(String, ResolvedKind)> {
        self.executor.resolver().entries()
    }

    pub fn clear_cache(&self) {
        self.executor.resolver().clear();
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }
}

fn normalize_namespace(namespace: &str) -> String {
    let namespace = namespace.trim();
    if namespace.is_empty() || namespace.eq_ignore_ascii_case("all") {
        String::new()
    } else {
        namespace.to_lowercase()
    }
}
