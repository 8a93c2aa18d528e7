//! Test fixture for kubecypher integration tests
//!
//! Wraps a QueryCoordinator over an InMemoryGateway. Tests go through the
//! public coordinator API and inspect the gateway only to assert on the
//! calls a query produced and the resulting cluster state.

use super::cluster::sample_cluster;
use kubecypher::gateway::memory::{GatewayCall, InMemoryGateway};
use kubecypher::{ExecutionError, ExecutorConfig, QueryCoordinator, QueryResult};
use serde_json::Value;
use std::sync::Arc;

pub struct TestFixture {
    gateway: Arc<InMemoryGateway>,
    coordinator: Arc<QueryCoordinator>,
}

impl TestFixture {
    /// Empty cluster with the standard discovery catalog
    pub fn empty() -> Self {
        Self::with_objects(Vec::new())
    }

    /// The sample cluster from [`sample_cluster`]
    pub fn with_sample_cluster() -> Self {
        Self::with_objects(sample_cluster())
    }

    pub fn with_objects(objects: Vec<Value>) -> Self {
        Self::with_config(objects, ExecutorConfig::default())
    }

    pub fn with_config(objects: Vec<Value>, config: ExecutorConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let gateway = Arc::new(InMemoryGateway::with_objects(objects));
        let coordinator = QueryCoordinator::new(gateway.clone(), config)
            .expect("Failed to create coordinator");
        Self {
            gateway,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &QueryCoordinator {
        &self.coordinator
    }

    pub fn gateway(&self) -> &InMemoryGateway {
        &self.gateway
    }

    /// Execute a query
    pub async fn query(&self, query_text: &str) -> Result<QueryResult, ExecutionError> {
        self.coordinator.process_query(query_text).await
    }

    /// Execute query and assert success
    pub async fn assert_query_succeeds(&self, query: &str) -> QueryResult {
        self.query(query)
            .await
            .unwrap_or_else(|e| panic!("Query failed: {}\nError: {}", query, e))
    }

    /// Execute query and assert failure
    pub async fn assert_query_fails(&self, query: &str, expected_error: &str) -> ExecutionError {
        match self.query(query).await {
            Ok(result) => panic!("Query should have failed: {}\nGot: {:?}", query, result),
            Err(e) => {
                assert!(
                    e.to_string().contains(expected_error),
                    "Expected error containing '{}', got: {}",
                    expected_error,
                    e
                );
                e
            }
        }
    }

    /// Names of the documents under `binding`
    pub async fn names(&self, query: &str, binding: &str) -> Vec<String> {
        let result = self.assert_query_succeeds(query).await;
        result
            .binding(binding)
            .unwrap_or_else(|| panic!("Binding '{}' missing from result of {}", binding, query))
            .iter()
            .map(|d| d["metadata"]["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn count_calls(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        self.gateway.calls().iter().filter(|c| predicate(c)).count()
    }

    pub fn discovery_calls(&self) -> usize {
        self.count_calls(GatewayCall::is_discover)
    }

    pub fn delete_calls(&self) -> usize {
        self.count_calls(GatewayCall::is_delete)
    }
}
