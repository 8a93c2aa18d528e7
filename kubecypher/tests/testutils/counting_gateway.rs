//! Gateway double that records how many calls overlap

use async_trait::async_trait;
use kubecypher::gateway::memory::InMemoryGateway;
use kubecypher::gateway::{ApiGateway, ApiResourceList, GatewayResult, GroupVersionResource, ListParams};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Delegates to an [`InMemoryGateway`], holding every call open for `delay`
/// and tracking the peak number of calls in flight
pub struct CountingGateway {
    inner: InMemoryGateway,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CountingGateway {
    pub fn new(inner: InMemoryGateway, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryGateway {
        &self.inner
    }

    async fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);
        tokio::time::sleep(self.delay).await;
        guard
    }
}

#[async_trait]
impl ApiGateway for CountingGateway {
    async fn discover(&self) -> GatewayResult<Vec<ApiResourceList>> {
        let _guard = self.enter().await;
        self.inner.discover().await
    }

    async fn list(
        &self,
        resource: &GroupVersionResource,
        params: &ListParams,
    ) -> GatewayResult<Vec<Value>> {
        let _guard = self.enter().await;
        self.inner.list(resource, params).await
    }

    async fn create(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        document: Value,
    ) -> GatewayResult<Value> {
        let _guard = self.enter().await;
        self.inner.create(resource, namespace, document).await
    }

    async fn update(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        document: Value,
    ) -> GatewayResult<Value> {
        let _guard = self.enter().await;
        self.inner.update(resource, namespace, document).await
    }

    async fn delete(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        name: &str,
    ) -> GatewayResult<()> {
        let _guard = self.enter().await;
        self.inner.delete(resource, namespace, name).await
    }
}
