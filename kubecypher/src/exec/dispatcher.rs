// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Bounded request dispatcher
//!
//! Callers submit gateway operations over a rendezvous channel and await
//! the answer on a per-call oneshot. A single worker task drains the
//! channel and runs each operation while holding a semaphore permit, so at
//! most `pool_size` gateway calls are ever in flight, however many callers
//! submit concurrently. With the default size of 1 every external call is
//! serialized.

use crate::gateway::{
    ApiGateway, ApiResourceList, GatewayError, GatewayResult, GroupVersionResource, ListParams,
};
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};

enum Operation {
    Discover,
    List {
        resource: GroupVersionResource,
        params: ListParams,
    },
    Create {
        resource: GroupVersionResource,
        namespace: Option<String>,
        document: Value,
    },
    Update {
        resource: GroupVersionResource,
        namespace: Option<String>,
        document: Value,
    },
    Delete {
        resource: GroupVersionResource,
        namespace: Option<String>,
        name: String,
    },
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Discover => "discover",
            Operation::List { .. } => "list",
            Operation::Create { .. } => "create",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
        }
    }
}

enum Reply {
    Discovered(Vec<ApiResourceList>),
    Listed(Vec<Value>),
    Stored(Value),
    Deleted,
}

struct Request {
    operation: Operation,
    reply: oneshot::Sender<GatewayResult<Reply>>,
}

/// Handle to the dispatch worker. Cloning shares the same worker and gate;
/// the worker exits once every handle is dropped.
#[derive(Clone)]
pub struct Dispatcher {
    sender: mpsc::Sender<Request>,
    pool_size: usize,
}

impl Dispatcher {
    /// Spawn the worker on the current tokio runtime. A pool size of 0 is
    /// treated as 1.
    pub fn new(gateway: Arc<dyn ApiGateway>, pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        let (sender, receiver) = mpsc::channel(1);
        let gate = Arc::new(Semaphore::new(pool_size));
        tokio::spawn(run_worker(gateway, gate, receiver));
        debug!("dispatcher started with pool size {}", pool_size);
        Self { sender, pool_size }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    async fn submit(&self, operation: Operation) -> GatewayResult<Reply> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Request { operation, reply })
            .await
            .map_err(|_| GatewayError::WorkerStopped)?;
        response.await.map_err(|_| GatewayError::WorkerStopped)?
    }
}

async fn run_worker(
    gateway: Arc<dyn ApiGateway>,
    gate: Arc<Semaphore>,
    mut receiver: mpsc::Receiver<Request>,
) {
    while let Some(request) = receiver.recv().await {
        let Ok(permit) = gate.clone().acquire_owned().await else {
            break;
        };
        let gateway = gateway.clone();
        tokio::spawn(async move {
            let name = request.operation.name();
            let result = perform(gateway.as_ref(), request.operation).await;
            drop(permit);
            if request.reply.send(result).is_err() {
                warn!("caller went away before the {} reply was delivered", name);
            }
        });
    }
    debug!("dispatcher worker stopped");
}

async fn perform(gateway: &dyn ApiGateway, operation: Operation) -> GatewayResult<Reply> {
    match operation {
        Operation::Discover => gateway.discover().await.map(Reply::Discovered),
        Operation::List { resource, params } => {
            gateway.list(&resource, &params).await.map(Reply::Listed)
        }
        Operation::Create {
            resource,
            namespace,
            document,
        } => gateway
            .create(&resource, namespace.as_deref(), document)
            .await
            .map(Reply::Stored),
        Operation::Update {
            resource,
            namespace,
            document,
        } => gateway
            .update(&resource, namespace.as_deref(), document)
            .await
            .map(Reply::Stored),
        Operation::Delete {
            resource,
            namespace,
            name,
        } => gateway
            .delete(&resource, namespace.as_deref(), &name)
            .await
            .map(|_| Reply::Deleted),
    }
}

fn mismatched(operation: &str) -> GatewayError {
    GatewayError::Transport(format!("mismatched reply for {}", operation))
}

#[async_trait]
impl ApiGateway for Dispatcher {
    async fn discover(&self) -> GatewayResult<Vec<ApiResourceList>> {
        match self.submit(Operation::Discover).await? {
            Reply::Discovered(lists) => Ok(lists),
            _ => Err(mismatched("discover")),
        }
    }

    async fn list(
        &self,
        resource: &GroupVersionResource,
        params: &ListParams,
    ) -> GatewayResult<Vec<Value>> {
        let operation = Operation::List {
            resource: resource.clone(),
            params: params.clone(),
        };
        match self.submit(operation).await? {
            Reply::Listed(documents) => Ok(documents),
            _ => Err(mismatched("list")),
        }
    }

    async fn create(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        document: Value,
    ) -> GatewayResult<Value> {
        let operation = Operation::Create {
            resource: resource.clone(),
            namespace: namespace.map(str::to_string),
            document,
        };
        match self.submit(operation).await? {
            Reply::Stored(document) => Ok(document),
            _ => Err(mismatched("create")),
        }
    }

    async fn update(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        document: Value,
    ) -> GatewayResult<Value> {
        let operation = Operation::Update {
            resource: resource.clone(),
            namespace: namespace.map(str::to_string),
            document,
        };
        match self.submit(operation).await? {
            Reply::Stored(document) => Ok(document),
            _ => Err(mismatched("update")),
        }
    }

    async fn delete(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        name: &str,
    ) -> GatewayResult<()> {
        let operation = Operation::Delete {
            resource: resource.clone(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        };
        match self.submit(operation).await? {
            Reply::Deleted => Ok(()),
            _ => Err(mismatched("delete")),
        }
    }
}
