// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Boundary with the platform API
//!
//! The core never talks to a cluster directly. Everything it needs (kind
//! discovery and list/create/update/delete per resource) goes through an
//! [`ApiGateway`]. [`memory::InMemoryGateway`] implements it over a JSON
//! snapshot.

pub mod memory;

use crate::exec::selector::Selector;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors reported by a gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Dispatch worker stopped")]
    WorkerStopped,
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Group/version/resource triple identifying a resource kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// `apps/v1`, or just `v1` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.resource)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.resource)
        }
    }
}

/// One entry of the discovery catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    /// Plural resource name, e.g. `deployments`
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub short_names: Vec<String>,
    #[serde(default = "default_namespaced")]
    pub namespaced: bool,
}

fn default_namespaced() -> bool {
    true
}

/// Resources served under one group/version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceList {
    pub group_version: String,
    pub resources: Vec<ApiResource>,
}

/// Parameters of a list call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    /// `None` lists across all namespaces
    pub namespace: Option<String>,
    pub field_selector: Selector,
    pub label_selector: Selector,
}

impl ListParams {
    pub fn in_namespace(namespace: Option<String>) -> Self {
        Self {
            namespace,
            ..Self::default()
        }
    }
}

/// Operations the core needs from the platform
#[async_trait]
pub trait ApiGateway: Send + Sync {
    /// Enumerate every served resource kind, in the platform's own order
    async fn discover(&self) -> GatewayResult<Vec<ApiResourceList>>;

    /// List documents of one resource matching both selectors
    async fn list(
        &self,
        resource: &GroupVersionResource,
        params: &ListParams,
    ) -> GatewayResult<Vec<Value>>;

    /// Create a document and return it as stored
    async fn create(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        document: Value,
    ) -> GatewayResult<Value>;

    /// Replace an existing document and return it as stored
    async fn update(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        document: Value,
    ) -> GatewayResult<Value>;

    async fn delete(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        name: &str,
    ) -> GatewayResult<()>;
}
