// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Snapshot-backed gateway
//!
//! Serves discovery and objects from a JSON snapshot and applies mutations
//! to its in-memory copy. Every call is recorded so tests can assert on the
//! exact traffic a query produced.

use super::{
    ApiGateway, ApiResource, ApiResourceList, GatewayError, GatewayResult, GroupVersionResource,
    ListParams,
};
use async_trait::async_trait;
use log::debug;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk snapshot layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "standard_discovery")]
    pub discovery: Vec<ApiResourceList>,
    #[serde(default)]
    pub objects: Vec<Value>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            discovery: standard_discovery(),
            objects: Vec::new(),
        }
    }
}

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Discover,
    List {
        resource: GroupVersionResource,
        namespace: Option<String>,
        field_selector: String,
        label_selector: String,
    },
    Create {
        resource: GroupVersionResource,
        namespace: Option<String>,
        name: String,
    },
    Update {
        resource: GroupVersionResource,
        namespace: Option<String>,
        name: String,
    },
    Delete {
        resource: GroupVersionResource,
        namespace: Option<String>,
        name: String,
    },
}

impl GatewayCall {
    pub fn is_discover(&self) -> bool {
        matches!(self, GatewayCall::Discover)
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, GatewayCall::Delete { .. })
    }
}

pub struct InMemoryGateway {
    discovery: Vec<ApiResourceList>,
    objects: RwLock<Vec<Value>>,
    calls: Mutex<Vec<GatewayCall>>,
    list_failure: Mutex<Option<GatewayError>>,
}

impl InMemoryGateway {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            discovery: snapshot.discovery,
            objects: RwLock::new(snapshot.objects),
            calls: Mutex::new(Vec::new()),
            list_failure: Mutex::new(None),
        }
    }

    /// Standard discovery and the given objects
    pub fn with_objects(objects: Vec<Value>) -> Self {
        Self::new(Snapshot {
            objects,
            ..Snapshot::default()
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, SnapshotError> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Current contents, in insertion order
    pub fn objects(&self) -> Vec<Value> {
        self.objects.read().clone()
    }

    pub fn insert(&self, document: Value) {
        self.objects.write().push(document);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Make every following list call fail with `error`, or succeed again
    /// with `None`
    pub fn fail_lists_with(&self, error: Option<GatewayError>) {
        *self.list_failure.lock() = error;
    }

    fn record(&self, call: GatewayCall) {
        debug!("gateway call: {:?}", call);
        self.calls.lock().push(call);
    }

    fn lookup(&self, resource: &GroupVersionResource) -> GatewayResult<&ApiResource> {
        let group_version = resource.api_version();
        self.discovery
            .iter()
            .filter(|list| list.group_version == group_version)
            .flat_map(|list| list.resources.iter())
            .find(|r| r.name == resource.resource)
            .ok_or_else(|| {
                GatewayError::NotFound(format!("the server could not find resource {}", resource))
            })
    }

    fn position(
        objects: &[Value],
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<usize> {
        objects.iter().position(|o| {
            is_instance(o, api_version, kind)
                && object_namespace(o) == namespace
                && object_name(o) == Some(name)
        })
    }
}

#[async_trait]
impl ApiGateway for InMemoryGateway {
    async fn discover(&self) -> GatewayResult<Vec<ApiResourceList>> {
        self.record(GatewayCall::Discover);
        Ok(self.discovery.clone())
    }

    async fn list(
        &self,
        resource: &GroupVersionResource,
        params: &ListParams,
    ) -> GatewayResult<Vec<Value>> {
        self.record(GatewayCall::List {
            resource: resource.clone(),
            namespace: params.namespace.clone(),
            field_selector: params.field_selector.to_string(),
            label_selector: params.label_selector.to_string(),
        });
        if let Some(error) = self.list_failure.lock().clone() {
            return Err(error);
        }

        let api_resource = self.lookup(resource)?;
        let api_version = resource.api_version();
        let objects = self.objects.read();
        Ok(objects
            .iter()
            .filter(|o| is_instance(o, &api_version, &api_resource.kind))
            .filter(|o| match &params.namespace {
                Some(ns) if api_resource.namespaced => object_namespace(o) == Some(ns.as_str()),
                _ => true,
            })
            .filter(|o| params.field_selector.matches_fields(o))
            .filter(|o| params.label_selector.matches_labels(o))
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        document: Value,
    ) -> GatewayResult<Value> {
        let name = object_name(&document)
            .ok_or_else(|| GatewayError::Invalid("metadata.name is required".to_string()))?
            .to_string();
        self.record(GatewayCall::Create {
            resource: resource.clone(),
            namespace: namespace.map(str::to_string),
            name: name.clone(),
        });

        let api_resource = self.lookup(resource)?;
        let api_version = resource.api_version();
        let namespace = namespace.filter(|_| api_resource.namespaced);

        let mut document = document;
        let metadata = metadata_mut(&mut document)?;
        if let Some(ns) = namespace {
            metadata.insert("namespace".to_string(), Value::String(ns.to_string()));
        }
        metadata
            .entry("uid")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));

        let mut objects = self.objects.write();
        if Self::position(&objects, &api_version, &api_resource.kind, namespace, &name).is_some() {
            return Err(GatewayError::AlreadyExists(format!(
                "{} \"{}\" already exists",
                resource.resource, name
            )));
        }
        objects.push(document.clone());
        Ok(document)
    }

    async fn update(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        document: Value,
    ) -> GatewayResult<Value> {
        let name = object_name(&document)
            .ok_or_else(|| GatewayError::Invalid("metadata.name is required".to_string()))?
            .to_string();
        self.record(GatewayCall::Update {
            resource: resource.clone(),
            namespace: namespace.map(str::to_string),
            name: name.clone(),
        });

        let api_resource = self.lookup(resource)?;
        let api_version = resource.api_version();
        let namespace = namespace.filter(|_| api_resource.namespaced);

        let mut objects = self.objects.write();
        let index = Self::position(&objects, &api_version, &api_resource.kind, namespace, &name)
            .ok_or_else(|| {
                GatewayError::NotFound(format!("{} \"{}\" not found", resource.resource, name))
            })?;
        let mut document = document;
        if let Some(uid) = objects[index].pointer("/metadata/uid").cloned() {
            metadata_mut(&mut document)?.insert("uid".to_string(), uid);
        }
        objects[index] = document.clone();
        Ok(document)
    }

    async fn delete(
        &self,
        resource: &GroupVersionResource,
        namespace: Option<&str>,
        name: &str,
    ) -> GatewayResult<()> {
        self.record(GatewayCall::Delete {
            resource: resource.clone(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        });

        let api_resource = self.lookup(resource)?;
        let api_version = resource.api_version();
        let namespace = namespace.filter(|_| api_resource.namespaced);

        let mut objects = self.objects.write();
        let index = Self::position(&objects, &api_version, &api_resource.kind, namespace, name)
            .ok_or_else(|| {
                GatewayError::NotFound(format!("{} \"{}\" not found", resource.resource, name))
            })?;
        objects.remove(index);
        Ok(())
    }
}

fn is_instance(object: &Value, api_version: &str, kind: &str) -> bool {
    object.get("apiVersion").and_then(Value::as_str) == Some(api_version)
        && object.get("kind").and_then(Value::as_str) == Some(kind)
}

fn object_name(object: &Value) -> Option<&str> {
    object.pointer("/metadata/name").and_then(Value::as_str)
}

fn object_namespace(object: &Value) -> Option<&str> {
    object.pointer("/metadata/namespace").and_then(Value::as_str)
}

fn metadata_mut(document: &mut Value) -> GatewayResult<&mut Map<String, Value>> {
    document
        .as_object_mut()
        .and_then(|o| {
            o.entry("metadata")
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
        })
        .ok_or_else(|| GatewayError::Invalid("document must be an object".to_string()))
}

fn resource(name: &str, kind: &str, short_names: &[&str], namespaced: bool) -> ApiResource {
    ApiResource {
        name: name.to_string(),
        kind: kind.to_string(),
        short_names: short_names.iter().map(|s| s.to_string()).collect(),
        namespaced,
    }
}

/// Discovery catalog of the built-in workload and networking kinds
pub fn standard_discovery() -> Vec<ApiResourceList> {
    vec![
        ApiResourceList {
            group_version: "v1".to_string(),
            resources: vec![
                resource("pods", "Pod", &["po"], true),
                resource("services", "Service", &["svc"], true),
                resource("configmaps", "ConfigMap", &["cm"], true),
                resource("secrets", "Secret", &[], true),
                resource("persistentvolumeclaims", "PersistentVolumeClaim", &["pvc"], true),
                resource("serviceaccounts", "ServiceAccount", &["sa"], true),
                resource("namespaces", "Namespace", &["ns"], false),
                resource("nodes", "Node", &["no"], false),
            ],
        },
        ApiResourceList {
            group_version: "apps/v1".to_string(),
            resources: vec![
                resource("deployments", "Deployment", &["deploy"], true),
                resource("replicasets", "ReplicaSet", &["rs"], true),
                resource("statefulsets", "StatefulSet", &["sts"], true),
                resource("daemonsets", "DaemonSet", &["ds"], true),
            ],
        },
        ApiResourceList {
            group_version: "batch/v1".to_string(),
            resources: vec![
                resource("jobs", "Job", &[], true),
                resource("cronjobs", "CronJob", &["cj"], true),
            ],
        },
        ApiResourceList {
            group_version: "networking.k8s.io/v1".to_string(),
            resources: vec![resource("ingresses", "Ingress", &["ing"], true)],
        },
    ]
}
