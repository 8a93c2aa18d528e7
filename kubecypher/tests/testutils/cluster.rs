//! Cluster documents for fixtures
//!
//! The sample cluster:
//! - default: Deployment web → ReplicaSet web-7d4 → Pods web-7d4-a, web-7d4-b;
//!   Deployment api → ReplicaSet api-5f9 → Pod api-5f9-a;
//!   StatefulSet db → Pod db-0; Services web, api and orphan; Ingress main → web
//! - staging: Deployment web
//! - cluster scoped: Node node-1

use serde_json::{json, Value};

pub fn deployment(namespace: &str, name: &str, uid: &str, app: &str, replicas: i64) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": uid,
            "labels": {"app": app}
        },
        "spec": {
            "replicas": replicas,
            "selector": {"matchLabels": {"app": app}}
        }
    })
}

pub fn replica_set(namespace: &str, name: &str, uid: &str, owner: (&str, &str)) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "ReplicaSet",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": uid,
            "ownerReferences": [{"kind": "Deployment", "name": owner.0, "uid": owner.1}]
        }
    })
}

pub fn stateful_set(namespace: &str, name: &str, uid: &str) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "StatefulSet",
        "metadata": {"name": name, "namespace": namespace, "uid": uid}
    })
}

/// Pod owned by `owner` = (kind, name, uid)
pub fn pod(
    namespace: &str,
    name: &str,
    app: &str,
    owner: (&str, &str, &str),
    phase: &str,
    node: &str,
) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": {"app": app},
            "ownerReferences": [{"kind": owner.0, "name": owner.1, "uid": owner.2}]
        },
        "spec": {
            "nodeName": node,
            "containers": [
                {"name": app, "image": format!("registry.local/{}:1.0", app)},
                {"name": "sidecar", "image": "registry.local/proxy:2.1"}
            ]
        },
        "status": {"phase": phase}
    })
}

pub fn service(namespace: &str, name: &str, app: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {"name": name, "namespace": namespace},
        "spec": {"selector": {"app": app}, "ports": [{"port": 80}]}
    })
}

pub fn ingress(namespace: &str, name: &str, backends: &[&str]) -> Value {
    let paths: Vec<Value> = backends
        .iter()
        .map(|b| json!({"path": format!("/{}", b), "backend": {"service": {"name": b}}}))
        .collect();
    json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": {"name": name, "namespace": namespace},
        "spec": {"rules": [{"http": {"paths": paths}}]}
    })
}

pub fn node(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Node",
        "metadata": {"name": name, "labels": {"kubernetes.io/hostname": name}}
    })
}

pub fn sample_cluster() -> Vec<Value> {
    vec![
        deployment("default", "web", "d-web", "web", 2),
        replica_set("default", "web-7d4", "rs-web", ("web", "d-web")),
        pod("default", "web-7d4-a", "web", ("ReplicaSet", "web-7d4", "rs-web"), "Running", "node-1"),
        pod("default", "web-7d4-b", "web", ("ReplicaSet", "web-7d4", "rs-web"), "Running", "node-1"),
        deployment("default", "api", "d-api", "api", 1),
        replica_set("default", "api-5f9", "rs-api", ("api", "d-api")),
        pod("default", "api-5f9-a", "api", ("ReplicaSet", "api-5f9", "rs-api"), "Pending", ""),
        stateful_set("default", "db", "sts-db"),
        pod("default", "db-0", "db", ("StatefulSet", "db", "sts-db"), "Running", "node-1"),
        service("default", "web", "web"),
        service("default", "api", "api"),
        service("default", "orphan", "none"),
        ingress("default", "main", &["web"]),
        deployment("staging", "web", "d-web-staging", "web", 1),
        node("node-1"),
    ]
}
