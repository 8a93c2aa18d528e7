// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! RETURN projections and document merging

use crate::exec::field_path::FieldPath;
use serde_json::{Map, Value};

/// Reduce a document to the given paths. An empty path list returns the
/// whole document; paths reaching nothing are left out.
pub fn project(document: &Value, paths: &[FieldPath]) -> Value {
    if paths.iter().any(FieldPath::is_empty) {
        return document.clone();
    }
    let mut projected = Value::Object(Map::new());
    for path in paths {
        if let Some(extracted) = path.extract(document) {
            merge_projection(&mut projected, extracted);
        }
    }
    projected
}

/// Merge `patch` into `target`: objects merge key by key, everything else
/// is replaced
pub fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Like [`deep_merge`], but arrays of equal length merge element-wise so
/// several wildcard projections over the same list line up
fn merge_projection(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_projection(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(patch)) if target.len() == patch.len() => {
            for (existing, value) in target.iter_mut().zip(patch) {
                merge_projection(existing, value);
            }
        }
        (target, patch) if !patch.is_null() => *target = patch,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(texts: &[&str]) -> Vec<FieldPath> {
        texts.iter().map(|t| FieldPath::parse(t).unwrap()).collect()
    }

    #[test]
    fn test_project_several_paths() {
        let doc = json!({
            "metadata": {"name": "web", "namespace": "default", "uid": "1"},
            "spec": {"replicas": 2, "paused": false}
        });
        let projected = project(&doc, &paths(&["metadata.name", "spec.replicas", "status.phase"]));
        assert_eq!(
            projected,
            json!({"metadata": {"name": "web"}, "spec": {"replicas": 2}})
        );
    }

    #[test]
    fn test_project_wildcards_line_up() {
        let doc = json!({"spec": {"containers": [
            {"name": "a", "image": "x", "args": []},
            {"name": "b", "image": "y"}
        ]}});
        let projected = project(
            &doc,
            &paths(&["spec.containers[*].name", "spec.containers[*].image"]),
        );
        assert_eq!(
            projected,
            json!({"spec": {"containers": [
                {"name": "a", "image": "x"},
                {"name": "b", "image": "y"}
            ]}})
        );
    }

    #[test]
    fn test_project_nothing_found() {
        assert_eq!(project(&json!({"a": 1}), &paths(&["b"])), json!({}));
    }

    #[test]
    fn test_deep_merge() {
        let mut doc = json!({"metadata": {"name": "web", "labels": {"app": "web"}}, "spec": {"replicas": 1}});
        deep_merge(
            &mut doc,
            json!({"metadata": {"labels": {"tier": "front"}}, "spec": {"replicas": 3}}),
        );
        assert_eq!(
            doc,
            json!({"metadata": {"name": "web", "labels": {"app": "web", "tier": "front"}}, "spec": {"replicas": 3}})
        );

        let mut scalar = json!({"spec": 1});
        deep_merge(&mut scalar, json!({"spec": {"replicas": 2}}));
        assert_eq!(scalar, json!({"spec": {"replicas": 2}}));
    }
}
