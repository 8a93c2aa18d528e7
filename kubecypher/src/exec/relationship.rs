// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relationship rules between resource kinds
//!
//! An edge in a pattern only names a relationship type; which documents are
//! actually linked is decided by the rule configured for the pair of kinds
//! at its endpoints. Rules are plain configuration data and can be loaded
//! from JSON alongside the rest of [`ExecutorConfig`](super::config::ExecutorConfig).

use crate::exec::field_path::{FieldPath, FieldPathError};
use crate::exec::selector::scalar_text;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a parent document is linked to a child document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Linkage {
    /// The child lists the parent in `metadata.ownerReferences`
    OwnerReference,
    /// Every key/value of the map at `selector_path` in the parent is a
    /// label of the child
    LabelSelector { selector_path: String },
    /// Some value at `parent_path` equals some value at `child_path`
    FieldReference {
        parent_path: String,
        child_path: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRule {
    pub parent: String,
    pub child: String,
    pub linkage: Linkage,
}

impl RelationshipRule {
    pub fn new(parent: impl Into<String>, child: impl Into<String>, linkage: Linkage) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            linkage,
        }
    }

    /// Whether `parent` and `child` are linked by this rule
    pub fn links(&self, parent: &Value, child: &Value) -> bool {
        if let (Some(a), Some(b)) = (namespace_of(parent), namespace_of(child)) {
            if a != b {
                return false;
            }
        }

        match &self.linkage {
            Linkage::OwnerReference => owned_by(child, parent),
            Linkage::LabelSelector { selector_path } => {
                let Ok(path) = FieldPath::parse(selector_path) else {
                    return false;
                };
                let Some(selector) = path.first(parent).and_then(Value::as_object) else {
                    return false;
                };
                if selector.is_empty() {
                    return false;
                }
                let labels = child.pointer("/metadata/labels");
                selector.iter().all(|(key, value)| {
                    labels.and_then(|l| l.get(key)) == Some(value)
                })
            }
            Linkage::FieldReference {
                parent_path,
                child_path,
            } => {
                let (Ok(parent_path), Ok(child_path)) =
                    (FieldPath::parse(parent_path), FieldPath::parse(child_path))
                else {
                    return false;
                };
                let wanted: Vec<String> = parent_path
                    .resolve(parent)
                    .into_iter()
                    .map(scalar_text)
                    .collect();
                child_path
                    .resolve(child)
                    .into_iter()
                    .any(|v| wanted.contains(&scalar_text(v)))
            }
        }
    }

    fn validate(&self) -> Result<(), FieldPathError> {
        match &self.linkage {
            Linkage::OwnerReference => Ok(()),
            Linkage::LabelSelector { selector_path } => FieldPath::parse(selector_path).map(|_| ()),
            Linkage::FieldReference {
                parent_path,
                child_path,
            } => {
                FieldPath::parse(parent_path)?;
                FieldPath::parse(child_path).map(|_| ())
            }
        }
    }
}

/// Ordered rule list. The first rule matching a pair of kinds applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipRules {
    rules: Vec<RelationshipRule>,
}

impl Default for RelationshipRules {
    fn default() -> Self {
        use Linkage::*;
        Self {
            rules: vec![
                RelationshipRule::new("Deployment", "ReplicaSet", OwnerReference),
                RelationshipRule::new("ReplicaSet", "Pod", OwnerReference),
                RelationshipRule::new("StatefulSet", "Pod", OwnerReference),
                RelationshipRule::new("DaemonSet", "Pod", OwnerReference),
                RelationshipRule::new("Job", "Pod", OwnerReference),
                RelationshipRule::new("CronJob", "Job", OwnerReference),
                RelationshipRule::new(
                    "Service",
                    "Pod",
                    LabelSelector {
                        selector_path: "spec.selector".to_string(),
                    },
                ),
                RelationshipRule::new(
                    "Ingress",
                    "Service",
                    FieldReference {
                        parent_path: "spec.rules[*].http.paths[*].backend.service.name"
                            .to_string(),
                        child_path: "metadata.name".to_string(),
                    },
                ),
            ],
        }
    }
}

impl RelationshipRules {
    pub fn new(rules: Vec<RelationshipRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[RelationshipRule] {
        &self.rules
    }

    /// Add a rule ahead of the existing ones
    pub fn prepend(&mut self, rule: RelationshipRule) {
        self.rules.insert(0, rule);
    }

    /// Rule for an unordered pair of kinds. The flag is true when `a` plays
    /// the parent role.
    pub fn find(&self, a: &str, b: &str) -> Option<(&RelationshipRule, bool)> {
        self.rules.iter().find_map(|rule| {
            if rule.parent.eq_ignore_ascii_case(a) && rule.child.eq_ignore_ascii_case(b) {
                Some((rule, true))
            } else if rule.parent.eq_ignore_ascii_case(b) && rule.child.eq_ignore_ascii_case(a) {
                Some((rule, false))
            } else {
                None
            }
        })
    }

    pub fn validate(&self) -> Result<(), FieldPathError> {
        self.rules.iter().try_for_each(RelationshipRule::validate)
    }
}

fn namespace_of(document: &Value) -> Option<&str> {
    document.pointer("/metadata/namespace").and_then(Value::as_str)
}

fn owned_by(child: &Value, parent: &Value) -> bool {
    let Some(references) = child
        .pointer("/metadata/ownerReferences")
        .and_then(Value::as_array)
    else {
        return false;
    };
    let parent_uid = parent.pointer("/metadata/uid").and_then(Value::as_str);
    let parent_kind = parent.get("kind").and_then(Value::as_str);
    let parent_name = parent.pointer("/metadata/name").and_then(Value::as_str);

    references.iter().any(|reference| match parent_uid {
        Some(uid) => reference.get("uid").and_then(Value::as_str) == Some(uid),
        None => {
            parent_name.is_some()
                && reference.get("kind").and_then(Value::as_str) == parent_kind
                && reference.get("name").and_then(Value::as_str) == parent_name
        }
    })
}
