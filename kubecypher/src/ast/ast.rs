// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! AST node definitions for kubecypher queries

use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed query: the pattern graph plus what to do with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub graph: Graph,
    pub clause: Clause,
}

impl Query {
    /// True for CREATE, SET and DELETE
    pub fn is_mutation(&self) -> bool {
        !matches!(self.clause, Clause::Match { .. })
    }
}

/// Clause payload attached to the pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    Match {
        filters: Vec<Filter>,
        /// Raw field paths from RETURN, in order
        projections: Vec<String>,
    },
    Create,
    Set {
        assignments: Vec<Property>,
    },
    Delete,
}

impl Clause {
    pub fn keyword(&self) -> &'static str {
        match self {
            Clause::Match { .. } => "MATCH",
            Clause::Create => "CREATE",
            Clause::Set { .. } => "SET",
            Clause::Delete => "DELETE",
        }
    }
}

/// Literal values accepted in property blocks and filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl Literal {
    /// Text used inside selectors
    pub fn selector_text(&self) -> String {
        match self {
            Literal::String(s) => s.clone(),
            Literal::Integer(n) => n.to_string(),
            Literal::Boolean(b) => b.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Literal::String(s) => serde_json::Value::String(s.clone()),
            Literal::Integer(n) => serde_json::Value::from(*n),
            Literal::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }

    /// Loose comparison against a document value: strings compare as text,
    /// numbers and booleans by value, and a string literal also matches the
    /// textual form of a scalar.
    pub fn matches_json(&self, value: &serde_json::Value) -> bool {
        match (self, value) {
            (Literal::String(s), serde_json::Value::String(v)) => s == v,
            (Literal::Integer(n), serde_json::Value::Number(v)) => v.as_i64() == Some(*n),
            (Literal::Boolean(b), serde_json::Value::Bool(v)) => b == v,
            (lit, serde_json::Value::Number(v)) => lit.selector_text() == v.to_string(),
            (lit, serde_json::Value::Bool(v)) => lit.selector_text() == v.to_string(),
            (Literal::Integer(n), serde_json::Value::String(v)) => n.to_string() == *v,
            (Literal::Boolean(b), serde_json::Value::String(v)) => b.to_string() == *v,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// `key: value` pair from a property block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Literal,
}

impl Property {
    pub fn new(key: impl Into<String>, value: Literal) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Comparison operators available in WHERE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    Equal,
    NotEqual,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOperator::Equal => write!(f, "="),
            FilterOperator::NotEqual => write!(f, "!="),
        }
    }
}

/// `binding.path op value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub path: String,
    pub operator: FilterOperator,
    pub value: Literal,
}
