// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph data structures shared by parsed patterns and query results
//!
//! A [`Graph`] is an ordered list of pattern nodes and the edges between
//! them. Node ids are `Kind/Name`; adding a node whose id is already present
//! folds it into the existing node instead of creating a duplicate.

use crate::ast::{Literal, Property};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write;
use thiserror::Error;

/// Error types for graph operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid edge: from node {from} to node {to} - one or both nodes don't exist")]
    InvalidEdge { from: String, to: String },
}

/// Pattern node: a binding of some resource kind with optional properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub properties: Vec<Property>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        let name = name.into();
        let kind = kind.into();
        Self {
            id: node_id(&kind, &name),
            kind,
            name,
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: Vec<Property>) -> Self {
        self.properties = properties;
        self
    }

    pub fn property(&self, key: &str) -> Option<&Literal> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| &p.value)
    }
}

/// Build the id of a node from its kind and name
pub fn node_id(kind: &str, name: &str) -> String {
    format!("{}/{}", kind, name)
}

/// Directed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, edge_type: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type: edge_type.into(),
        }
    }
}

/// Ordered nodes and edges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its id. A node with an existing id is merged
    /// into the stored one; properties already present keep their value.
    pub fn add_node(&mut self, node: Node) -> String {
        if let Some(existing) = self.nodes.iter_mut().find(|n| n.id == node.id) {
            for property in node.properties {
                if existing.property(&property.key).is_none() {
                    existing.properties.push(property);
                }
            }
            return existing.id.clone();
        }
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    /// Add an edge between two nodes already in the graph
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if self.node(&edge.from).is_none() || self.node(&edge.to).is_none() {
            return Err(GraphError::InvalidEdge {
                from: edge.from,
                to: edge.to,
            });
        }
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_by_binding(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Binding names in node order
    pub fn bindings(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Result shape: every node is kept, edges survive only when both
    /// endpoints still have matched documents.
    pub fn sanitize<F>(&self, mut has_matches: F) -> Graph
    where
        F: FnMut(&Node) -> bool,
    {
        let live: HashSet<&str> = self
            .nodes
            .iter()
            .filter(|n| has_matches(n))
            .map(|n| n.id.as_str())
            .collect();

        Graph {
            nodes: self.nodes.clone(),
            edges: self
                .edges
                .iter()
                .filter(|e| live.contains(e.from.as_str()) && live.contains(e.to.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Render as a Graphviz document
    pub fn to_dot(&self) -> String {
        let mut out = String::from("graph {\n\trankdir = LR;\n\n");
        let mut drawn: HashSet<&str> = HashSet::new();
        for edge in &self.edges {
            let _ = writeln!(
                out,
                "\t\"{}\" -> \"{}\" [label=\":{}\"];",
                dot_label(&edge.from),
                dot_label(&edge.to),
                edge.edge_type
            );
            drawn.insert(edge.from.as_str());
            drawn.insert(edge.to.as_str());
        }
        for node in &self.nodes {
            if !drawn.contains(node.id.as_str()) {
                let _ = writeln!(out, "\t\"{}\";", dot_label(&node.id));
            }
        }
        out.push('}');
        out
    }
}

fn dot_label(id: &str) -> String {
    match id.split_once('/') {
        Some((kind, name)) => format!("*{}* {}", kind, name),
        None => id.to_string(),
    }
}
