// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Pretty printer for queries: an indented debug-log tree and a canonical
//! single-line rendering

use log::debug;
use std::fmt::Write;

use crate::ast::ast::*;
use crate::graph::{Graph, Node};

/// Log the query as an indented tree at debug level
pub fn pretty_print_query(query: &Query) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    debug!("Query ({})", query.clause.keyword());
    debug!("{}Pattern", get_indent(1));
    for node in &query.graph.nodes {
        debug!("{}Node {} ({})", get_indent(2), node.name, node.kind);
        for property in &node.properties {
            debug!("{}{} = {}", get_indent(3), property.key, property.value);
        }
    }
    for edge in &query.graph.edges {
        debug!(
            "{}Edge {} -[:{}]-> {}",
            get_indent(2),
            edge.from,
            edge.edge_type,
            edge.to
        );
    }
    match &query.clause {
        Clause::Match {
            filters,
            projections,
        } => {
            if !filters.is_empty() {
                debug!("{}Where", get_indent(1));
                for filter in filters {
                    debug!(
                        "{}{} {} {}",
                        get_indent(2),
                        filter.path,
                        filter.operator,
                        filter.value
                    );
                }
            }
            if !projections.is_empty() {
                debug!("{}Return", get_indent(1));
                for path in projections {
                    debug!("{}{}", get_indent(2), path);
                }
            }
        }
        Clause::Set { assignments } => {
            debug!("{}Assignments", get_indent(1));
            for property in assignments {
                debug!("{}{} = {}", get_indent(2), property.key, property.value);
            }
        }
        Clause::Create | Clause::Delete => {}
    }
}

/// Render a query back to canonical text
pub fn render_query(query: &Query) -> String {
    let mut out = String::from(query.clause.keyword());
    out.push(' ');
    out.push_str(&render_pattern(&query.graph));

    match &query.clause {
        Clause::Match {
            filters,
            projections,
        } => {
            if !filters.is_empty() {
                let rendered: Vec<String> = filters
                    .iter()
                    .map(|f| format!("{} {} {}", f.path, f.operator, f.value))
                    .collect();
                let _ = write!(out, " WHERE {}", rendered.join(" AND "));
            }
            if !projections.is_empty() {
                let _ = write!(out, " RETURN {}", projections.join(", "));
            }
        }
        Clause::Set { assignments } => {
            let _ = write!(out, " {}", render_properties(assignments));
        }
        Clause::Create | Clause::Delete => {}
    }
    out
}

/// Render edges as `(a)-[:T]->(b)` chains, extending a chain while each edge
/// starts at the previous edge's target, and nodes without edges as chains of
/// their own. Nodes and edges appear in graph order so the text parses back
/// to an equal graph. Only the first mention of a node carries its properties.
fn render_pattern(graph: &Graph) -> String {
    let mut chains: Vec<String> = Vec::new();
    let mut introduced = vec![false; graph.nodes.len()];
    let mut chain = String::new();
    let mut tail: Option<usize> = None;

    let position = |id: &str| graph.nodes.iter().position(|n| n.id == id);

    for edge in &graph.edges {
        let (Some(from), Some(to)) = (position(&edge.from), position(&edge.to)) else {
            continue;
        };

        let mut fresh: Vec<usize> = Vec::new();
        for index in [from, to] {
            if !introduced[index] && !fresh.contains(&index) {
                fresh.push(index);
            }
        }
        let pending: Vec<usize> = (0..graph.nodes.len())
            .filter(|i| !introduced[*i])
            .take(fresh.len())
            .collect();
        if fresh != pending {
            // Earlier nodes must be mentioned first to keep their order
            let last = fresh.iter().copied().max().unwrap_or(0);
            if !chain.is_empty() {
                chains.push(std::mem::take(&mut chain));
            }
            for index in 0..last {
                if !introduced[index] {
                    chains.push(render_node(&graph.nodes[index]));
                    introduced[index] = true;
                }
            }
            tail = None;
        }

        if tail != Some(from) {
            if !chain.is_empty() {
                chains.push(std::mem::take(&mut chain));
            }
            chain = mention(graph, from, &mut introduced);
        }
        let _ = write!(
            chain,
            "-[:{}]->{}",
            edge.edge_type,
            mention(graph, to, &mut introduced)
        );
        tail = Some(to);
    }
    if !chain.is_empty() {
        chains.push(chain);
    }

    for (index, node) in graph.nodes.iter().enumerate() {
        if !introduced[index] {
            chains.push(render_node(node));
        }
    }
    chains.join(", ")
}

/// Render a node in full on its first mention and bare afterwards
fn mention(graph: &Graph, index: usize, introduced: &mut [bool]) -> String {
    let node = &graph.nodes[index];
    if introduced[index] {
        format!("({}:{})", node.name, node.kind)
    } else {
        introduced[index] = true;
        render_node(node)
    }
}

fn render_node(node: &Node) -> String {
    if node.properties.is_empty() {
        format!("({}:{})", node.name, node.kind)
    } else {
        format!(
            "({}:{} {})",
            node.name,
            node.kind,
            render_properties(&node.properties)
        )
    }
}

fn render_properties(properties: &[Property]) -> String {
    let pairs: Vec<String> = properties
        .iter()
        .map(|p| format!("{}: {}", p.key, p.value))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

fn get_indent(level: usize) -> String {
    "  ".repeat(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parser::parse_query;

    #[test]
    fn test_render_match() {
        let query = parse_query(
            r#"match (d:Deployment{name:"web"})-[:OWN]->(rs:ReplicaSet) where d.spec.replicas = 2 return d.metadata.name,rs"#,
        )
        .unwrap();
        assert_eq!(
            render_query(&query),
            r#"MATCH (d:Deployment {name: "web"})-[:OWN]->(rs:ReplicaSet) WHERE d.spec.replicas = 2 RETURN d.metadata.name, rs"#
        );
    }

    #[test]
    fn test_render_set_reparses() {
        let text = r#"SET (d:Deployment {name: "web"}) {spec.replicas: 3, paused: true}"#;
        let query = parse_query(text).unwrap();
        let rendered = render_query(&query);
        assert_eq!(rendered, text);
        assert_eq!(parse_query(&rendered).unwrap(), query);
    }

    #[test]
    fn test_render_branching_pattern() {
        let query = parse_query(
            "MATCH (d:Deployment)-[:OWN]->(rs:ReplicaSet), (d:Deployment)-[:X]->(s:Service)",
        )
        .unwrap();
        let rendered = render_query(&query);
        assert_eq!(
            rendered,
            "MATCH (d:Deployment)-[:OWN]->(rs:ReplicaSet), (d:Deployment)-[:X]->(s:Service)"
        );
        assert_eq!(parse_query(&rendered).unwrap(), query);
    }

    #[test]
    fn test_render_keeps_node_order() {
        let query =
            parse_query("MATCH (n:Node), (p:Pod)-[:X]->(n:Node), (s:Service)-[:X]->(p:Pod)")
                .unwrap();
        let rendered = render_query(&query);
        assert_eq!(
            rendered,
            "MATCH (n:Node), (p:Pod)-[:X]->(n:Node), (s:Service)-[:X]->(p:Pod)"
        );
        assert_eq!(parse_query(&rendered).unwrap(), query);
    }
}
