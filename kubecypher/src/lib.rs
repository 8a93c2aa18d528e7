// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! kubecypher - Graph-pattern queries over a Kubernetes-style resource API
//!
//! Queries name resource kinds as pattern nodes, relate them with edges and
//! either return (projections of) the matching documents or mutate them:
//!
//! ```text
//! MATCH (d:Deployment {name: "web"})-[:OWN]->(rs:ReplicaSet)-[:OWN]->(p:Pod)
//! WHERE p.status.phase = "Running"
//! RETURN p.metadata.name, p.spec.nodeName
//!
//! CREATE (c:ConfigMap {name: "settings", data.mode: "fast"})
//! SET (d:Deployment {name: "web"}) {spec.replicas: 3}
//! DELETE (p:Pod {app: "web"})
//! ```
//!
//! # Features
//!
//! - **Pull lexer** with an explicit raw-capture state machine for field paths
//! - **Kind resolution** by plural name, Kind or short name, cached per executor
//! - **Bounded dispatch**: every API call goes through a gated worker pool
//! - **Relationship rules** as configuration data, narrowing matches along edges
//! - **Gateway abstraction** with a snapshot-backed in-memory implementation
//!
//! The [`QueryCoordinator`] is the main entry point.

pub mod ast;
pub mod catalog;
pub mod coordinator;
pub mod exec;
pub mod gateway;
pub mod graph;

pub use ast::parser::{parse_query, ParserError};
pub use catalog::{CatalogError, ResolvedKind, ResourceResolver};
pub use coordinator::QueryCoordinator;
pub use exec::{
    ExecutionContext, ExecutionError, ExecutionResult, ExecutorConfig, QueryExecutor, QueryResult,
};
pub use gateway::{ApiGateway, GatewayError, GroupVersionResource};

/// kubecypher version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// kubecypher crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
