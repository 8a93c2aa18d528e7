// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query Coordinator - Central entry point for query execution
//!
//! The QueryCoordinator owns the executor and the session context (namespace
//! scope and debug flag) and exposes the operations a shell needs.

pub mod query_coordinator;

pub use query_coordinator::QueryCoordinator;

// Re-export types needed for the public API
pub use crate::exec::{ExecutionContext, QueryResult};
