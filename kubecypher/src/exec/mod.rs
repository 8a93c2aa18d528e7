// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution engine
//!
//! Takes parsed queries and runs them against an API gateway: selectors,
//! bounded dispatch, relationship narrowing, projection and mutations.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod field_path;
pub mod projection;
pub mod relationship;
pub mod result;
pub mod selector;

// Re-export the main types for convenience
pub use config::{ConfigError, ExecutorConfig};
pub use context::ExecutionContext;
pub use dispatcher::Dispatcher;
pub use error::{ExecutionError, ExecutionResult};
pub use executor::QueryExecutor;
pub use relationship::{Linkage, RelationshipRule, RelationshipRules};
pub use result::QueryResult;
