// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use crate::ast::parser::ParserError;
use crate::catalog::CatalogError;
use crate::exec::field_path::FieldPathError;
use crate::exec::selector::SelectorError;
use crate::gateway::GatewayError;
use thiserror::Error;

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParserError),

    #[error("Cannot resolve resource kind '{identifier}': {source}")]
    Resolution {
        identifier: String,
        #[source]
        source: CatalogError,
    },

    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),

    #[error("Invalid field path: {0}")]
    FieldPath(#[from] FieldPathError),

    #[error("API error for '{binding}' ({kind}): {source}")]
    Api {
        binding: String,
        kind: String,
        #[source]
        source: GatewayError,
    },

    #[error("No relationship rule between {from} and {to}")]
    NoRelationship { from: String, to: String },

    #[error("Unknown binding '{0}'")]
    UnknownBinding(String),

    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("Fetch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Failed to marshal result: {0}")]
    Marshal(#[from] serde_json::Error),
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;
