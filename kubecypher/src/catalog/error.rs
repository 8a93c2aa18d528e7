// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for resource-kind resolution

use crate::gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Resource kind not found: {0}")]
    KindNotFound(String),

    #[error("Invalid group/version '{0}'")]
    InvalidGroupVersion(String),

    #[error("Discovery failed: {0}")]
    Discovery(#[from] GatewayError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
