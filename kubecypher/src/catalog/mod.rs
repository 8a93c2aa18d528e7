// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Resource-kind catalog
//!
//! Maps the identifiers users write in patterns (plural names, Kind names,
//! short names, in any case) to resource coordinates, caching every answer
//! for the lifetime of the resolver.

pub mod error;
pub mod resolver;

pub use error::{CatalogError, CatalogResult};
pub use resolver::{parse_group_version, ResolvedKind, ResourceResolver};
