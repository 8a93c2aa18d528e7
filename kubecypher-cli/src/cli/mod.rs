// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for kubecypher
//!
//! One-shot query execution and kind listing against a cluster snapshot.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands};
pub use handlers::{handle_kinds, handle_query, QueryOptions};
