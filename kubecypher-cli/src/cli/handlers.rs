// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command handlers

use super::commands::OutputFormat;
use super::output::ResultFormatter;
use colored::*;
use kubecypher::gateway::memory::InMemoryGateway;
use kubecypher::{ExecutorConfig, QueryCoordinator};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Flags of the `query` command besides the text and snapshot
pub struct QueryOptions {
    /// `"all"` selects every namespace
    pub namespace: Option<String>,
    pub format: OutputFormat,
    pub graph: bool,
    pub config: Option<PathBuf>,
    pub debug: bool,
}

pub async fn handle_query(
    snapshot: PathBuf,
    query: String,
    options: QueryOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &options.config {
        Some(path) => ExecutorConfig::from_file(path)?,
        None => ExecutorConfig::default(),
    };
    let coordinator = load_snapshot(&snapshot, config)?;
    if let Some(namespace) = &options.namespace {
        coordinator.set_namespace(namespace);
    }
    if options.debug {
        coordinator.set_debug(true);
    }

    match coordinator.process_query(&query).await {
        Ok(result) => {
            println!("{}", ResultFormatter::format(&result, options.format));
            if options.graph {
                println!("{}", result.graph.to_dot());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            std::process::exit(1);
        }
    }
}

pub async fn handle_kinds(snapshot: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = load_snapshot(&snapshot, ExecutorConfig::default())?;
    coordinator.warm_cache().await?;
    println!("{}", ResultFormatter::format_kinds(&coordinator.dump_cache()));
    Ok(())
}

fn load_snapshot(
    path: &Path,
    config: ExecutorConfig,
) -> Result<Arc<QueryCoordinator>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("Snapshot not found at {:?}", path).into());
    }
    let gateway = InMemoryGateway::from_file(path)?;
    Ok(QueryCoordinator::new(Arc::new(gateway), config)?)
}
