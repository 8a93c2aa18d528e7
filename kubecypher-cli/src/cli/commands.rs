// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kubecypher")]
#[command(version, about = "Graph-pattern queries over Kubernetes resources", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one query against a cluster snapshot
    Query {
        /// Query text, e.g. 'MATCH (d:Deployment) RETURN d.metadata.name'
        query: String,

        /// Cluster snapshot file (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Namespace scope
        #[arg(short, long, conflicts_with = "all_namespaces")]
        namespace: Option<String>,

        /// Query across all namespaces
        #[arg(short = 'A', long)]
        all_namespaces: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Print the result graph in Graphviz dot format
        #[arg(long)]
        graph: bool,

        /// Executor configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log execution details at info level
        #[arg(long)]
        debug: bool,
    },

    /// List the resource kinds a snapshot's discovery data knows
    Kinds {
        /// Cluster snapshot file (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
