// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! kubecypher CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // -v wins over --log-level; RUST_LOG still applies per module
    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        log::LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(log_level);
    // `query --debug` traces execution at info level
    let debug = matches!(cli.command, Commands::Query { debug: true, .. });
    if debug && log_level < log::LevelFilter::Info {
        builder.filter_module("kubecypher", log::LevelFilter::Info);
    }
    builder.init();

    match cli.command {
        Commands::Version => {
            println!("{} {}", "kubecypher".bold().green(), kubecypher::VERSION);
            println!("Graph-pattern queries over Kubernetes resources");
            Ok(())
        }

        Commands::Query {
            query,
            snapshot,
            namespace,
            all_namespaces,
            format,
            graph,
            config,
            debug,
        } => {
            let options = cli::QueryOptions {
                namespace: if all_namespaces {
                    Some("all".to_string())
                } else {
                    namespace
                },
                format,
                graph,
                config,
                debug,
            };
            cli::handle_query(snapshot, query, options).await
        }

        Commands::Kinds { snapshot } => cli::handle_kinds(snapshot).await,
    }
}
