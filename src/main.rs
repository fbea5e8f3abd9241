// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! extender - inspect and exercise module override chains
//!
//! This is the main entry point for the extender CLI/REPL.
//!
//! ## Features
//!
//! - Print a deployment's override chains
//! - Show how `require` and `extend` calls are rewritten
//! - Interactive REPL against a recording host loader

mod cli;
mod commands;
mod repl;

use clap::Parser;
use cli::{Cli, Commands};
use extender_loader::ExecutionStack;
use owo_colors::OwoColorize;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "extender=debug,extender_loader=debug"
    } else {
        "extender=warn,extender_loader=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let stack = ExecutionStack::new();

    match cli.command.clone().unwrap_or(Commands::Repl) {
        Commands::Graph => commands::graph(&commands::load_system(&cli, &stack).await?),
        Commands::Resolve { ids } => {
            commands::resolve(&commands::load_system(&cli, &stack).await?, &ids)
        }
        Commands::Deps { id } => commands::deps(&commands::load_system(&cli, &stack).await?, &id),
        Commands::Caller { locations } => {
            commands::caller(&commands::load_config(&cli)?, &locations)?
        }
        Commands::Repl => {
            let system = commands::load_system(&cli, &stack).await?;
            let mut repl = repl::Repl::new(repl::Session::new(system, stack))?;
            repl.run()?;
        }
    }
    Ok(())
}
