// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// extender - inspect and exercise module override chains
#[derive(Parser, Debug)]
#[command(name = "extender")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging of rewrites
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Loader configuration file (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override map file (JSON object of base id to chain)
    #[arg(short, long, global = true, value_name = "FILE", conflicts_with = "metadata")]
    pub overrides: Option<PathBuf>,

    /// Application metadata file holding the override map
    #[arg(short, long, global = true, value_name = "FILE")]
    pub metadata: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print every override chain and its predecessor links
    #[command(alias = "ls")]
    Graph,

    /// Show what a require of each id actually loads
    Resolve {
        /// Module ids to require
        #[arg(value_name = "ID", required = true)]
        ids: Vec<String>,
    },

    /// Show the dependencies extend would inject for a module
    Deps {
        /// Module id of the extending module
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Identify the calling module from trail locations, innermost first
    Caller {
        /// Script locations
        #[arg(value_name = "LOCATION", required = true)]
        locations: Vec<String>,
    },

    /// Start an interactive session against a recording host
    #[command(alias = "i")]
    Repl,
}
