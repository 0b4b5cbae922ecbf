//! CLI argument definitions using clap
//!
//! Commands:
//! - fieldgate check --config <path>
//! - fieldgate models --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fieldgate - attribute filtering and validation for record writes
#[derive(Parser, Debug)]
#[command(name = "fieldgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run write requests from stdin (one JSON object per line) through the guard
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./fieldgate.json")]
        config: PathBuf,
    },

    /// List loaded models and their scenarios
    Models {
        /// Path to configuration file
        #[arg(long, default_value = "./fieldgate.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
