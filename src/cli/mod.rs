//! CLI module for fieldgate
//!
//! Provides command-line interface for:
//! - check: run JSON-lines write requests through the guard
//! - models: list loaded model declarations

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{boot, check, init_logging, list_models, run, run_command, CheckSummary, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_error, write_rejection, write_response};
