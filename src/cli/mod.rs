//! CLI module for songlib
//!
//! - init: write a default configuration file
//! - serve: load configuration, seed counters and run the HTTP API
//! - check: validate configuration and print the effective settings

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, init, run, run_command, serve, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_response;
