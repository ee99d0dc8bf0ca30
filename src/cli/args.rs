//! CLI argument definitions using clap
//!
//! Commands:
//! - songlib init --config <path>
//! - songlib serve --config <path> [--port <port>]
//! - songlib check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// songlib - record service for a song and book library
#[derive(Parser, Debug)]
#[command(name = "songlib")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./songlib.json")]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP API
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./songlib.json")]
        config: PathBuf,

        /// Port to bind, overriding the configuration file
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate a configuration file and print the effective settings
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./songlib.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_port_override() {
        let cli = Cli::try_parse_from(["songlib", "serve", "--port", "8080"]).unwrap();
        match cli.command {
            Command::Serve { config, port } => {
                assert_eq!(config, PathBuf::from("./songlib.json"));
                assert_eq!(port, Some(8080));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["songlib", "query"]).is_err());
    }
}
