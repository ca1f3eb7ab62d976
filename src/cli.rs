// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the serve, init, and check subcommands and their arguments.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nocli")]
#[command(about = "HTTP management API for Docker and Podman containers")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Path to the config file (default: discover nocli.yml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen address, e.g. 0.0.0.0:8080 or :8080
        #[arg(short, long)]
        listen: Option<String>,

        /// Daemon endpoint, e.g. unix:///var/run/docker.sock
        #[arg(short, long)]
        daemon: Option<String>,
    },

    /// Write a template nocli.yml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Load and validate the configuration, then print the effective values
    Check {
        /// Path to the config file (default: discover nocli.yml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
