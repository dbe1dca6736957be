//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::constants::{ENV_CONFIG, ENV_HOST, ENV_PORT, ENV_SQLITE_PATH};

#[derive(Parser)]
#[command(name = "channeling")]
#[command(version, about = "YouTube channel analytics pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(long, global = true, env = ENV_SQLITE_PATH)]
    pub sqlite_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the control plane and embedded workers (default)
    Start,
    /// Run a dedicated worker consuming only the given topics
    Worker {
        /// Topics to consume (e.g. overview-topic,analysis-topic-v2)
        #[arg(long, value_delimiter = ',', required = true)]
        topics: Vec<String>,
    },
}

/// Resolved CLI flags, decoupled from clap for config loading
#[derive(Debug, Default, Clone)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub sqlite_path: Option<PathBuf>,
}

/// Parse argv into flags and the optional subcommand
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    (
        CliConfig {
            host: cli.host,
            port: cli.port,
            config: cli.config,
            sqlite_path: cli.sqlite_path,
        },
        cli.command,
    )
}
