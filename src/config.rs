//! Command-line and environment configuration for the server binary.

use clap::Parser;
use std::path::PathBuf;

/// Orator Spark game-state server
#[derive(Parser, Debug, Clone)]
#[command(name = "orator-spark")]
#[command(about = "Serves per-user game state for the Orator Spark app")]
pub struct Config {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// JSON file holding every user's game state
    #[arg(long, env = "ORATOR_DATA_FILE", default_value = "orator-spark.json")]
    pub data_file: PathBuf,

    /// Keep state in memory only (nothing survives a restart)
    #[arg(long)]
    pub in_memory: bool,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
