use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[clap(
    name = "hivewire",
    about = "Forward honeypot login telemetry to a real-time messaging backend"
)]
pub struct Cli {
    /// Path to a TOML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tail a honeypot JSON log file and forward qualifying events
    Run(RunArgs),
    /// Print the resolved configuration
    Config,
}

#[derive(Args)]
pub struct RunArgs {
    /// Honeypot JSON log file to tail
    #[clap(long, default_value = "/var/log/cowrie/cowrie.json")]
    pub log_file: PathBuf,

    /// Override the backend endpoint URL
    #[clap(long)]
    pub url: Option<String>,

    /// Override the sensor identity sent at connect time
    #[clap(long)]
    pub sensor: Option<String>,
}
