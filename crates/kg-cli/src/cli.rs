use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kirkagram", about = "kirkagram photo-sharing backend", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, global = true, env = "KIRKAGRAM_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Apply the PostgreSQL schema
    Migrate,
    /// Print the resolved configuration
    CheckConfig,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override `[http] bind`
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}
