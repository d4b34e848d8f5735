use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ytcaps",
    about = "YouTube caption extraction service",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Config file path (default: ~/.config/ytcaps/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bind address override, e.g. 127.0.0.1:9000
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Log pipeline details
    #[arg(short, long)]
    pub verbose: bool,
}
