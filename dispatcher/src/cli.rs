use std::path::PathBuf;

use clap::Parser;

/// Multi-car elevator controller running against simulated hardware.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "elevator-control", version)]
pub struct Args {
    /// Building configuration. Defaults to config.json, then _config.json.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Draw a live status table instead of logging status changes.
    #[arg(short, long)]
    pub dashboard: bool,

    /// Run the building this many times faster than real time.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub speedup: u32,
}
