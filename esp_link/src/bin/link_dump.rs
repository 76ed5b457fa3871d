use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use esp_link::{LinkState, MumbleLinkData};

#[derive(Parser, Debug)]
#[command(about = "Decode a MumbleLink section and print it as JSON", version)]
struct Args {
    /// Path to the shared-memory section or a saved copy of it
    #[arg(long, default_value = "/dev/shm/MumbleLink")]
    path: PathBuf,

    /// Print every raw field instead of the overlay's view of the link
    #[arg(long)]
    raw: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bytes =
        fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?;
    let data = MumbleLinkData::parse(&bytes)
        .with_context(|| format!("decoding MumbleLink block from {}", args.path.display()))?;

    let json = if args.raw {
        serde_json::to_string_pretty(&data)?
    } else {
        let state = LinkState::from_data(&data).context("interpreting MumbleLink block")?;
        serde_json::to_string_pretty(&state)?
    };
    println!("{json}");
    Ok(())
}
