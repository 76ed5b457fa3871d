mod scenario;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::scenario::Scenario;

#[derive(Parser, Debug)]
#[command(about = "Render a scripted ESP scenario into a replayable capture", version)]
struct Args {
    /// Scenario JSON describing camera, entities, and key presses.
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    scenario: PathBuf,

    /// Capture file to write (conventionally *.kxsp).
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let text = fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading scenario {}", args.scenario.display()))?;
    let scenario = Scenario::from_json(&text)
        .with_context(|| format!("parsing scenario {}", args.scenario.display()))?;
    let capture = scenario
        .to_capture()
        .with_context(|| format!("building capture from {}", args.scenario.display()))?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(&args.output, &capture)
        .with_context(|| format!("writing capture {}", args.output.display()))?;
    println!(
        "[scenario_capture] wrote {} ({} ticks, {} entities, {} bytes)",
        args.output.display(),
        scenario.ticks().count(),
        scenario.entities.len(),
        capture.len()
    );
    Ok(())
}
