mod capture;
mod host;
mod replay;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use esp_core::{ConfigStore, FrameCoordinator, HostMode, StatCatalog, TextMetrics};
use serde::Serialize;

use crate::capture::{discover_captures, load_capture};
use crate::replay::{CaptureReport, display_size, replay_capture};

#[derive(Parser, Debug)]
#[command(about = "Replay recorded ESP snapshots through the overlay pipeline", version)]
struct Args {
    /// Capture file, or a directory searched recursively for .kxsp captures
    #[arg(long, value_hint = clap::ValueHint::AnyPath)]
    capture: PathBuf,

    /// Settings JSON to run with; saved back on exit when autoSaveOnExit is set
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    settings: Option<PathBuf>,

    /// TrueType font used to measure text (overrides fontPath from the settings)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    font: Option<PathBuf>,

    /// Write per-frame draw statistics to this JSON file
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    output_json: Option<PathBuf>,

    /// Display width; defaults to the recorded surface
    #[arg(long)]
    width: Option<u32>,

    /// Display height; defaults to the recorded surface
    #[arg(long)]
    height: Option<u32>,

    /// Behave like the injected overlay (the DELETE key exits)
    #[arg(long)]
    injected: bool,
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    settings: Option<String>,
    mode: HostMode,
    captures: Vec<CaptureReport>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Settings decide the default log level, so read them before logging starts.
    let settings_text = match &args.settings {
        Some(path) if path.exists() => Some(
            fs::read_to_string(path)
                .with_context(|| format!("reading settings {}", path.display()))?,
        ),
        _ => None,
    };
    let debug_logging = settings_text
        .as_deref()
        .and_then(|text| esp_core::Settings::from_json(text).ok())
        .is_some_and(|settings| settings.enable_debug_logging);
    let default_filter = if debug_logging { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    run(args)
}

fn run(args: Args) -> Result<()> {
    let mode = if args.injected {
        HostMode::Injected
    } else {
        HostMode::Plugin
    };
    let captures = discover_captures(&args.capture)?;

    let mut reports = Vec::with_capacity(captures.len());
    for path in &captures {
        let capture = load_capture(path)?;
        // Every capture starts from a fresh overlay, as if the game had restarted.
        let config = match &args.settings {
            Some(settings) => ConfigStore::open(settings)
                .with_context(|| format!("opening settings {}", settings.display()))?,
            None => ConfigStore::default(),
        };
        let font = args.font.clone().or_else(|| config.settings().font_path.clone());
        let metrics = match font {
            Some(font) => TextMetrics::from_font_file(&font)?,
            None => TextMetrics::Fixed,
        };
        let catalog = match config.settings().stat_catalog_path.clone() {
            Some(catalog) => StatCatalog::load(&catalog)?,
            None => StatCatalog::default(),
        };

        let display = display_size(&capture, args.width, args.height);
        let mut coordinator = FrameCoordinator::new(config, mode, catalog);
        let report = replay_capture(&capture, &mut coordinator, &metrics, display);
        println!(
            "{}: {} frames replayed, {} drawn, {} slow ticks, {} draw commands, {} recovered panics, final state {}",
            report.capture,
            report.frames.len(),
            report.drawn_frames(),
            report.stats.slow_ticks,
            report.total_commands(),
            report.stats.recovered_panics,
            report.final_lifecycle
        );
        reports.push(report);
    }

    if let Some(output) = &args.output_json {
        let payload = ReplayOutput {
            settings: args.settings.as_ref().map(|path| path.display().to_string()),
            mode,
            captures: reports,
        };
        let json = serde_json::to_string_pretty(&payload)?;
        fs::write(output, json)
            .with_context(|| format!("writing replay report to {}", output.display()))?;
        println!("Replay report written to {}", output.display());
    }
    Ok(())
}
