use std::path::PathBuf;

use beattiles::analysis::analyze;
use beattiles::config::Tuning;
use beattiles::decode::decode_file;
use beattiles::schedule::{BandTag, BeatSchedule};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "beat_scan", about = "Write a Beat Tiles beat schedule for an audio file")]
struct Cli {
    /// Path to the audio file (MP3, OGG, FLAC, WAV)
    audio_file: PathBuf,

    /// Output file path (default: <audio>.beats.ron next to the track)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tuning file (RON) overriding the analysis defaults
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Print every detected beat
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let tuning = match &cli.tuning {
        Some(path) => Tuning::load(path).unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }),
        None => Tuning::default(),
    };

    eprintln!("Decoding {}...", cli.audio_file.display());
    let buffer = decode_file(&cli.audio_file).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    eprintln!(
        "  {} samples, {} Hz, {:.1}s",
        buffer.len(),
        buffer.sample_rate(),
        buffer.duration_ms() / 1000.0
    );

    eprintln!("Detecting beats...");
    let schedule = analyze(&buffer, &tuning.analysis).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    print_summary(&schedule);

    let output = cli
        .output
        .unwrap_or_else(|| BeatSchedule::sidecar_path(&cli.audio_file));
    if let Err(e) = schedule.save(&output) {
        eprintln!("Error writing {}: {e}", output.display());
        std::process::exit(1);
    }
    info!("Schedule for {} written to {}", cli.audio_file.display(), output.display());
    eprintln!("\nWrote {}", output.display());
}

fn print_summary(schedule: &BeatSchedule) {
    eprintln!("  {} beats", schedule.len());
    for tag in BandTag::ALL {
        eprintln!("    {:<8} {}", tag.label(), schedule.count_for(tag));
    }

    let events = schedule.events();
    if let (Some(first), Some(last)) = (events.first(), events.last()) {
        let span = last.time_ms - first.time_ms;
        if span > 0.0 {
            let per_minute = (events.len() - 1) as f64 / (span / 60_000.0);
            eprintln!("  ~{per_minute:.0} beats per minute");
        }
    }

    // Shown with --verbose, which raises the filter to debug.
    for event in schedule.events() {
        debug!(
            "{:>9.1} ms  {:<8} {:.2}",
            event.time_ms,
            event.band.label(),
            event.strength
        );
    }
}
