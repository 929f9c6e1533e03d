//! PodCam command-line boundary.
//!
//! Reads pre-extracted feature data as JSON (signals, activity segments,
//! score tracks), runs the editing core, and writes alignment or timeline
//! JSON for the external video-assembly tooling. All media decoding and
//! encoding happens outside this binary.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use podcam_engine::{
    AlignerConfig, CutawayConfig, EngineConfig, NormalizationMode, SignalAligner, SwitchConfig,
    SwitchTimelineBuilder,
};
use podcam_models::{parse_timestamp, ScoreTrack, Signal, SourceSegment, Timeline};

#[derive(Parser)]
#[command(name = "podcam")]
#[command(about = "Multi-camera podcast edit planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Normalization {
    /// Rescale to [0, 1] (lip area, energy envelopes)
    MinMax,
    /// Zero mean / unit variance (raw audio)
    ZScore,
}

impl From<Normalization> for NormalizationMode {
    fn from(value: Normalization) -> Self {
        match value {
            Normalization::MinMax => NormalizationMode::MinMax,
            Normalization::ZScore => NormalizationMode::ZScore,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the offset between two feature signals
    Align {
        /// Reference signal JSON file
        #[arg(short, long)]
        a: PathBuf,

        /// Signal to align against the reference
        #[arg(short, long)]
        b: PathBuf,

        /// Normalization applied before correlation
        #[arg(long, value_enum, default_value = "min-max")]
        normalization: Normalization,

        /// Number of candidate offsets to report
        #[arg(long, default_value = "5")]
        top_n: usize,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a switch timeline from speaker activity segments
    Cut {
        /// Activity segments JSON file
        #[arg(short, long)]
        segments: PathBuf,

        /// Total duration, as seconds or HH:MM:SS
        #[arg(short, long)]
        duration: String,

        /// Minimum clip duration in seconds
        #[arg(long, default_value = "1.0")]
        min_clip: f64,

        /// Fallback source when nothing survives filtering
        #[arg(long)]
        default_source: Option<String>,

        /// Wide/main camera to cut away to inside long spans
        #[arg(long)]
        cutaway_source: Option<String>,

        /// Spacing between cutaways in seconds
        #[arg(long, default_value = "7.0")]
        cutaway_interval: f64,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a switch timeline from per-source score tracks
    Switch {
        /// Score tracks JSON file
        #[arg(short, long)]
        tracks: PathBuf,

        /// Sampling rate of the score tracks
        #[arg(short, long)]
        fps: f64,

        /// Total duration, as seconds or HH:MM:SS
        #[arg(short, long)]
        duration: String,

        /// Minimum clip duration in seconds
        #[arg(long, default_value = "1.0")]
        min_clip: f64,

        /// Source that starts live
        #[arg(long)]
        default_source: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Align {
            a,
            b,
            normalization,
            top_n,
            output,
        } => run_align(&a, &b, normalization, top_n, output.as_deref()),
        Commands::Cut {
            segments,
            duration,
            min_clip,
            default_source,
            cutaway_source,
            cutaway_interval,
            output,
        } => run_cut(
            &segments,
            &duration,
            min_clip,
            default_source,
            cutaway_source,
            cutaway_interval,
            output.as_deref(),
        ),
        Commands::Switch {
            tracks,
            fps,
            duration,
            min_clip,
            default_source,
            output,
        } => run_switch(
            &tracks,
            fps,
            &duration,
            min_clip,
            default_source,
            output.as_deref(),
        ),
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("podcam=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn run_align(
    a: &std::path::Path,
    b: &std::path::Path,
    normalization: Normalization,
    top_n: usize,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let signal_a: Signal = read_json(a)?;
    let signal_b: Signal = read_json(b)?;

    let aligner = SignalAligner::with_config(AlignerConfig {
        normalization: normalization.into(),
        top_n,
        ..Default::default()
    });
    let result = aligner
        .align(&signal_a, &signal_b)
        .context("alignment failed")?;

    info!(
        offset_seconds = result.offset_seconds,
        candidates = result.candidates.len(),
        "Offset estimated"
    );
    write_json(&result, output)
}

fn run_cut(
    segments_path: &std::path::Path,
    duration: &str,
    min_clip: f64,
    default_source: Option<String>,
    cutaway_source: Option<String>,
    cutaway_interval: f64,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let segments: Vec<SourceSegment> = read_json(segments_path)?;
    let total_duration = parse_timestamp(duration)
        .with_context(|| format!("invalid duration '{}'", duration))?;

    let env = EngineConfig::from_env();
    let config = SwitchConfig {
        min_clip_duration: min_clip,
        default_source: default_source.or(env.switch.default_source),
        cutaway: cutaway_source.map(|source_id| CutawayConfig {
            source_id,
            interval_seconds: cutaway_interval,
        }),
        ..Default::default()
    };

    let timeline = SwitchTimelineBuilder::with_config(config)
        .build_from_segments(&segments, total_duration)
        .context("timeline build failed")?;

    report(&timeline);
    write_json(&timeline, output)
}

fn run_switch(
    tracks_path: &std::path::Path,
    fps: f64,
    duration: &str,
    min_clip: f64,
    default_source: Option<String>,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let tracks: Vec<ScoreTrack> = read_json(tracks_path)?;
    let total_duration = parse_timestamp(duration)
        .with_context(|| format!("invalid duration '{}'", duration))?;

    let config = SwitchConfig {
        min_clip_duration: min_clip,
        default_source,
        ..Default::default()
    };

    let timeline = SwitchTimelineBuilder::with_config(config)
        .build_from_scores(&tracks, fps, total_duration)
        .context("timeline build failed")?;

    report(&timeline);
    write_json(&timeline, output)
}

fn report(timeline: &Timeline) {
    let stats = timeline.stats();
    info!(
        segments = stats.segment_count,
        cuts = stats.cut_count,
        average_clip_seconds = format!("{:.2}", stats.average_clip_seconds),
        "Timeline built"
    );
    for segment in &timeline.segments {
        info!("  {}", segment);
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_json<T: serde::Serialize>(value: &T, output: Option<&std::path::Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote output");
        }
        None => println!("{}", json),
    }
    Ok(())
}
