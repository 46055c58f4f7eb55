//! Segue CLI: schedule, annotate and mix narration segments.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use segue_core::names::{create_output_dir, mix_name};
use segue_core::{
    MixInput, MixingEngine, Scheduler, SegueConfig, TaggedSegment, VoiceMapper,
};

// ─── Top-level CLI ───────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "segue",
    about = "Segment scheduling and mixing for emotive narration",
    version,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the timeline for a manifest as JSON
    Schedule(ScheduleArgs),
    /// Print synthesis markup and voice settings per segment
    Markup(MarkupArgs),
    /// Mix the manifest's audio files into one WAV track
    Mix(MixArgs),
}

// ─── Shared arguments (embedded in each subcommand) ──────────────

#[derive(Parser, Debug)]
struct SharedArgs {
    /// Manifest: JSON array of {"segment": {...}, "audio": "path"} entries
    manifest: PathBuf,

    /// JSON config file (missing fields keep their defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct ScheduleArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Crossfade overlap between segments in seconds
    #[arg(long)]
    crossfade: Option<f64>,
}

#[derive(Parser, Debug)]
struct MarkupArgs {
    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(Parser, Debug)]
struct MixArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Output directory
    #[arg(long, default_value = "./segue-output")]
    output_dir: PathBuf,

    /// Custom run name (default: scene, tone arc and duration)
    #[arg(long)]
    run_name: Option<String>,

    /// Output sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Crossfade overlap between segments in seconds
    #[arg(long)]
    crossfade: Option<f64>,

    /// Play the mix on the default audio device when done
    #[arg(long, default_value_t = false)]
    play: bool,
}

// ─── Manifest ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    segment: TaggedSegment,
    #[serde(default)]
    audio: Option<PathBuf>,
}

/// Read a manifest. Relative audio paths resolve against its directory.
fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    let mut entries: Vec<ManifestEntry> = serde_json::from_str(&data)
        .with_context(|| format!("Invalid manifest: {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for entry in &mut entries {
        if let Some(audio) = entry.audio.as_mut() {
            if audio.is_relative() {
                *audio = base.join(&*audio);
            }
        }
    }
    log::info!("Loaded {} segment(s) from {}", entries.len(), path.display());
    Ok(entries)
}

fn load_config(shared: &SharedArgs) -> Result<SegueConfig> {
    match &shared.config {
        Some(path) => SegueConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(SegueConfig::default()),
    }
}

fn segments_of(entries: &[ManifestEntry]) -> Vec<TaggedSegment> {
    entries.iter().map(|e| e.segment.clone()).collect()
}

// ─── Main ────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    // Init logging
    let verbose = match &cli.command {
        Command::Schedule(a) => a.shared.verbose,
        Command::Markup(a) => a.shared.verbose,
        Command::Mix(a) => a.shared.verbose,
    };
    let log_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Schedule(args) => run_schedule(args),
        Command::Markup(args) => run_markup(args),
        Command::Mix(args) => run_mix(args),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

// ─── Schedule ────────────────────────────────────────────────────

fn run_schedule(args: ScheduleArgs) -> Result<()> {
    let mut config = load_config(&args.shared)?;
    if let Some(crossfade) = args.crossfade {
        config.schedule.crossfade = crossfade;
    }
    let entries = read_manifest(&args.shared.manifest)?;

    let schedule = Scheduler::new(config.schedule).schedule(&segments_of(&entries));
    println!("{}", serde_json::to_string_pretty(&schedule)?);
    Ok(())
}

// ─── Markup ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct MarkupReport {
    index: usize,
    ssml: String,
    stability: f64,
    expressiveness: f64,
    transition_ms: u32,
    emotional_progression: f64,
}

fn run_markup(args: MarkupArgs) -> Result<()> {
    let config = load_config(&args.shared)?;
    let entries = read_manifest(&args.shared.manifest)?;

    let reports: Vec<MarkupReport> = VoiceMapper::new(config.voice)
        .map(&segments_of(&entries))
        .into_iter()
        .map(|r| MarkupReport {
            index: r.index,
            ssml: r.ssml(),
            stability: r.settings.stability,
            expressiveness: r.settings.expressiveness,
            transition_ms: r.transition_ms,
            emotional_progression: r.emotional_progression,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

// ─── Mix ─────────────────────────────────────────────────────────

fn run_mix(args: MixArgs) -> Result<()> {
    let mut config = load_config(&args.shared)?;
    if let Some(sr) = args.sample_rate {
        config.mix.sample_rate = sr;
    }
    if let Some(crossfade) = args.crossfade {
        config.schedule.crossfade = crossfade;
    }

    let entries = read_manifest(&args.shared.manifest)?;
    if entries.is_empty() {
        bail!("Manifest has no segments: {}", args.shared.manifest.display());
    }

    let schedule = Scheduler::new(config.schedule).schedule(&segments_of(&entries));
    let mut inputs = Vec::with_capacity(entries.len());
    for (i, (entry, scheduled)) in entries.iter().zip(schedule).enumerate() {
        let path = entry
            .audio
            .as_ref()
            .with_context(|| format!("Manifest entry {} has no audio file", i))?;
        let audio = std::fs::read(path)
            .with_context(|| format!("Failed to read audio: {}", path.display()))?;
        inputs.push(MixInput::new(scheduled, audio));
    }

    let result = MixingEngine::new(config.mix)
        .mix(inputs)
        .context("Mixing failed")?;

    let name = args
        .run_name
        .clone()
        .unwrap_or_else(|| mix_name(&result.segments, result.duration));
    let run_dir = create_output_dir(&args.output_dir, &name)?;
    println!(
        "Run: {}",
        run_dir.file_name().unwrap_or_default().to_string_lossy()
    );

    let wav_path = run_dir.join("mix.wav");
    result
        .audio
        .write_to(&wav_path)
        .with_context(|| format!("Failed to write {}", wav_path.display()))?;
    std::fs::write(
        run_dir.join("schedule.json"),
        serde_json::to_string_pretty(&result.segments)?,
    )?;
    log::info!("Wrote {:.2}s mix to {}", result.duration, wav_path.display());

    if args.play {
        play(&result)?;
    }
    Ok(())
}

#[cfg(feature = "playback")]
fn play(result: &segue_core::MixedAudioResult) -> Result<()> {
    use segue_core::audio::playback::PlaybackDevice;

    let mut device = PlaybackDevice::open().context("No audio output available")?;
    device.load(result)?;
    log::info!("Playing...");
    device.session().wait();
    Ok(())
}

#[cfg(not(feature = "playback"))]
fn play(_result: &segue_core::MixedAudioResult) -> Result<()> {
    bail!("Built without playback support")
}
