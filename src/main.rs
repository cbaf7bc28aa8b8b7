mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use cli::{Cli, Command};
use singscore::analysis::analyzer::{analyze_against_track, analyze_performance};
use singscore::analysis::result::ScoringMode;
use singscore::audio::wav;
use singscore::cancel::CancelToken;
use singscore::config::{self, AppConfig};
use singscore::dsp::pitch::PitchTrack;
use singscore::paths;
use singscore::report::{export::ExportSnapshot, summary};
use singscore::util::sanitize_pitch;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Detect {
            wav,
            reference,
            json,
        } => detect(&config, &wav, reference.as_deref(), json),

        Command::Score {
            reference,
            recording,
            mode,
            export,
            timeout,
        } => score(
            &config,
            &reference,
            &recording,
            mode.map(Into::into),
            export.as_deref(),
            timeout,
        ),

        Command::Paths => {
            let file = paths::config_file();
            let status = if file.exists() {
                style("(found)").green()
            } else {
                style("(not found, using defaults)").dim()
            };
            println!("Config: {} {}", file.display(), status);
            Ok(())
        }
    }
}

/// A melody to score against.
enum Reference {
    /// Hz values from a JSON file. Their time base is the recording's.
    Pitches(Vec<f64>),
    /// Detected from a WAV file, with the frame layout it was detected at.
    Track(PitchTrack),
}

impl Reference {
    fn pitches(&self) -> &[f64] {
        match self {
            Reference::Pitches(p) => p,
            Reference::Track(t) => &t.pitches,
        }
    }
}

fn detect(config: &AppConfig, wav_path: &Path, reference: Option<&Path>, json: bool) -> Result<()> {
    let reference = reference
        .map(|p| load_reference(config, p))
        .transpose()?;

    let pcm = wav::load_pcm(wav_path)?;
    let detector = config.detector();
    let cancel = CancelToken::new();
    let track = match &reference {
        Some(Reference::Track(t)) => detector.detect_against(&pcm, t, &cancel),
        Some(Reference::Pitches(p)) => detector.detect(&pcm, Some(p.as_slice())),
        None => detector.detect(&pcm, None),
    }
    .with_context(|| format!("Pitch detection failed for {}", wav_path.display()))?;

    if json {
        println!("{}", serde_json::to_string(&track.pitches)?);
    } else {
        summary::print_track(&track);
    }
    Ok(())
}

fn score(
    config: &AppConfig,
    reference_path: &Path,
    recording_path: &Path,
    mode: Option<ScoringMode>,
    export: Option<&Path>,
    timeout: Option<u64>,
) -> Result<()> {
    let reference = load_reference(config, reference_path)?;
    let pcm = wav::load_pcm(recording_path)?;
    println!(
        "Scoring {} ({:.1}s) against {} ({} frames)",
        style(recording_path.display()).cyan(),
        pcm.duration_secs(),
        style(reference_path.display()).cyan(),
        reference.pitches().len()
    );

    let cancel = match timeout {
        Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
        None => CancelToken::new(),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("  {spinner:.green} {msg} {elapsed}")?);
    spinner.set_message("Analyzing");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let detector = config.detector();
    let pipeline = config.pipeline(mode);
    let outcome = match &reference {
        Reference::Pitches(p) => analyze_performance(&detector, &pipeline, &pcm, p, &cancel),
        Reference::Track(t) => analyze_against_track(&detector, &pipeline, &pcm, t, &cancel),
    };
    spinner.finish_and_clear();

    let analysis = outcome.context("Performance analysis failed")?;
    println!();
    summary::print_result(&analysis.result);

    if let Some(path) = export {
        ExportSnapshot::new(&analysis.result, reference.pitches(), &analysis.track.pitches).write(path)?;
        println!();
        println!("Snapshot saved to {}", style(path.display()).green());
    }
    Ok(())
}

/// A reference melody is either a cached JSON array of Hz values or a WAV
/// recording run through the same detector.
fn load_reference(config: &AppConfig, path: &Path) -> Result<Reference> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference: {}", path.display()))?;
        let pitches: Vec<f64> = serde_json::from_str(&contents)
            .with_context(|| format!("Reference must be a JSON array of Hz: {}", path.display()))?;
        return Ok(Reference::Pitches(
            pitches.into_iter().map(sanitize_pitch).collect(),
        ));
    }

    let pcm = wav::load_pcm(path)?;
    let track = config
        .detector()
        .detect_reference(&pcm, &CancelToken::new())
        .with_context(|| format!("Pitch detection failed for reference {}", path.display()))?;
    log::info!(
        "Reference {} detected as {} frames (chunk {} / step {})",
        path.display(),
        track.pitches.len(),
        track.layout.chunk_size,
        track.layout.step_size
    );
    Ok(Reference::Track(track))
}
