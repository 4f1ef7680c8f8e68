use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use fretcoach::analysis::offline::analyze_samples;
use fretcoach::analysis::NoteEvent;
use fretcoach::assessment::HttpAssessmentClient;
use fretcoach::config::AppConfig;
use fretcoach::fixtures::{sine_window, FixtureCatalog};
use fretcoach::session::{SessionAnalyzer, SessionSettings};
use fretcoach::theory::{style_pitch_classes, MusicalKey, MusicalStyle, NOTE_NAMES};

#[derive(Parser, Debug)]
#[command(
    name = "fretcoach_cli",
    about = "Deterministic analysis harness for FretCoach"
)]
struct Cli {
    /// Configuration JSON (falls back to built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override directory containing fixture WAV recordings
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract note events, one JSON object per line
    Detect {
        /// Fixture name or WAV path
        #[arg(long, conflicts_with = "tone")]
        fixture: Option<String>,
        /// Synthetic sine frequency in Hz instead of a recording
        #[arg(long)]
        tone: Option<f32>,
        /// Synthetic tone length in milliseconds
        #[arg(long, default_value_t = 1_000)]
        duration_ms: u64,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Extract note events and score them as a practice session
    Analyze {
        #[arg(long)]
        fixture: String,
        #[arg(long, default_value = "rock")]
        style: String,
        #[arg(long, default_value = "A")]
        key: String,
        #[arg(long, default_value_t = 120)]
        tempo: u32,
        /// Assessment service URL; omitted means local-only analysis
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the pitch classes accepted for a style in a key
    Scales {
        #[arg(long, default_value = "rock")]
        style: String,
        #[arg(long, default_value = "A")]
        key: String,
    },
    /// List available fixture recordings on disk
    DumpFixtures,
}

fn main() -> ExitCode {
    fretcoach::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_ref()
        .map(AppConfig::load_from_file)
        .unwrap_or_default();
    let catalog = cli
        .fixtures_dir
        .map(FixtureCatalog::new)
        .unwrap_or_default();

    match cli.command {
        Commands::Detect {
            fixture,
            tone,
            duration_ms,
            output,
        } => run_detect(&catalog, &config, fixture.as_deref(), tone, duration_ms, output),
        Commands::Analyze {
            fixture,
            style,
            key,
            tempo,
            endpoint,
            output,
        } => run_analyze(
            &catalog, &config, &fixture, &style, &key, tempo, endpoint, output,
        ),
        Commands::Scales { style, key } => run_scales(&style, &key),
        Commands::DumpFixtures => run_dump(&catalog),
    }
}

fn detect_events(
    catalog: &FixtureCatalog,
    config: &AppConfig,
    fixture: &str,
) -> Result<Vec<NoteEvent>> {
    let data = catalog.load(fixture)?;
    let analysis = analyze_samples(
        &data.samples,
        data.sample_rate,
        config.pitch.clone(),
        config.tracking.clone(),
    );
    Ok(analysis.events)
}

fn run_detect(
    catalog: &FixtureCatalog,
    config: &AppConfig,
    fixture: Option<&str>,
    tone: Option<f32>,
    duration_ms: u64,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let events = match (fixture, tone) {
        (Some(fixture), None) => detect_events(catalog, config, fixture)
            .with_context(|| format!("processing fixture {}", fixture))?,
        (None, Some(frequency)) => {
            let sample_rate = config.audio.sample_rate;
            let len = (sample_rate as u64 * duration_ms / 1000) as usize;
            let samples = sine_window(frequency, 0.5, sample_rate, len);
            let analysis = analyze_samples(
                &samples,
                sample_rate,
                config.pitch.clone(),
                config.tracking.clone(),
            );
            analysis.events
        }
        _ => anyhow::bail!("exactly one of --fixture or --tone is required"),
    };

    let mut lines = String::new();
    for event in &events {
        lines.push_str(&serde_json::to_string(event)?);
        lines.push('\n');
    }
    emit(lines.trim_end(), output)?;
    Ok(ExitCode::from(0))
}

#[allow(clippy::too_many_arguments)]
fn run_analyze(
    catalog: &FixtureCatalog,
    config: &AppConfig,
    fixture: &str,
    style: &str,
    key: &str,
    tempo: u32,
    endpoint: Option<String>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let settings = SessionSettings {
        style: parse_style(style)?,
        key: key.parse::<MusicalKey>().map_err(anyhow::Error::msg)?,
        tempo,
        metronome_enabled: false,
    };

    let events = detect_events(catalog, config, fixture)
        .with_context(|| format!("processing fixture {}", fixture))?;

    let analyzer = match endpoint {
        Some(endpoint) => {
            let client = HttpAssessmentClient::new(&endpoint)
                .with_context(|| format!("invalid endpoint {}", endpoint))?;
            SessionAnalyzer::with_backend(
                config.scoring.clone(),
                config.assessment.clone(),
                Arc::new(client),
            )
        }
        None => SessionAnalyzer::local_only(config.scoring.clone()),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = runtime.block_on(analyzer.analyze(events, settings));

    emit(&serde_json::to_string_pretty(&result)?, output)?;
    Ok(ExitCode::from(0))
}

fn run_scales(style: &str, key: &str) -> Result<ExitCode> {
    let style = parse_style(style)?;
    let key = key.parse::<MusicalKey>().map_err(anyhow::Error::msg)?;

    let classes = style_pitch_classes(style, key);
    let names: Vec<&str> = classes.iter().map(|c| NOTE_NAMES[c as usize]).collect();
    let payload = ScalesReport {
        style: style.to_string(),
        key: key.to_string(),
        pitch_classes: names,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(ExitCode::from(0))
}

fn run_dump(catalog: &FixtureCatalog) -> Result<ExitCode> {
    let fixtures = catalog.discover()?;
    if fixtures.is_empty() {
        println!("No fixtures found under {}", catalog.root().display());
        return Ok(ExitCode::from(0));
    }

    for metadata in fixtures {
        println!("{}", metadata.name);
    }
    Ok(ExitCode::from(0))
}

fn parse_style(style: &str) -> Result<MusicalStyle> {
    serde_json::from_value(serde_json::Value::String(style.to_lowercase()))
        .with_context(|| format!("unknown style '{}' (rock, blues, metal)", style))
}

fn emit(json: &str, output: Option<PathBuf>) -> Result<()> {
    if let Some(path) = output {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }
    Ok(())
}

#[derive(Serialize)]
struct ScalesReport {
    style: String,
    key: String,
    pitch_classes: Vec<&'static str>,
}
