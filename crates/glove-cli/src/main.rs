//! Glove command line: analyse captures and generate simulated ones

mod capture_io;

use anyhow::{bail, Context, Result};
use capture_io::{load_capture, write_capture, CaptureFormat};
use clap::{Parser, Subcommand, ValueEnum};
use glove_core::{Channel, TracingReporter};
use glove_processing::{AnalysisConfig, AnalysisRequest, SessionAnalyzer};
use glove_simulation::{CaptureConfig, CaptureSimulator, MotionPattern, NoiseConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Parkinson's glove capture analysis
#[derive(Parser, Debug)]
#[command(name = "glove")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log detail (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Analysis configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse a capture and print the report as JSON
    Analyze {
        /// Capture file (.json or .csv)
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis to run (default: the one matching the capture's mode)
        #[arg(short, long, value_enum, default_value = "auto")]
        analysis: AnalysisArg,

        /// Sensor channel for frequency analysis (1-5)
        #[arg(long, default_value = "1")]
        channel: usize,

        /// Skip the bandpass filter in frequency analysis
        #[arg(long)]
        no_filter: bool,

        /// Keep the warm-up samples
        #[arg(long)]
        no_truncate: bool,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a simulated capture
    Simulate {
        /// Motion preset (see `glove patterns`)
        #[arg(short, long, default_value = "parkinsonian-tremor")]
        pattern: String,

        /// Capture length in seconds
        #[arg(short, long, default_value = "10")]
        duration: f64,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Emit three-value records
        #[arg(long)]
        legacy: bool,

        /// Disable sensor noise
        #[arg(long)]
        clean: bool,

        /// Output file (.json or .csv)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the motion presets available to `simulate`
    Patterns,

    /// Print the effective analysis configuration
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AnalysisArg {
    Auto,
    Tremor,
    Angle,
    Movement,
    Force,
    Frequency,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { input, analysis, channel, no_filter, no_truncate, output } => {
            let request = match analysis {
                AnalysisArg::Auto => AnalysisRequest::Auto,
                AnalysisArg::Tremor => AnalysisRequest::TremorComparison,
                AnalysisArg::Angle => AnalysisRequest::AngleComparison,
                AnalysisArg::Movement => AnalysisRequest::Movement,
                AnalysisArg::Force => AnalysisRequest::Force,
                AnalysisArg::Frequency => AnalysisRequest::Frequency {
                    channel: Channel::from_number(channel)
                        .with_context(|| format!("channel must be 1-5, got {}", channel))?,
                    apply_filter: !no_filter,
                },
            };
            let config = AnalysisConfig {
                truncate_warmup: config.truncate_warmup && !no_truncate,
                ..config
            };
            analyze(&input, &config, request, output.as_deref())
        }
        Commands::Simulate { pattern, duration, seed, legacy, clean, output } => {
            let Some(motion) = MotionPattern::preset(&pattern) else {
                bail!("unknown motion preset '{}', run `glove patterns` for the list", pattern);
            };
            let sim_config = CaptureConfig {
                pattern: motion,
                duration_s: duration,
                noise: if clean { NoiseConfig::none() } else { NoiseConfig::default() },
                legacy,
                seed,
                ..CaptureConfig::default()
            };
            simulate(sim_config, &output)
        }
        Commands::Patterns => {
            for (name, pattern) in MotionPattern::presets() {
                println!("{:<22} {} ({})", name, pattern.description(), pattern.mode());
            }
            Ok(())
        }
        Commands::Config => {
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    AnalysisConfig::from_json(&text).with_context(|| format!("loading config {}", path.display()))
}

fn analyze(input: &Path, config: &AnalysisConfig, request: AnalysisRequest, output: Option<&Path>) -> Result<()> {
    let capture = load_capture(input)?;
    info!(
        samples = capture.len(),
        mode = %capture.mode(),
        legacy = capture.is_legacy(),
        "loaded {}",
        input.display()
    );

    let reporter = TracingReporter;
    let outcome = match SessionAnalyzer::new(config, &reporter).run(&capture, request) {
        Ok(outcome) => outcome,
        Err(err) if err.is_declined() => {
            eprintln!("{}", err);
            return Ok(());
        }
        Err(err) => return Err(err).context("analysis failed"),
    };

    let json = serde_json::to_string_pretty(&outcome)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
            info!(time_us = outcome.metrics.processing_time_us, "report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn simulate(config: CaptureConfig, output: &Path) -> Result<()> {
    let description = config.pattern.description();
    let capture = CaptureSimulator::new(config)?.generate()?;
    write_capture(&capture, output, CaptureFormat::from_path(output))?;
    info!(samples = capture.len(), "{} capture written to {}", description, output.display());
    Ok(())
}
