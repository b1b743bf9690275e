use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gut_motility::analysis::{Analytics, ClassifiedEvent};
use gut_motility::calibration::CalibrationProfile;
use gut_motility::config::AppConfig;
use gut_motility::session::analyze_recording;
use gut_motility::testing::{render_scenario, SyntheticScenario};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "motility_cli",
    about = "Gut motility event detection over recordings and synthetic scenarios"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a WAV recording and print the session report as JSON
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// JSON configuration overrides
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Include every classified event in the report
        #[arg(long)]
        events: bool,
    },
    /// Render a deterministic synthetic recording to a 32-bit float WAV
    Synth {
        #[arg(long)]
        scenario: SyntheticScenario,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 60.0)]
        seconds: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
    },
    /// Print the default configuration
    Config,
    /// Record from the default microphone and print live events
    #[cfg(feature = "microphone")]
    Record {
        #[arg(long, default_value_t = 60.0)]
        seconds: f64,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    gut_motility::init_logging();
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

    match cli.command {
        Commands::Analyze {
            input,
            config,
            output,
            events,
        } => run_analyze(&input, config, output, events),
        Commands::Synth {
            scenario,
            output,
            seconds,
            seed,
            sample_rate,
        } => run_synth(scenario, &output, seconds, seed, sample_rate),
        Commands::Config => run_config(),
        #[cfg(feature = "microphone")]
        Commands::Record { seconds, config } => run_record(seconds, config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn run_analyze(
    input: &Path,
    config_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    include_events: bool,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let (samples, sample_rate) = read_wav(input)?;
    let report = analyze_recording(&config, sample_rate, &samples)
        .with_context(|| format!("analyzing {}", input.display()))?;

    let payload = AnalyzeReportPayload {
        input: input.display().to_string(),
        sample_rate,
        calibration: report.calibration.as_ref(),
        analytics: &report.analytics,
        sanitized_samples: report.sanitized_samples,
        events: include_events.then_some(report.events.as_slice()),
    };
    let json = serde_json::to_string_pretty(&payload)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }
    Ok(ExitCode::from(0))
}

fn run_synth(
    scenario: SyntheticScenario,
    output: &Path,
    seconds: f64,
    seed: u64,
    sample_rate: u32,
) -> Result<ExitCode> {
    if !(seconds.is_finite() && seconds > 0.0) {
        bail!("--seconds must be positive (got {seconds})");
    }
    let samples = render_scenario(scenario, sample_rate, seconds, seed);
    write_wav(output, &samples, sample_rate)?;

    let summary = SynthSummaryPayload {
        scenario: scenario.name(),
        output: output.display().to_string(),
        sample_rate,
        samples: samples.len(),
        seed,
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(ExitCode::from(0))
}

fn run_config() -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(&AppConfig::default())?);
    Ok(ExitCode::from(0))
}

#[cfg(feature = "microphone")]
fn run_record(seconds: f64, config_path: Option<PathBuf>) -> Result<ExitCode> {
    use std::time::{Duration, Instant};

    use gut_motility::audio::capture::MicrophoneCapture;
    use gut_motility::engine::EngineHandle;
    use gut_motility::session::SessionEvent;
    use tokio::sync::broadcast::error::TryRecvError;

    let config = load_config(config_path)?;
    let sample_rate = MicrophoneCapture::default_sample_rate()?;
    let (engine, feed) = EngineHandle::start(config, sample_rate)?;
    let mut rx = engine.subscribe();
    let capture = MicrophoneCapture::start(feed)?;

    let mut print_pending = || -> Result<()> {
        loop {
            match rx.try_recv() {
                Ok(SessionEvent::Quality(_)) | Ok(SessionEvent::CalibrationProgress(_)) => {}
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(TryRecvError::Lagged(skipped)) => tracing::warn!(
                    "[motility_cli] skipped {} live events; the final report lists all of them",
                    skipped
                ),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return Ok(()),
            }
        }
    };

    let deadline = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    while Instant::now() < deadline {
        print_pending()?;
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(capture);
    let report = engine.stop()?;
    print_pending()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

/// Decode a WAV file to mono f32 (first channel) in [-1, 1]
fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("decoding {}", path.display()))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("decoding {}", path.display()))?
        }
    };

    Ok((
        interleaved.into_iter().step_by(channels).collect(),
        spec.sample_rate,
    ))
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeReportPayload<'a> {
    input: String,
    sample_rate: u32,
    calibration: Option<&'a CalibrationProfile>,
    analytics: &'a Analytics,
    sanitized_samples: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<&'a [ClassifiedEvent]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthSummaryPayload<'a> {
    scenario: &'a str,
    output: String,
    sample_rate: u32,
    samples: usize,
    seed: u64,
}
