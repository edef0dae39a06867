mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use console::style;
use tracing_subscriber::{fmt, EnvFilter};

use streamwatch_core::{
    FfmpegCliSampler, FrameSampler, HttpChecker, LinkOutcome, Monitor, RunReport, TelegramConfig,
    TelegramNotifier,
};

/// Check a playlist of video streams and alert on dead or black ones.
#[derive(Parser)]
#[command(name = "streamwatch", version, about)]
struct Cli {
    /// Playlist file listing stream URLs, one per line.
    #[arg(default_value = "main.m3u")]
    playlist: PathBuf,

    /// Path to TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File of KEY=value lines loaded into the environment (default: .env, if present).
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Where to write the last captured frame.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Position in the stream to sample a frame from, in milliseconds.
    #[arg(long)]
    position_ms: Option<u64>,

    /// Timeout for the liveness check, in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Frame capture backend: "ffmpeg" or "libav".
    #[arg(long)]
    backend: Option<String>,

    /// ffmpeg executable used by the "ffmpeg" backend.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Log output format: "pretty" or "json".
    #[arg(long)]
    log_format: Option<String>,

    /// How to print the run report on stdout.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let app_config = match cli.config {
        Some(ref path) => match config::AppConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                init_tracing("pretty");
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => config::AppConfig::default(),
    };

    let env_file = match config::load_env_file(cli.env_file.as_deref()) {
        Ok(found) => found,
        Err(e) => {
            init_tracing("pretty");
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let overrides = config::Overrides {
        output: cli.output.clone(),
        position_ms: cli.position_ms,
        timeout_secs: cli.timeout_secs,
        backend: cli.backend.clone(),
        ffmpeg: cli.ffmpeg.clone(),
        log_format: cli.log_format.clone(),
    };

    let settings = match app_config.resolve(overrides, TelegramConfig::from_env()) {
        Ok(s) => s,
        Err(e) => {
            init_tracing("pretty");
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&settings.log_format);
    if let Some(ref path) = cli.config {
        tracing::info!(path = %path.display(), "Loaded config file");
    }
    if let Some(ref path) = env_file {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }
    if !settings.telegram.is_configured() {
        tracing::warn!("Telegram credentials are not set; notifications will fail");
    }

    tracing::info!(
        playlist = %cli.playlist.display(),
        backend = %settings.backend,
        position_ms = settings.monitor.frame_position.as_millis() as u64,
        output = %settings.monitor.output_path.display(),
        "Starting run"
    );

    let checker = Arc::new(HttpChecker::from_config(&settings.monitor));
    let notifier = Arc::new(TelegramNotifier::from_config(settings.telegram.clone()));
    let sampler = build_sampler(&settings);
    let monitor = Monitor::new(checker, sampler, notifier, settings.monitor.clone());

    let report = match monitor.run_playlist(&cli.playlist).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "Cannot read playlist");
            std::process::exit(1);
        }
    };

    match cli.format {
        ReportFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!(error = %e, "Failed to serialize report"),
        },
        ReportFormat::Text => print_report(&report),
    }
}

#[cfg(feature = "libav")]
fn build_sampler(settings: &config::Settings) -> Arc<dyn FrameSampler> {
    match settings.backend.as_str() {
        "libav" => Arc::new(streamwatch_core::LibavSampler::new()),
        _ => Arc::new(FfmpegCliSampler::new(settings.ffmpeg.clone())),
    }
}

#[cfg(not(feature = "libav"))]
fn build_sampler(settings: &config::Settings) -> Arc<dyn FrameSampler> {
    Arc::new(FfmpegCliSampler::new(settings.ffmpeg.clone()))
}

fn print_report(report: &RunReport) {
    println!(
        "{} {}",
        style("streamwatch").bold(),
        style(format!("run {}", report.run_id)).dim()
    );
    for link in &report.links {
        let (badge, detail) = match &link.outcome {
            LinkOutcome::Healthy => (style("OK  ").green().bold(), String::new()),
            LinkOutcome::BadStatus { status: Some(code) } => {
                (style("DOWN").red().bold(), format!("HTTP {}", code))
            }
            LinkOutcome::BadStatus { status: None } => {
                (style("DOWN").red().bold(), "no response".to_string())
            }
            LinkOutcome::InvalidImage { reason } => {
                (style("IMG ").yellow().bold(), reason.clone())
            }
        };
        println!("  {}  {}  {}", badge, link.url, style(detail).dim());
    }
    let elapsed = report.finished_at - report.started_at;
    println!(
        "\n{} healthy, {} failed in {:.1}s",
        style(report.healthy_count()).green(),
        style(report.failed_count()).red(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the report.
    match log_format {
        "json" => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
