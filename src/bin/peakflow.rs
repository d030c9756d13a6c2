//! Peakflow CLI - Command-line interface for Peakflow Flux
//!
//! Commands:
//! - forecast: Build the 24-hour risk forecast
//! - score: Score one vitals snapshot
//! - monitor: Run the live monitor until interrupted; stdin lines switch
//!   modes and edit vitals
//! - history: Show recent scoring results
//! - classify: Classify a peak-flow percentage offline
//! - doctor: Diagnose configuration and environment

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use peakflow_flux::adapters::{
    FixedLocation, HistoryService, HttpScoringClient, LocationProvider, NoLocation, ScoringService,
};
use peakflow_flux::blocks::hour_label;
use peakflow_flux::encoder::FORECAST_SCHEMA_VERSION;
use peakflow_flux::monitor::{LiveMonitor, MonitorCommand, MonitorMode};
use peakflow_flux::normalizer::Normalizer;
use peakflow_flux::trends::{display_ts, recent, trend_series, LATEST_LIST_LEN};
use peakflow_flux::types::{Coordinates, DayForecast, DayOutlook, VitalsSnapshot};
use peakflow_flux::zone::classify;
use peakflow_flux::{
    aggregate, Config, ForecastBoard, ForecastEncoder, ForecastEngine, ForecastError, FLUX_VERSION,
    PRODUCER_NAME,
};

/// Peakflow - respiratory risk forecasts from vitals, weather and air quality
#[derive(Parser)]
#[command(name = "peakflow")]
#[command(version = FLUX_VERSION)]
#[command(about = "Forecast hourly asthma risk zones", long_about = None)]
struct Cli {
    /// Config file (JSON); defaults apply to missing fields
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the 24-hour risk forecast
    Forecast {
        /// Latitude; without lat/lon the fallback location is used
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        #[command(flatten)]
        vitals: VitalsArgs,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output as JSON payload
        #[arg(long)]
        json: bool,
    },

    /// Score one vitals snapshot
    Score {
        #[command(flatten)]
        vitals: VitalsArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the live monitor until Ctrl-C.
    ///
    /// Reads commands from stdin, one per line: `manual`, `auto`, or
    /// `<field>=<value>` (e.g. `hr=120`) to edit and score in manual mode.
    Monitor {
        #[command(flatten)]
        vitals: VitalsArgs,

        /// Start in manual mode (no drift until `auto`)
        #[arg(long)]
        manual: bool,

        /// Tick period in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Show recent scoring results
    History {
        /// Number of results (1-500)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output as JSON (oldest first, for charting)
        #[arg(long)]
        json: bool,
    },

    /// Classify a peak-flow percentage of personal best
    Classify {
        #[arg(allow_hyphen_values = true)]
        percent: f64,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for the configured baseline vitals
#[derive(Args, Clone, Default)]
struct VitalsArgs {
    /// Heart rate (bpm)
    #[arg(long)]
    heart_rate: Option<f64>,

    /// Respiration rate (breaths/min)
    #[arg(long)]
    resp_rate: Option<f64>,

    /// Oxygen saturation (%)
    #[arg(long)]
    spo2: Option<f64>,

    /// Temperature (celsius)
    #[arg(long, allow_hyphen_values = true)]
    temp_c: Option<f64>,

    /// Relative humidity (%)
    #[arg(long)]
    humidity: Option<f64>,

    /// Air quality index
    #[arg(long)]
    aqi: Option<f64>,

    /// Personal-best peak flow (L/min)
    #[arg(long)]
    personal_best: Option<f64>,
}

impl VitalsArgs {
    /// Overrides applied on `base`, clamped into the valid ranges
    fn apply(&self, base: &VitalsSnapshot) -> VitalsSnapshot {
        Normalizer::clamp(&VitalsSnapshot {
            heart_rate: self.heart_rate.unwrap_or(base.heart_rate),
            resp_rate: self.resp_rate.unwrap_or(base.resp_rate),
            spo2: self.spo2.unwrap_or(base.spo2),
            temp_c: self.temp_c.unwrap_or(base.temp_c),
            humidity: self.humidity.unwrap_or(base.humidity),
            aqi: self.aqi.unwrap_or(base.aqi),
            personal_best_peak_flow: self.personal_best.unwrap_or(base.personal_best_peak_flow),
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "peakflow_flux=debug"
    } else {
        "peakflow_flux=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), PeakflowCliError> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Forecast {
            lat,
            lon,
            vitals,
            output,
            json,
        } => {
            let location = match (lat, lon) {
                (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
                _ => None,
            };
            cmd_forecast(&config, location, &vitals, output.as_deref(), json).await
        }

        Commands::Score { vitals, json } => cmd_score(&config, &vitals, json).await,

        Commands::Monitor {
            vitals,
            manual,
            interval_ms,
            duration_secs,
        } => {
            let mode = if manual {
                MonitorMode::Manual
            } else {
                MonitorMode::Auto
            };
            cmd_monitor(&config, &vitals, mode, interval_ms, duration_secs).await
        }

        Commands::History { limit, json } => cmd_history(&config, limit, json).await,

        Commands::Classify { percent } => cmd_classify(percent),

        Commands::Doctor { json } => cmd_doctor(cli.config.as_deref(), json),
    }
}

async fn cmd_forecast(
    config: &Config,
    location: Option<Coordinates>,
    vitals: &VitalsArgs,
    output: Option<&Path>,
    json: bool,
) -> Result<(), PeakflowCliError> {
    let provider: Arc<dyn LocationProvider> = match location {
        Some(coords) => Arc::new(FixedLocation(coords)),
        None => Arc::new(NoLocation),
    };
    let engine = ForecastEngine::from_config(config, provider)?;
    let baseline = vitals.apply(&config.baseline);

    let board = std::sync::Mutex::new(ForecastBoard::new());
    engine.refresh(&board, &baseline).await;

    let board = board.into_inner().unwrap_or_else(|p| p.into_inner());
    if let Some(message) = board.error() {
        return Err(PeakflowCliError::Forecast(message.to_string()));
    }
    let forecast = board.forecast().ok_or(PeakflowCliError::NoForecast)?;

    let rendered = if json {
        ForecastEncoder::new().encode_to_json(forecast, board.applied_generation())?
    } else {
        let outlook = board
            .outlook()
            .cloned()
            .unwrap_or_else(|| aggregate(&forecast.hours));
        render_forecast(forecast, &outlook)
    };

    match output {
        Some(path) => fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn cmd_score(
    config: &Config,
    vitals: &VitalsArgs,
    json: bool,
) -> Result<(), PeakflowCliError> {
    let scorer = HttpScoringClient::new(config.http_client()?, config.api_base_url.clone());
    let prediction = scorer.predict(&vitals.apply(&config.baseline)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        println!(
            "{:.0}% of personal best ({:.0} L/min) - {}",
            prediction.peak_flow_percent,
            prediction.predicted_peak_flow,
            prediction.zone.as_str().to_uppercase()
        );
        let message = prediction
            .message
            .as_deref()
            .unwrap_or_else(|| prediction.zone.message());
        println!("{message}");
        if let Some(warning) = &prediction.warning {
            println!("Warning: {warning}");
        }
    }
    Ok(())
}

async fn cmd_monitor(
    config: &Config,
    vitals: &VitalsArgs,
    mode: MonitorMode,
    interval_ms: Option<u64>,
    duration_secs: Option<u64>,
) -> Result<(), PeakflowCliError> {
    let client = Arc::new(HttpScoringClient::new(
        config.http_client()?,
        config.api_base_url.clone(),
    ));
    let period = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.monitor_interval());
    if period.is_zero() {
        return Err(PeakflowCliError::Usage("--interval-ms must be positive".to_string()));
    }

    let mut monitor = LiveMonitor::new(client.clone(), vitals.apply(&config.baseline))
        .with_history(client, config.history_limit);
    monitor.set_mode(mode);

    let (commands_tx, commands) = mpsc::channel(16);
    tokio::spawn(read_commands(commands_tx));

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match duration_secs {
            Some(secs) => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
        let _ = tx.send(true);
    });

    monitor.run(period, commands, rx).await;

    let state = monitor.state();
    println!("{}", serde_json::to_string_pretty(&state.vitals)?);
    match &state.last_prediction {
        Some(p) => println!(
            "Last: {:.0}% ({}) {}",
            p.peak_flow_percent,
            p.zone,
            p.zone.message()
        ),
        None => println!("No successful prediction"),
    }
    Ok(())
}

/// Forward stdin lines to the monitor until EOF or the monitor stops
async fn read_commands(commands: mpsc::Sender<MonitorCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match MonitorCommand::parse(&line) {
            Ok(command) => {
                if commands.send(command).await.is_err() {
                    break;
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }
}

async fn cmd_history(
    config: &Config,
    limit: Option<usize>,
    json: bool,
) -> Result<(), PeakflowCliError> {
    let client = HttpScoringClient::new(config.http_client()?, config.api_base_url.clone());
    let entries = client.history(limit.unwrap_or(config.history_limit)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&trend_series(&entries))?);
        return Ok(());
    }

    println!("Latest ({} of {})", LATEST_LIST_LEN.min(entries.len()), entries.len());
    for entry in recent(&entries, LATEST_LIST_LEN) {
        println!(
            "  {:<6} {:>4.0}%  {:>5.0} L/min  {}",
            entry.zone,
            entry.peak_flow_percent,
            entry.predicted_peak_flow,
            display_ts(&entry.ts)
        );
    }
    Ok(())
}

fn cmd_classify(percent: f64) -> Result<(), PeakflowCliError> {
    if !percent.is_finite() {
        return Err(PeakflowCliError::Usage(format!(
            "percent must be a finite number, got {percent}"
        )));
    }
    let zone = classify(percent);
    println!("{zone}: {}", zone.message());
    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), PeakflowCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    // Check Flux version
    checks.push(DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Peakflow Flux version {}", FLUX_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Forecast payload schema: {}", FORECAST_SCHEMA_VERSION),
    });

    // Check config file if provided
    let config = match config_path {
        Some(path) if !path.exists() => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist, using defaults".to_string(),
            });
            Config::default()
        }
        Some(path) => match Config::load(path) {
            Ok(config) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Config file valid ({})", path.display()),
                });
                config
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid config: {}", e),
                });
                Config::default()
            }
        },
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "No config file, using defaults".to_string(),
            });
            Config::default()
        }
    };

    checks.push(DoctorCheck {
        name: "scoring_service".to_string(),
        status: CheckStatus::Ok,
        message: format!("Scoring service at {}", config.api_base_url),
    });

    checks.push(match config.http_client() {
        Ok(_) => DoctorCheck {
            name: "http_client".to_string(),
            status: CheckStatus::Ok,
            message: format!("HTTP timeout {} ms", config.request_timeout_ms),
        },
        Err(e) => DoctorCheck {
            name: "http_client".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot build HTTP client: {}", e),
        },
    });

    let stdout_check = if atty::is(atty::Stream::Stdout) {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a TTY (text output)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a pipe (use --json for machine output)".to_string(),
        }
    };
    checks.push(stdout_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Peakflow Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PeakflowCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn render_forecast(forecast: &DayForecast, outlook: &DayOutlook) -> String {
    let mut out = String::new();
    let coords = forecast.location.value();
    out.push_str(&format!(
        "Day forecast for {:.4}, {:.4} ({} location)\n",
        coords.lat,
        coords.lon,
        forecast.location.source_str()
    ));
    if !forecast.padded_hours.is_empty() {
        out.push_str(&format!(
            "{} hours used ambient weather\n",
            forecast.padded_hours.len()
        ));
    }

    if let Some(summary) = &outlook.summary {
        out.push_str(&format!(
            "\n{}\nWorst hour: {} ({:.0}%, {})\n",
            summary.headline,
            hour_label(summary.worst.hour),
            summary.worst.peak_flow_percent,
            summary.worst.zone
        ));
    }

    out.push('\n');
    for block in &outlook.blocks {
        out.push_str(&format!(
            "{:<10} {:<14} {:<6} {:>3.0}C {:>3.0}% AQI {:>3.0}  {}\n",
            block.name,
            block.span_label(),
            block.zone,
            block.avg_temp,
            block.avg_humidity,
            block.avg_aqi,
            block.recommendation
        ));
    }

    out.push('\n');
    for hour in &forecast.hours {
        out.push_str(&format!(
            "{:>5}  {:<6} {:>4.0}%  {:>5.1}C {:>3.0}%  AQI {:>3}\n",
            hour_label(hour.hour),
            hour.zone,
            hour.peak_flow_percent,
            hour.temp_c,
            hour.humidity,
            hour.aqi
        ));
    }
    out
}

// Error types

#[derive(Debug)]
enum PeakflowCliError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Flux(ForecastError),
    Forecast(String),
    NoForecast,
    Usage(String),
    DoctorFailed,
}

impl From<std::io::Error> for PeakflowCliError {
    fn from(e: std::io::Error) -> Self {
        PeakflowCliError::Io(e)
    }
}

impl From<serde_json::Error> for PeakflowCliError {
    fn from(e: serde_json::Error) -> Self {
        PeakflowCliError::Json(e)
    }
}

impl From<ForecastError> for PeakflowCliError {
    fn from(e: ForecastError) -> Self {
        PeakflowCliError::Flux(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PeakflowCliError> for CliError {
    fn from(e: PeakflowCliError) -> Self {
        match e {
            PeakflowCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PeakflowCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PeakflowCliError::Flux(e) => {
                let hint = match &e {
                    ForecastError::Http(_) | ForecastError::Status { .. } => {
                        Some("Check that the scoring service is running".to_string())
                    }
                    ForecastError::Config(_) | ForecastError::Json(_) => {
                        Some("Run 'peakflow doctor --config <file>' for details".to_string())
                    }
                    _ => None,
                };
                CliError {
                    code: "FLUX_ERROR".to_string(),
                    message: e.to_string(),
                    hint,
                }
            }
            PeakflowCliError::Forecast(message) => CliError {
                code: "FORECAST_FAILED".to_string(),
                message,
                hint: Some("Check that the scoring service is running and retry".to_string()),
            },
            PeakflowCliError::NoForecast => CliError {
                code: "NO_FORECAST".to_string(),
                message: "No forecast was produced".to_string(),
                hint: None,
            },
            PeakflowCliError::Usage(message) => CliError {
                code: "USAGE_ERROR".to_string(),
                message,
                hint: Some("Run 'peakflow --help'".to_string()),
            },
            PeakflowCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
