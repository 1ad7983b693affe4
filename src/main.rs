//! EcoAudit command line
//!
//! `scan` runs the local pattern scanner, `audit` runs a full streamed
//! session against the backend, `carbon` runs the local carbon tool.
//! Narration goes to stdout; logs, phases and retries go to stderr.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use ecoaudit::models::request::{Attachment, AuditRequest, AuditScope, HardwareKind, HardwareTarget};
use ecoaudit::services::audit::{AuditEngine, SessionObserver};
use ecoaudit::storage::ConfigService;
use ecoaudit::utils::error::AuditError;
use ecoaudit_tools::{carbon_footprint, CarbonFootprintArgs};

/// Exit code for rate-limit and quota failures.
const EXIT_RATE_LIMITED: u8 = 2;

#[derive(Parser)]
#[command(name = "ecoaudit")]
#[command(about = "Energy, cost and carbon audits for ML model code")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the local pattern scanner only
    Scan {
        file: PathBuf,
        /// Print the finding as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a full audit session
    Audit {
        file: PathBuf,
        /// Hardware target name, e.g. "A100 80GB"
        #[arg(long)]
        hardware: String,
        /// gpu, cpu, tpu or edge
        #[arg(long, default_value = "gpu")]
        kind: String,
        /// Grid region, e.g. eu-west
        #[arg(long)]
        region: Option<String>,
        /// Grid carbon intensity hint in gCO2/kWh
        #[arg(long)]
        intensity: Option<f64>,
        /// snippet or module
        #[arg(long, default_value = "snippet")]
        scope: String,
        /// File sent alongside the source (image, PDF, log)
        #[arg(long)]
        attachment: Option<PathBuf>,
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Convert energy to grams of CO2e
    Carbon {
        #[arg(long)]
        joules: Option<f64>,
        #[arg(long)]
        kwh: Option<f64>,
        #[arg(long)]
        region: Option<String>,
    },
}

/// Streams narration to stdout and session notices to stderr.
struct TerminalObserver;

impl SessionObserver for TerminalObserver {
    fn on_narration(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn on_control_event(&self, phase: &str) {
        eprintln!("\n[phase] {}", phase);
    }

    fn on_retry(&self, attempt: u32, delay: Duration) {
        eprintln!(
            "\n[retry] attempt {} in {:.1}s",
            attempt,
            delay.as_secs_f64()
        );
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            let rate_limited = err
                .downcast_ref::<AuditError>()
                .is_some_and(|e| e.is_rate_limited());
            if rate_limited {
                ExitCode::from(EXIT_RATE_LIMITED)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Scan { file, json } => scan(&file, json),
        Command::Audit {
            file,
            hardware,
            kind,
            region,
            intensity,
            scope,
            attachment,
            config,
        } => {
            let source = read_source(&file)?;
            let mut request = AuditRequest::new(
                source,
                HardwareTarget {
                    name: hardware,
                    kind: kind.parse::<HardwareKind>()?,
                    region,
                    intensity,
                },
            );
            request.scope = scope.parse::<AuditScope>()?;
            if let Some(path) = attachment {
                request.attachment = Some(
                    Attachment::from_path(&path)
                        .with_context(|| format!("reading attachment {}", path.display()))?,
                );
            }
            audit(request, config).await
        }
        Command::Carbon {
            joules,
            kwh,
            region,
        } => {
            let footprint = carbon_footprint(&CarbonFootprintArgs {
                energy_joules: joules,
                energy_kwh: kwh,
                region,
            })?;
            println!("{}", serde_json::to_string_pretty(&footprint)?);
            Ok(())
        }
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn scan(file: &Path, json: bool) -> Result<()> {
    let source = read_source(file)?;
    let finding = ecoaudit_scanner::scan(&source);

    if json {
        println!("{}", serde_json::to_string_pretty(&finding)?);
        return Ok(());
    }

    println!("Tier: {}", finding.complexity_tier);
    println!("Heuristic cost units: {:.2}", finding.heuristic_cost_units);
    for (name, count) in &finding.construct_counts {
        println!("  {:<16} {}", name, count);
    }
    for annotation in &finding.structural_annotations {
        println!(
            "- {} at lines {:?}: {}",
            annotation.label, annotation.locations, annotation.advice
        );
    }
    for reason in &finding.low_confidence_reasons {
        println!("! low confidence: {}", reason);
    }
    for error in &finding.errors {
        println!("! {}", error);
    }
    Ok(())
}

async fn audit(request: AuditRequest, config_path: Option<PathBuf>) -> Result<()> {
    let service = match config_path {
        Some(path) => ConfigService::open(path)?,
        None => ConfigService::new()?,
    };
    let engine = AuditEngine::gemini(service.effective_config())?;

    let outcome = engine.audit(&request, &TerminalObserver).await?;

    println!();
    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    Ok(())
}
