//! `fabflow` -- compile pipeline console.
//!
//! Runs an optional script, then reads commands from stdin until EOF or
//! `exit`. Console messages go to stdout; logs go to stderr.
//!
//! # Environment variables
//!
//! | Variable                   | Default  | Description                          |
//! |----------------------------|----------|--------------------------------------|
//! | `RUST_LOG`                 | `fabflow=info,fabflow_pipeline=info` | Log filter |
//! | `FABFLOW_STEP_INTERVAL_MS` | `1000`   | Stage progress step interval         |
//! | `FABFLOW_PROGRESS_STEPS`   | `10`     | Progress steps per long stage        |
//! | `FABFLOW_EVENT_CAPACITY`   | `1024`   | Event bus capacity                   |
//! | `FABFLOW_REQUEST_CAPACITY` | `64`     | Engine request queue capacity        |
//! | `FABFLOW_DEFAULT_DESIGN`   | `noname` | Design created by entry stages       |

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use fabflow_events::{ConsoleReporter, ReportFormat};
use fabflow_pipeline::{DispatchMode, EngineConfig, EngineHandle, Session, SessionOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod console;

/// How long to wait for buffered console output on exit.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// FPGA compile pipeline console
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run stages inline and exit after the script
    #[arg(long)]
    batch: bool,

    /// Script to run before the console starts
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Print every pipeline event as a JSON line
    #[arg(long)]
    json_events: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fabflow=info,fabflow_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env();
    let mode = if cli.batch {
        DispatchMode::Batch
    } else {
        DispatchMode::Interactive
    };
    let format = if cli.json_events {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };

    tracing::info!(?mode, step_interval_ms = config.step_interval.as_millis() as u64, "Starting fabflow");

    let engine = EngineHandle::spawn(config);
    let reporter = tokio::spawn(ConsoleReporter::run(
        engine.subscribe(),
        std::io::stdout(),
        format,
    ));

    let base_dir = match &cli.script {
        Some(path) => Some(script_dir(path).await?),
        None => None,
    };
    let mut session = Session::new(
        engine.clone(),
        SessionOptions {
            mode,
            base_dir,
            output: None,
        },
    );

    let mut ok = true;
    if let Some(path) = &cli.script {
        let script = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        ok = console::eval(&mut session, &script).await;
    }

    if mode == DispatchMode::Interactive {
        console::run(&mut session).await?;
    }

    engine.wait_idle().await?;
    drop(session);
    drop(engine);

    // The reporter exits once the engine has dropped the bus.
    if tokio::time::timeout(DRAIN_TIMEOUT, reporter).await.is_err() {
        tracing::warn!("Console output not fully drained");
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Absolute directory of the script; relative paths inside it resolve here.
async fn script_dir(path: &std::path::Path) -> anyhow::Result<PathBuf> {
    let absolute = tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("Script not found: {}", path.display()))?;
    Ok(absolute
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/")))
}
