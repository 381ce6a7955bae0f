use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use xfi_engine::api::traits::ReportSink;
use xfi_engine::{
    read_result, run_analysis, AnalysisOptions, EngineError, OutputFormat, RunMode, StdoutSink,
};

#[derive(Parser)]
#[command(name = "xfi", version, about = "Codebase conformance analyzer")]
struct Cli {
    /// Workspace path to analyze
    #[arg(long)]
    dir: PathBuf,

    /// Archetype profile name
    #[arg(long, default_value = "node-fullstack")]
    archetype: String,

    /// Configuration server base URL
    #[arg(long = "config-server", value_name = "URL")]
    config_server: Option<String>,

    /// Local configuration directory
    #[arg(long = "local-config", value_name = "PATH")]
    local_config: Option<PathBuf>,

    /// Telemetry collector URL
    #[arg(long = "telemetry-collector", value_name = "URL")]
    telemetry_collector: Option<String>,

    /// Output format
    #[arg(long = "output-format", value_name = "FORMAT", default_value = "json")]
    output_format: String,

    /// Logging mode: cli or vscode
    #[arg(long, default_value = "cli")]
    mode: String,

    /// Upper bound on parallel file evaluations
    #[arg(long = "max-concurrency", value_name = "N")]
    max_concurrency: Option<usize>,
}

fn init_logging(mode: RunMode, dir: &PathBuf) {
    let filter = EnvFilter::try_from_env("XFI_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = match mode {
        RunMode::Vscode => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        RunMode::Cli => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let file_logging_disabled = std::env::var("XFI_DISABLE_FILE_LOGGING")
        .map(|v| v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false);
    let file_layer = if file_logging_disabled {
        None
    } else {
        let log_dir = dir.join(".xfiResults");
        fs::create_dir_all(&log_dir)
            .ok()
            .and_then(|_| {
                fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(log_dir.join("xfi-analysis.log"))
                    .ok()
            })
            .map(|file| {
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .boxed()
            })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let mode = match cli.mode.as_str() {
        "cli" => RunMode::Cli,
        "vscode" => RunMode::Vscode,
        other => {
            eprintln!("Error: unknown mode '{}' (use 'cli' or 'vscode')", other);
            process::exit(2);
        }
    };

    if cli.output_format != "json" {
        eprintln!("Error: unsupported output format '{}' (only 'json')", cli.output_format);
        process::exit(2);
    }

    // Ensure every component and any spawned child sees one identifier.
    if std::env::var("XFI_CORRELATION_ID").unwrap_or_default().is_empty() {
        std::env::set_var("XFI_CORRELATION_ID", xfi_engine::correlation_id());
    }

    init_logging(mode, &cli.dir);

    let span = tracing::info_span!(
        "analysis",
        correlation_id = %std::env::var("XFI_CORRELATION_ID").unwrap_or_default()
    );
    let _guard = span.enter();

    let options = AnalysisOptions {
        dir: cli.dir.clone(),
        archetype: cli.archetype,
        config_server: cli.config_server,
        local_config: cli.local_config,
        telemetry_collector: cli.telemetry_collector,
        output_format: OutputFormat::Json,
        mode,
        max_concurrency: cli.max_concurrency,
    };

    match run_analysis(&options) {
        Ok(result) => {
            let sink = StdoutSink { format: OutputFormat::Json };
            if let Err(e) = sink.emit(&result) {
                eprintln!("Error: {}", e);
                process::exit(2);
            }
            if result.total_issues > 0 {
                process::exit(1);
            }
            process::exit(0);
        }
        Err(EngineError::AnalysisFatal { fatality_count }) => {
            // The artifact is persisted before the fatal signal; surface
            // it on stdout so callers see the same shape as a clean run.
            if let Ok(result) = read_result(&cli.dir) {
                let sink = StdoutSink { format: OutputFormat::Json };
                let _ = sink.emit(&result);
            }
            eprintln!("Error: analysis recorded {} fatality issue(s)", fatality_count);
            process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}
