//! Status Dashboard Binary

use clap::{Parser, Subcommand};
use status_dashboard::http::HttpFetcher;
use status_dashboard::integrity::{self, pin_hash};
use status_dashboard::jobs::{self, JobKind};
use status_dashboard::{CheckStatus, Config, DashboardError, Renderer, Result, scheduler, server};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "status-dashboard", version, about = "Security and service status dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the jobs, startup checks and web server (default)
    Serve,

    /// Run the integrity checks once and print the reports as JSON
    Check,

    /// Download a script and pin its SHA-256 digest
    PinHash {
        /// Defaults to TAILWIND_URL
        #[arg(long)]
        url: Option<String>,

        /// Defaults to HASH_FILE
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run one job once
    Run {
        #[arg(value_enum)]
        job: JobKind,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env();

    // Flushes the log file when dropped
    let _guard = initialize_tracing(&config);

    info!("Starting status dashboard v{}", env!("CARGO_PKG_VERSION"));

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return ExitCode::FAILURE;
    }

    let config = Arc::new(config);

    let outcome = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Check => check(&config).await,
        Command::PinHash { url, output } => {
            let url = url.unwrap_or_else(|| config.tailwind_url.clone());
            let output = output.unwrap_or_else(|| config.hash_file.clone());
            pin(&config, &url, &output).await
        }
        Command::Run { job } => run_job(config, job).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Arc<Config>) -> Result<()> {
    info!(
        "Dashboard configuration - Output: {}, Bind: {}, Websites: {}, Feeds: {}",
        config.output_dir.display(),
        config.bind_address,
        config.websites.len(),
        config.feeds.len()
    );

    let renderer = Arc::new(Renderer::new(&config.tailwind_url)?);

    if config.run_integrity_checks {
        let check_config = config.clone();
        tokio::spawn(async move {
            integrity::run_all(&check_config).await;
        });
    }

    let handles = if config.run_jobs {
        scheduler::spawn_all(jobs::build_all(config.clone(), renderer.clone())?)
    } else {
        info!("Background jobs disabled");
        Vec::new()
    };

    let served = server::run(config, renderer).await;

    info!("Shutting down {} background jobs", handles.len());
    for handle in handles {
        handle.abort();
    }

    served
}

async fn check(config: &Config) -> Result<()> {
    let reports = integrity::run_all(config).await;
    println!("{}", serde_json::to_string_pretty(&reports)?);

    let failed = reports.iter().filter(|r| r.status == CheckStatus::Fail).count();
    if failed > 0 {
        return Err(DashboardError::Other(format!("{} integrity checks failed", failed)));
    }
    Ok(())
}

async fn pin(config: &Config, url: &str, output: &Path) -> Result<()> {
    let fetcher = HttpFetcher::new(config.http_timeout, config.insecure_tls)?;
    let digest = pin_hash(&fetcher, url, output).await?;
    println!("{}", digest);
    Ok(())
}

async fn run_job(config: Arc<Config>, kind: JobKind) -> Result<()> {
    let renderer = Arc::new(Renderer::new(&config.tailwind_url)?);
    let job = jobs::build_job(kind, config, renderer)?;

    if scheduler::run_cycle(job.as_ref()).await {
        Ok(())
    } else {
        Err(DashboardError::Other(format!("Job {} failed", job.name())))
    }
}

/// Initialize structured logging, optionally mirrored to a file
fn initialize_tracing(config: &Config) -> Option<WorkerGuard> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = log_file_writer(path);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(file_layer)
        .init();

    guard
}

/// Non-blocking appender for `LOG_FILE`; lines are flushed when the guard drops
fn log_file_writer(path: &Path) -> (NonBlocking, WorkerGuard) {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("integrity.log"));

    let appender = tracing_appender::rolling::never(directory, file_name);
    tracing_appender::non_blocking(appender)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_log_file_is_flushed_when_guard_drops() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("integrity.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let (mut writer, guard) = log_file_writer(&path);
        writer
            .write_all(b"{\"level\":\"ERROR\",\"message\":\"3 integrity checks failed\"}\n")
            .unwrap();
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("3 integrity checks failed"));
    }
}
