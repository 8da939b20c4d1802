//! ViralScope CLI
//!
//! Runs predictions from JSON files and manages the model store.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use viralscope_classifiers::{ArtifactMetadata, ModelArtifact, ModelStore};
use viralscope_core::{PredictionRequest, ViralClass};
use viralscope_service::{PredictionService, Predictor, ServiceConfig};
use viralscope_telemetry::{check_health, describe_metrics, HealthStatus};

#[derive(Parser, Debug)]
#[command(name = "viralscope")]
#[command(about = "Viral potential scoring for short-form videos", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "viralscope.yaml")]
    config: PathBuf,

    /// Model store directory
    #[arg(short, long, global = true, env = "VIRALSCOPE_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print the Prometheus exposition before exiting
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict one video from a JSON request
    Predict {
        /// Request file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },

    /// Predict a JSON array of requests
    Batch {
        /// Request file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },

    /// Install a trained classifier as the current model
    Promote {
        /// Classifier binary
        #[arg(long)]
        model: PathBuf,

        /// Metadata JSON
        #[arg(long)]
        metadata: PathBuf,

        /// Reject models whose test accuracy is below this
        #[arg(long)]
        min_accuracy: Option<f64>,
    },

    /// Restore an archived version
    Rollback {
        /// Archive key to restore
        version: String,
    },

    /// List current and archived versions
    Versions,

    /// Run model health checks
    Health,

    /// Check predicted class drift
    Drift {
        /// Requests to predict before checking
        #[arg(short, long)]
        input: Option<String>,

        /// Reference distribution JSON, e.g. {"low": 0.4, ...}
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Window in hours
        #[arg(long, default_value = "24")]
        window_hours: i64,

        /// Maximum tolerated per-class drift
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Periodically check health and reload the model until stopped
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);
    let metrics_handle = init_metrics()?;

    let mut config = ServiceConfig::load(Some(cli.config.as_path()))
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(model_dir) = &cli.model_dir {
        config = config.with_model_dir(model_dir);
    }
    info!("Model directory: {}", config.model_dir.display());

    let result = run(cli.command, config).await;

    if cli.print_metrics {
        println!("{}", metrics_handle.render());
    }
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

async fn run(command: Command, config: ServiceConfig) -> Result<()> {
    match command {
        Command::Predict { input } => {
            let request: PredictionRequest = read_json(&input)?;
            let predictor = start(config)?;
            print_json(&predictor.predict(&request)?)
        }

        Command::Batch { input } => {
            let requests: Vec<PredictionRequest> = read_json(&input)?;
            let predictor = start(config)?;
            let outcome = predictor.predict_batch(&requests)?;
            print_json(&outcome)?;
            outcome.ensure_complete()?;
            Ok(())
        }

        Command::Promote {
            model,
            metadata,
            min_accuracy,
        } => {
            let bytes = fs::read(&model)
                .with_context(|| format!("Failed to read {}", model.display()))?;
            let metadata: ArtifactMetadata = read_json_file(&metadata)?;
            let store = open_store(&config)?
                .with_min_accuracy(min_accuracy.or(config.min_accuracy));

            let report = store.promote(&ModelArtifact::new(metadata, bytes))?;
            match &report.archived_as {
                Some(key) => info!(
                    "Promoted {} (previous model archived as {})",
                    report.version, key
                ),
                None => info!("Promoted {}", report.version),
            }
            Ok(())
        }

        Command::Rollback { version } => {
            let report = open_store(&config)?.rollback(&version)?;
            info!("Rolled back to {}", report.version);
            Ok(())
        }

        Command::Versions => {
            let store = open_store(&config)?;
            #[derive(Serialize)]
            struct Versions {
                current: Option<String>,
                archive: Vec<String>,
            }
            print_json(&Versions {
                current: store.current_version(),
                archive: store.list_archive()?.into_iter().map(|a| a.key).collect(),
            })
        }

        Command::Health => {
            let store = open_store(&config)?;
            let report = check_health(&store, config.monitor.max_model_age_days);
            print_json(&report)?;
            if report.status == HealthStatus::Unhealthy {
                bail!("model is unhealthy");
            }
            Ok(())
        }

        Command::Drift {
            input,
            reference,
            window_hours,
            threshold,
        } => {
            let predictor = start(config)?;
            if let Some(input) = input {
                let requests: Vec<PredictionRequest> = read_json(&input)?;
                for chunk in requests.chunks(predictor.config().max_batch_size) {
                    predictor.predict_batch(chunk)?;
                }
            }
            let reference: Option<BTreeMap<ViralClass, f64>> =
                reference.as_deref().map(read_json_file).transpose()?;

            let outcome = predictor.detect_drift(
                reference.as_ref(),
                chrono::Duration::hours(window_hours),
                threshold,
            )?;
            print_json(&outcome)
        }

        Command::Watch => watch(config).await,
    }
}

fn start(config: ServiceConfig) -> Result<std::sync::Arc<Predictor>> {
    Ok(PredictionService::new().start(config)?)
}

fn open_store(config: &ServiceConfig) -> Result<ModelStore> {
    Ok(ModelStore::open(&config.model_dir)?)
}

/// Health check and reload every `watch_interval_secs` until a shutdown signal
async fn watch(config: ServiceConfig) -> Result<()> {
    let interval_secs = config.watch_interval_secs;
    let predictor = start(config)?;
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    info!("Watching model store every {}s", interval_secs);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = predictor.check_health();
                if report.status != HealthStatus::Healthy {
                    warn!("Model issues: {}", report.issues().join("; "));
                }
                predictor.reload();
            }
            _ = &mut shutdown => {
                warn!("Shutdown signal received, stopping watch...");
                break;
            }
        }
    }

    info!("Watch stopped");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(input: &str) -> Result<T> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return serde_json::from_str(&buf).context("Invalid JSON on stdin");
    }
    read_json_file(Path::new(input))
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("viralscope=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("viralscope=info"))
    };

    // Logs go to stderr; stdout carries the JSON results
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Initialize the metrics recorder and return a handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;
    describe_metrics();
    Ok(handle)
}
