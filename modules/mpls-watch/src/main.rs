use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mpls_watch::adapters::{AdapterKind, AdapterRegistration};
use mpls_watch::extractor::GazetteerOnlyExtractor;
use mpls_watch::notifier;
use mpls_watch::pipeline::{self, PipelineStats};
use mpls_watch::scheduler::{Scheduler, SchedulerConfig};
use mpls_watch::store::{MemoryStore, PostgresStore, Store};
use mpls_watch_common::Config;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// mpls-watch: ingest, correlate, and alert on Minneapolis-area enforcement
/// activity reports from pluggable source adapters.
#[derive(Parser, Debug)]
#[command(name = "mpls-watch")]
struct Cli {
    /// Route notifications to a log sink instead of the configured webhook,
    /// and tolerate a missing webhook_url.
    #[arg(long)]
    dry_run: bool,

    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Path to a TOML configuration file. Falls back to built-in defaults
    /// plus environment overrides if omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
#[clap(rename_all = "UPPER")]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "mpls_watch=debug",
            LogLevel::Info => "mpls_watch=info",
            LogLevel::Warn => "mpls_watch=warn",
            LogLevel::Error => "mpls_watch=error",
        }
    }
}

const EXIT_CONFIG_ERROR: i32 = 1;
const EXIT_STORE_ERROR: i32 = 2;
const EXIT_SIGNAL: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_directive())),
        )
        .init();

    info!("mpls-watch starting");

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };
    if cli.dry_run {
        config.dry_run = true;
    }
    config.log_redacted();

    let exit_code = run(config).await;
    std::process::exit(exit_code);
}

async fn run(config: Config) -> i32 {
    let store: Arc<dyn Store> = if config.database_url.is_empty() {
        info!("no database_url configured, using in-memory Store");
        Arc::new(MemoryStore::new())
    } else {
        match PostgresStore::connect(&config.database_url).await {
            Ok(store) => {
                if let Err(e) = store.ensure_schema().await {
                    error!(error = %e, "failed to prepare Store schema");
                    return EXIT_STORE_ERROR;
                }
                Arc::new(store)
            }
            Err(e) => {
                error!(error = %e, "failed to connect to Store");
                return EXIT_STORE_ERROR;
            }
        }
    };

    let backend: Arc<dyn notifier::NotifyBackend> = match notifier::build_backend(
        &config.webhook_url,
        std::time::Duration::from_secs(config.webhook_timeout_secs),
        config.dry_run,
    ) {
        Ok(backend) => Arc::from(backend),
        Err(e) => {
            error!(error = %e, "notifier configuration error");
            return EXIT_CONFIG_ERROR;
        }
    };

    let name_extractor = Arc::new(GazetteerOnlyExtractor);

    let (adapters, source_kinds) = build_adapters(&config);
    if adapters.is_empty() {
        warn!("no source adapters registered; the pipeline will idle until adapters are configured");
    }

    let scheduler = Scheduler::new(SchedulerConfig {
        queue_capacity: config.poll_queue_capacity,
        adapter_deadline: std::time::Duration::from_secs(config.adapter_deadline_secs),
        shutdown_grace: std::time::Duration::from_secs(config.shutdown_grace_secs),
        max_consecutive_transient_failures: config.max_consecutive_transient_failures,
    });
    let (tx, rx) = scheduler.make_queue();
    let (handles, shutdown_tx) = scheduler.spawn_all(adapters, tx);

    let stats = Arc::new(PipelineStats::default());
    let shutdown_grace = std::time::Duration::from_secs(config.shutdown_grace_secs);
    let mut pipeline_task = tokio::spawn(pipeline::run(
        rx,
        store.clone(),
        backend,
        name_extractor,
        config,
        source_kinds,
        stats.clone(),
    ));

    let exit_code = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            EXIT_SIGNAL
        }
        result = &mut pipeline_task => {
            if let Err(e) = result {
                error!(error = %e, "pipeline task panicked");
            } else {
                warn!("pipeline task exited on its own (queue closed)");
            }
            0
        }
    };

    scheduler.shutdown(shutdown_tx, handles).await;
    if tokio::time::timeout(shutdown_grace, &mut pipeline_task).await.is_err() {
        warn!("pipeline did not drain within the shutdown grace period");
        pipeline_task.abort();
    }
    store.close().await;

    info!(
        processed = stats.processed.load(std::sync::atomic::Ordering::Relaxed),
        alerts_sent = stats.alerts_sent.load(std::sync::atomic::Ordering::Relaxed),
        "mpls-watch shut down"
    );

    exit_code
}

/// Build adapters from configuration. Scraping mechanics for any
/// individual source are out of scope for this crate (spec §4.1): adapters
/// are pluggable collectors supplied by operators implementing
/// `SourceAdapter`. This binary ships the scheduler/pipeline wiring only,
/// and logs a warning for every enabled source it has no factory for.
fn build_adapters(config: &Config) -> (Vec<AdapterRegistration>, HashMap<String, AdapterKind>) {
    let source_kinds = HashMap::new();
    let adapters = Vec::new();

    for (name, source_config) in &config.sources {
        if !source_config.enabled {
            continue;
        }
        warn!(source = %name, "no adapter factory registered for this source; skipping");
    }

    (adapters, source_kinds)
}
