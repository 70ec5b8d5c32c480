//! ingress-backends
//!
//! Drives reconciliation cycles of the backend store from cluster snapshot
//! files and prints what a renderer would have to regenerate.
//!
//! # Architecture Overview
//!
//! ```text
//!   snapshot file ──▶ reconcile::request ──▶ reconcile::cycle ──▶ CycleReport
//!                                               │      ▲               │
//!                                               ▼      │               ▼
//!                                  cluster (cache, endpoints)   reconcile::plan
//!                                               │                      │
//!                                               ▼                      ▼
//!                                   backend::Backends store ──▶ changed shards
//!                                     (shards, add/del, shrink)   (stdout JSON)
//! ```

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use ingress_backends::backend::Backends;
use ingress_backends::cluster::SnapshotCache;
use ingress_backends::config::{load_config, ControllerConfig, FileWatcher};
use ingress_backends::observability::logging;
use ingress_backends::reconcile::{load_snapshot, render_plan, CycleReport, Reconciler, Snapshot};

#[derive(Parser)]
#[command(name = "ingress-backends")]
#[command(about = "Backend reconciliation driver for the ingress controller", long_about = None)]
struct Cli {
    /// Controller configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Include the per-shard render plan in the output.
    #[arg(long)]
    plan: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one cycle per snapshot file, in order, against a single store
    Run {
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,
    },
    /// Run a cycle whenever the snapshot or the configuration changes
    Watch { snapshot: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ControllerConfig::default(),
    };
    logging::init(&config.observability.log_level);

    tracing::info!(
        shards = config.store.shards,
        cookie_strategy = %config.resolver.cookie_strategy,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Run { snapshots } => run(&config, &snapshots, cli.plan),
        Commands::Watch { snapshot } => watch(config, cli.config.as_deref(), &snapshot, cli.plan).await,
    }
}

fn run(config: &ControllerConfig, snapshots: &[PathBuf], plan: bool) -> Result<(), Box<dyn Error>> {
    let reconciler = Reconciler::from_config(config)?;
    let mut backends = Backends::new(config.store.shards);
    for path in snapshots {
        let snapshot = load_snapshot(path)?;
        cycle(&reconciler, &mut backends, snapshot, plan)?;
    }
    Ok(())
}

async fn watch(
    mut config: ControllerConfig,
    config_path: Option<&Path>,
    snapshot_path: &Path,
    plan: bool,
) -> Result<(), Box<dyn Error>> {
    let mut reconciler = Reconciler::from_config(&config)?;
    let mut backends = Backends::new(config.store.shards);
    let mut snapshot = load_snapshot(snapshot_path)?;
    cycle(&reconciler, &mut backends, snapshot.clone(), plan)?;

    let (snapshot_watcher, mut snapshot_rx) = FileWatcher::new(snapshot_path, load_snapshot);
    let _snapshot_handle = snapshot_watcher.run()?;
    let (mut config_rx, _config_handle) = match config_path {
        Some(path) => {
            let (watcher, rx) = FileWatcher::new(path, load_config);
            (Some(rx), Some(watcher.run()?))
        }
        None => (None, None),
    };

    loop {
        tokio::select! {
            Some(next) = snapshot_rx.recv() => {
                snapshot = next;
            }
            Some(next) = recv_opt(&mut config_rx) => {
                backends.reshard(next.store.shards);
                match Reconciler::from_config(&next) {
                    Ok(next_reconciler) => reconciler = next_reconciler,
                    Err(e) => tracing::error!(error = %e, "Keeping previous cookie resolver"),
                }
                config = next;
                tracing::info!(shards = config.store.shards, "Configuration reloaded");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, stopping");
                break;
            }
        }
        cycle(&reconciler, &mut backends, snapshot.clone(), plan)?;
    }
    Ok(())
}

fn cycle(
    reconciler: &Reconciler,
    backends: &mut Backends,
    snapshot: Snapshot,
    plan: bool,
) -> Result<(), serde_json::Error> {
    let cache = SnapshotCache::new(snapshot.objects);
    let report = reconciler.run_cycle(backends, &cache, &snapshot.backends);
    print_cycle(backends, &report, plan)?;
    backends.commit();
    Ok(())
}

fn print_cycle(backends: &Backends, report: &CycleReport, plan: bool) -> Result<(), serde_json::Error> {
    let output = if plan {
        serde_json::json!({
            "report": report,
            "reload_required": report.reload_required(),
            "shards": render_plan(backends, &report.changed_shards),
        })
    } else {
        serde_json::json!({
            "report": report,
            "reload_required": report.reload_required(),
        })
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn recv_opt<T>(rx: &mut Option<mpsc::UnboundedReceiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
