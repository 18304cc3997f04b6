//! Recompute the cluster table of a snapshot file from a JSON points dump.
//!
//! Reads points from `--points` (stdin when absent) and installs the new
//! table into `--snapshot`. Run it after the source data changes.

use clap::Parser;
use geocluster::{ClusterError, Config, JsonPoints, Reclusterer, SnapshotStore};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Snapshot file holding the served cluster table
    #[arg(short, long, default_value = "clusters.snap")]
    snapshot: PathBuf,

    /// JSON array of {"id", "latitude", "longitude"} records
    #[arg(short, long)]
    points: Option<PathBuf>,

    /// Clustering config, JSON or (with the `toml` feature) TOML
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_config(path: &Path) -> geocluster::Result<Config> {
    let text = std::fs::read_to_string(path)?;
    #[cfg(feature = "toml")]
    if path.extension().is_some_and(|ext| ext == "toml") {
        return Config::from_toml(&text).map_err(|e| ClusterError::InvalidInput(e.to_string()));
    }
    Config::from_json(&text).map_err(|e| ClusterError::InvalidInput(e.to_string()))
}

fn recluster(args: Args) -> geocluster::Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let points = match &args.points {
        Some(path) => JsonPoints::from_path(path)?,
        None => JsonPoints::from_reader(io::stdin().lock())?,
    };

    log::info!("opening snapshot at {}", args.snapshot.display());
    let store = Arc::new(SnapshotStore::open(&args.snapshot)?);
    let summary = Reclusterer::new(store, config)?.run(&points)?;

    println!(
        "{} points clustered, {} skipped, {} rows over {} zoom levels",
        summary.accepted, summary.skipped, summary.rows_written, summary.zoom_levels
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match recluster(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("recluster failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
