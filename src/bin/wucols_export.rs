//! wucols-export CLI
//!
//! Runs one cache refresh (meant to be triggered by an external scheduler),
//! assembles the dataset without touching the cache, or prints cache status.
//!
//! Usage:
//!   wucols-export refresh
//!   wucols-export assemble --output wucols.json
//!   wucols-export --config config/export.yaml status
//!
//! Config comes from the optional YAML file, then `WUCOLS_*` environment
//! variables (a `.env` file is loaded first if present).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use wucols_export::cache::{CacheRefreshCoordinator, FsStore, RunOutcome, SnapshotStore};
use wucols_export::catalog::{DatasetAssembler, DatasetSource, ReferenceData};
use wucols_export::jsonapi::{HttpPageSource, RetryPolicy, RetryingPageSource};
use wucols_export::ExportConfig;

#[derive(Parser, Debug)]
#[command(name = "wucols-export")]
#[command(about = "Export the WUCOLS plant catalog into the snapshot cache")]
struct Args {
    /// YAML configuration file
    #[arg(long, short = 'c', env = "WUCOLS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, compare with the cached snapshot and publish on change
    Refresh,
    /// Fetch and assemble the dataset without touching the cache
    Assemble {
        /// Write the dataset here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Show the pointer and the snapshots in the cache
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wucols_export=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ExportConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Refresh => refresh(&config).await,
        Command::Assemble { output, pretty } => assemble(&config, output, pretty).await,
        Command::Status => status(&config).await,
    }
}

fn assembler(config: &ExportConfig) -> Result<DatasetAssembler> {
    let reference = ReferenceData::from_file(&config.reference_data).with_context(|| {
        format!(
            "Failed to load reference data from {}",
            config.reference_data.display()
        )
    })?;
    let source = Arc::new(RetryingPageSource::new(
        HttpPageSource::new(&config.http)?,
        RetryPolicy::from(&config.http),
    ));
    Ok(DatasetAssembler::new(source, config, reference)?)
}

fn snapshot_store(config: &ExportConfig) -> SnapshotStore {
    let store = FsStore::new(&config.store_dir, config.public_base_url.clone());
    SnapshotStore::new(Arc::new(store), config.dataset_name.clone())
}

async fn refresh(config: &ExportConfig) -> Result<()> {
    let coordinator =
        CacheRefreshCoordinator::new(Arc::new(assembler(config)?), snapshot_store(config));
    let report = coordinator.run().await.context("Cache refresh failed")?;

    tracing::info!(
        run_id = %report.run_id,
        plants = report.plant_count,
        pages = report.pages,
        warnings = report.warnings.len(),
        sha256 = %report.content_sha256,
        "Run complete"
    );
    match &report.outcome {
        RunOutcome::Unchanged { snapshot } => {
            tracing::info!(snapshot = %snapshot.url, "Cache unchanged")
        }
        RunOutcome::Published { snapshot, previous } => tracing::info!(
            snapshot = %snapshot.url,
            previous = previous.as_ref().map(|p| p.url.as_str()).unwrap_or("-"),
            "Published new snapshot"
        ),
    }
    Ok(())
}

async fn assemble(config: &ExportConfig, output: Option<PathBuf>, pretty: bool) -> Result<()> {
    let assembled = assembler(config)?
        .assemble()
        .await
        .context("Failed to assemble dataset")?;

    let body = if pretty {
        serde_json::to_vec_pretty(&assembled.dataset)?
    } else {
        assembled.dataset.to_bytes()?
    };

    match output {
        Some(path) => {
            tokio::fs::write(&path, &body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                plants = assembled.dataset.plants.len(),
                warnings = assembled.warnings.len(),
                "Dataset written"
            );
        }
        None => {
            use tokio::io::AsyncWriteExt;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&body).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

async fn status(config: &ExportConfig) -> Result<()> {
    let status = snapshot_store(config)
        .status()
        .await
        .context("Failed to read cache status")?;

    let report = serde_json::json!({
        "pointer": status.pointer.as_ref().map(|p| p.cached_blob_url.as_str()),
        "current": status.current.as_ref().map(|a| a.path.as_str()),
        "snapshots": status.snapshots.iter().map(|s| serde_json::json!({
            "path": s.path,
            "size": s.size,
            "lastModified": s.last_modified.map(|t| t.to_rfc3339()),
        })).collect::<Vec<_>>(),
        "orphans": status.orphans.iter().map(|s| s.path.as_str()).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
