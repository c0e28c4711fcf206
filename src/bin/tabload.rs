use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rusqlite::Connection;
use tabload::config::LoaderConfig;
use tabload::ingestion::{IngestionRequest, TracingObserver};
use tabload::logging;
use tracing::info;

/// Load a CSV, XLSX or DBF file into a SQLite table.
#[derive(Parser, Debug)]
#[command(name = "tabload", version)]
struct Args {
    /// YAML loader configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// SQLite database file (overrides `database.path`).
    #[arg(short, long)]
    database: Option<PathBuf>,
    /// Destination table (defaults to the file's base name).
    #[arg(short, long)]
    table: Option<String>,
    /// Rows per batch (overrides `loader.batch_size`).
    #[arg(long)]
    batch_size: Option<usize>,
    /// Source file.
    file: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => LoaderConfig::from_path(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    logging::init(&cfg.logging).context("init logging")?;

    let Some(db_path) = args.database.clone().or_else(|| cfg.database.path.clone()) else {
        bail!("no database given: pass --database or set database.path in the config");
    };

    let mut options = cfg.to_options();
    options.table_name = args.table.clone();
    options.observer = Some(Arc::new(TracingObserver));
    if let Some(batch_size) = args.batch_size {
        options.batch_size = batch_size;
    }

    let mut conn =
        Connection::open(&db_path).with_context(|| format!("open database {}", db_path.display()))?;

    let request = IngestionRequest {
        path: args.file.clone(),
        options,
    };
    let summary = request
        .run(&mut conn)
        .with_context(|| format!("ingest {}", args.file.display()))?;

    info!(table = %summary.table, rows = summary.rows_inserted, "done");
    println!("{} rows loaded into \"{}\"", summary.rows_inserted, summary.table);
    Ok(())
}
