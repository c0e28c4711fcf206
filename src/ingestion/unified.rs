//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest_from_path`], which loads one file into one table of a SQLite
//! database and returns a [`LoadSummary`].
//!
//! - If [`IngestionOptions::format`] is `None`, the format is inferred from the file extension
//!   (`csv`, `xlsx`, `dbf`; case-insensitive).
//! - If [`IngestionOptions::table_name`] is `None`, the table is named after the file's base name.
//! - If an [`IngestionObserver`] is provided, success/failure/alerts are reported to it.
//!
//! The source is buffered once; the header, type-inference and data passes each read that
//! buffer from the start.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;

use crate::error::{IngestionError, IngestionResult};
use crate::loader::{DEFAULT_BATCH_SIZE, LoadOptions, insert_data};
use crate::schema::{column_definitions, create_table, sanitize_header, split_file_name, validate_schema};
use crate::types::{ColumnTypeMap, HeaderMap, LoadSummary};

use super::csv::CsvReader;
use super::dbf::DbfReader;
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::reader::{FormatReader, InferencePolicy, default_type_for_header};

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestionFormat {
    /// Comma-separated values.
    Csv,
    /// Excel workbook (first sheet only; feature-gated behind `excel`).
    Excel,
    /// dBASE table.
    Dbf,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Excel),
            "dbf" => Some(Self::Dbf),
            _ => None,
        }
    }
}

/// Per-format switch for dropping rows whose header columns are all blank.
///
/// dBASE has no flag: its deleted records are always skipped by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlankRowPolicy {
    pub csv: bool,
    pub xlsx: bool,
}

impl Default for BlankRowPolicy {
    fn default() -> Self {
        Self { csv: false, xlsx: true }
    }
}

impl BlankRowPolicy {
    /// Whether blank rows are skipped for `format`.
    pub fn skips(&self, format: IngestionFormat) -> bool {
        match format {
            IngestionFormat::Csv => self.csv,
            IngestionFormat::Excel => self.xlsx,
            IngestionFormat::Dbf => false,
        }
    }
}

/// Options controlling unified ingestion behavior.
///
/// Use [`Default`] for common cases, or build one from a [`crate::config::LoaderConfig`].
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
    /// If `None`, the table is named after the file (see [`split_file_name`]).
    pub table_name: Option<String>,
    /// Rows per executed batch.
    pub batch_size: usize,
    /// How many rows type inference inspects.
    pub inference: InferencePolicy,
    /// Blank-row handling per format.
    pub skip_blank_rows: BlankRowPolicy,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("table_name", &self.table_name)
            .field("batch_size", &self.batch_size)
            .field("inference", &self.inference)
            .field("skip_blank_rows", &self.skip_blank_rows)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            table_name: None,
            batch_size: DEFAULT_BATCH_SIZE,
            inference: InferencePolicy::default(),
            skip_blank_rows: BlankRowPolicy::default(),
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Load an in-memory source into the destination.
///
/// `file_name` selects the format (unless [`IngestionOptions::format`] is set) and names the
/// table (unless [`IngestionOptions::table_name`] is set). The table is dropped and recreated,
/// then every data row is inserted in a single transaction.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row/batch stats
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Errors
///
/// - [`IngestionError::UnsupportedFormat`] for an unknown extension, before anything is read
/// - identifier/schema errors before any statement reaches the destination
/// - decoding errors from the format reader
/// - [`IngestionError::LoadFailure`] if inserting fails; the load is rolled back
///
/// # Examples
///
/// ```
/// use rusqlite::Connection;
/// use tabload::ingestion::{ingest, IngestionOptions};
///
/// # fn main() -> Result<(), tabload::IngestionError> {
/// let mut conn = Connection::open_in_memory().unwrap();
/// let csv = b"ID,NAME\n1,Ada\n2,Grace\n";
///
/// let summary = ingest("people.csv", csv, &mut conn, &IngestionOptions::default())?;
/// assert_eq!(summary.table, "people");
/// assert_eq!(summary.rows_inserted, 2);
/// # Ok(())
/// # }
/// ```
pub fn ingest(
    file_name: &str,
    source: &[u8],
    conn: &mut Connection,
    options: &IngestionOptions,
) -> IngestionResult<LoadSummary> {
    let ctx = resolve_context(file_name, options)?;
    observed(&ctx, options, || dispatch(&ctx, source, conn, options))
}

/// Buffer `reader` fully, then [`ingest`] it.
pub fn ingest_from_reader<R: Read>(
    file_name: &str,
    mut reader: R,
    conn: &mut Connection,
    options: &IngestionOptions,
) -> IngestionResult<LoadSummary> {
    let ctx = resolve_context(file_name, options)?;
    observed(&ctx, options, || {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        dispatch(&ctx, &buffer, conn, options)
    })
}

/// Read the file at `path`, then [`ingest`] it.
///
/// # Examples
///
/// ## Auto-detect by extension
///
/// ```no_run
/// use rusqlite::Connection;
/// use tabload::ingestion::{ingest_from_path, IngestionOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = Connection::open("warehouse.db")?;
/// // Loads into table "employees".
/// let summary = ingest_from_path("exports/employees.dbf", &mut conn, &IngestionOptions::default())?;
/// println!("rows={}", summary.rows_inserted);
/// # Ok(())
/// # }
/// ```
///
/// ## Observability (tracing + alert threshold)
///
/// ```no_run
/// use std::sync::Arc;
///
/// use rusqlite::Connection;
/// use tabload::ingestion::{ingest_from_path, IngestionOptions, IngestionSeverity, TracingObserver};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = Connection::open_in_memory()?;
/// let opts = IngestionOptions {
///     observer: Some(Arc::new(TracingObserver)),
///     alert_at_or_above: IngestionSeverity::Critical,
///     ..Default::default()
/// };
///
/// // Missing files are treated as Critical and will trigger `on_alert` at this threshold.
/// let _err = ingest_from_path("does_not_exist.csv", &mut conn, &opts).unwrap_err();
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_path(
    path: impl AsRef<Path>,
    conn: &mut Connection,
    options: &IngestionOptions,
) -> IngestionResult<LoadSummary> {
    let path = path.as_ref();
    let ctx = resolve_context(&path.to_string_lossy(), options)?;
    observed(&ctx, options, || {
        let buffer = std::fs::read(path)?;
        dispatch(&ctx, &buffer, conn, options)
    })
}

fn resolve_context(file_name: &str, options: &IngestionOptions) -> IngestionResult<IngestionContext> {
    let (derived_table, extension) = split_file_name(file_name)?;
    let format = match options.format {
        Some(f) => f,
        None => IngestionFormat::from_extension(&extension)
            .ok_or(IngestionError::UnsupportedFormat { extension })?,
    };
    Ok(IngestionContext {
        file_name: file_name.to_string(),
        format,
        table: options.table_name.clone().unwrap_or(derived_table),
    })
}

fn observed<F>(ctx: &IngestionContext, options: &IngestionOptions, run: F) -> IngestionResult<LoadSummary>
where
    F: FnOnce() -> IngestionResult<LoadSummary>,
{
    let span = tracing::info_span!(
        "ingest",
        file = %ctx.file_name,
        format = ?ctx.format,
        table = %ctx.table
    );
    let result = span.in_scope(run);

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(summary) => obs.on_success(
                ctx,
                IngestionStats {
                    rows: summary.rows_inserted,
                    batches: summary.batches,
                    null_substitutions: summary.null_substitutions,
                },
            ),
            Err(e) => {
                let sev = IngestionSeverity::for_error(e);
                obs.on_failure(ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(ctx, sev, e);
                }
            }
        }
    }

    result
}

fn dispatch(
    ctx: &IngestionContext,
    source: &[u8],
    conn: &mut Connection,
    options: &IngestionOptions,
) -> IngestionResult<LoadSummary> {
    match ctx.format {
        IngestionFormat::Csv => run_pipeline(&CsvReader::new(options.inference), source, conn, &ctx.table, options),
        IngestionFormat::Dbf => run_pipeline(&DbfReader, source, conn, &ctx.table, options),
        IngestionFormat::Excel => {
            #[cfg(feature = "excel")]
            {
                use super::excel::ExcelReader;
                run_pipeline(&ExcelReader::new(options.inference), source, conn, &ctx.table, options)
            }

            #[cfg(not(feature = "excel"))]
            {
                let _ = (source, conn);
                Err(IngestionError::UnsupportedFormat {
                    extension: "xlsx (cargo feature 'excel' is disabled)".to_string(),
                })
            }
        }
    }
}

/// Header pass, type pass, DDL, then the data pass.
fn run_pipeline<R: FormatReader>(
    reader: &R,
    source: &[u8],
    conn: &mut Connection,
    table_name: &str,
    options: &IngestionOptions,
) -> IngestionResult<LoadSummary> {
    let headers: HeaderMap = reader
        .read_headers(source)?
        .into_iter()
        .map(|(idx, name)| (idx, sanitize_header(&name)))
        .collect();
    validate_schema(&headers, table_name)?;

    let inferred = reader.determine_column_types(source)?;
    let column_types: ColumnTypeMap = headers
        .iter()
        .map(|(idx, name)| {
            let ty = inferred
                .get(idx)
                .copied()
                .unwrap_or_else(|| default_type_for_header(name));
            (*idx, ty)
        })
        .collect();
    tracing::debug!(columns = headers.len(), "schema resolved");

    create_table(conn, &headers, &column_types, table_name)?;

    let load_options = LoadOptions {
        batch_size: options.batch_size,
        skip_blank_rows: options.skip_blank_rows.skips(reader.format()),
    };
    let stats = insert_data(
        conn,
        &headers,
        &column_types,
        table_name,
        reader.read_rows(source)?,
        load_options,
    )?;

    Ok(LoadSummary {
        table: table_name.to_string(),
        columns: column_definitions(&headers, &column_types),
        rows_inserted: stats.rows_inserted,
        batches: stats.batches,
        null_substitutions: stats.null_substitutions,
    })
}

/// Convenience helper for callers that want an owned request object.
///
/// This can be useful if you want to enqueue ingestion work in a job system.
#[derive(Clone)]
pub struct IngestionRequest {
    /// Path to the input file.
    pub path: PathBuf,
    /// Options controlling ingestion.
    pub options: IngestionOptions,
}

impl fmt::Debug for IngestionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionRequest")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish()
    }
}

impl IngestionRequest {
    /// Execute the request by calling [`ingest_from_path`].
    pub fn run(&self, conn: &mut Connection) -> IngestionResult<LoadSummary> {
        ingest_from_path(&self.path, conn, &self.options)
    }
}
