//! `tabload` loads one tabular file (CSV, XLSX or dBASE) into one SQLite table.
//!
//! The primary entrypoint is [`ingestion::ingest_from_path`], which:
//!
//! 1. picks a reader from the file extension (`.csv`, `.xlsx`, `.dbf`);
//! 2. reads the header row and infers a [`types::ColumnType`] per column;
//! 3. drops and recreates the destination table (named after the file unless overridden);
//! 4. inserts every data row in batches inside a single transaction.
//!
//! ## Type inference
//!
//! CSV and XLSX columns are typed from their values: integers → INTEGER, decimals → NUMERIC,
//! `YYYY-MM-DD[ HH:MM:SS]` → TIMESTAMP, `true`/`false` → BOOLEAN, anything else → TEXT.
//! Under the default [`ingestion::InferencePolicy::AllRows`] the first non-TEXT value of a
//! column decides its type. Columns that stay untyped fall back to a header heuristic: a header
//! containing `id` becomes INTEGER. dBASE columns take their types from the field descriptors.
//!
//! Cells that cannot be represented under their column's type are logged and loaded as NULL.
//!
//! ## Quick example
//!
//! ```
//! use rusqlite::Connection;
//! use tabload::ingestion::{ingest, IngestionOptions};
//! use tabload::types::ColumnType;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut conn = Connection::open_in_memory()?;
//! let csv = "ID,NAME,SALARY,ACTIVE\n1,Ada,5000.50,true\n2,Grace,6100.00,false\n";
//!
//! let summary = ingest("staff.csv", csv.as_bytes(), &mut conn, &IngestionOptions::default())?;
//! assert_eq!(summary.rows_inserted, 2);
//! assert_eq!(summary.columns[2], ("SALARY".to_string(), ColumnType::Numeric));
//!
//! let n: i64 = conn.query_row("SELECT COUNT(*) FROM \"staff\"", [], |r| r.get(0))?;
//! assert_eq!(n, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: format readers and the unified entrypoints
//! - [`schema`]: identifier validation and DROP/CREATE
//! - [`loader`]: cell coercion and the batched insert
//! - [`config`]: YAML configuration
//! - [`logging`]: `tracing` subscriber setup
//! - [`types`]: shared data model
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod ingestion;
pub mod loader;
pub mod logging;
pub mod schema;
pub mod types;

pub use error::{ErrorKind, IngestionError, IngestionResult};
