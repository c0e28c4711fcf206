//! Format readers and the ingestion entrypoints.
//!
//! Most callers should use [`ingest_from_path`] (from [`unified`]) which:
//!
//! - picks a reader by file extension (or you can override via [`IngestionOptions`])
//! - drops and recreates the destination table from the inferred schema
//! - loads every row in one transaction
//! - optionally reports success/failure/alerts to an [`IngestionObserver`]
//!
//! Format readers are also available on their own under:
//! - [`csv`]
//! - [`excel`] (feature `excel`)
//! - [`dbf`]

pub mod csv;
pub mod dbf;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;
pub mod reader;
pub mod unified;

pub use observability::{
    CompositeObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats, TracingObserver,
};
pub use reader::{Cell, FormatReader, InferencePolicy};
pub use unified::{
    BlankRowPolicy, IngestionFormat, IngestionOptions, IngestionRequest, ingest, ingest_from_path, ingest_from_reader,
};
