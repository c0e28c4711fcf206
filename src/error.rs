use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Coarse classification of an [`IngestionError`].
///
/// Identifier and format problems are always detected before the destination is touched;
/// [`ErrorKind::Load`] failures happen inside the load transaction and are rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source could not be decoded (missing header, broken CSV/XLSX/DBF structure).
    MalformedSource,
    /// The file extension does not name a supported format.
    UnsupportedFormat,
    /// An identifier failed validation or the backend rejected the DDL.
    Schema,
    /// The backend failed while inserting or committing.
    Load,
    /// Underlying I/O failure while reading the source.
    Io,
    /// Invalid loader configuration.
    Config,
}

/// Error type returned by ingestion functions.
///
/// This is a single error enum shared across CSV/XLSX/DBF ingestion and the load path.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Workbook decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::XlsxError),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The source has no decodable header or a structurally broken body.
    #[error("malformed source: {message}")]
    MalformedSource { message: String },

    /// No reader exists for this file extension.
    #[error("unsupported file format: '{extension}'")]
    UnsupportedFormat { extension: String },

    /// A table or column name is not a safe SQL identifier.
    #[error("invalid SQL identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    /// Schema-level problem that is not tied to one identifier (empty header set, etc.).
    #[error("schema error: {message}")]
    Schema { message: String },

    /// The destination rejected a DROP/CREATE statement.
    #[error("schema statement rejected ({sql}): {source}")]
    SchemaRejected {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The destination failed while inserting rows or committing; the load was rolled back.
    #[error("load failed after {rows_attempted} rows: {source}")]
    LoadFailure {
        rows_attempted: usize,
        #[source]
        source: rusqlite::Error,
    },

    /// Loader configuration could not be parsed.
    #[error("config error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Loader configuration parsed but is not usable.
    #[error("config error: {message}")]
    Config { message: String },
}

impl IngestionError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSource {
            message: message.into(),
        }
    }

    /// Classify this error into the loader's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            #[cfg(feature = "excel")]
            Self::Excel(_) => ErrorKind::MalformedSource,
            Self::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => ErrorKind::Io,
                _ => ErrorKind::MalformedSource,
            },
            Self::MalformedSource { .. } => ErrorKind::MalformedSource,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::InvalidIdentifier { .. } | Self::Schema { .. } | Self::SchemaRejected { .. } => {
                ErrorKind::Schema
            }
            Self::LoadFailure { .. } => ErrorKind::Load,
            Self::ConfigParse(_) | Self::Config { .. } => ErrorKind::Config,
        }
    }
}
