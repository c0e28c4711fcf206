//! CSV reader.
//!
//! Rules:
//!
//! - line 1 is the header row;
//! - rows may be shorter or longer than the header (missing cells load as NULL, extra cells are
//!   ignored);
//! - every cell is text until coerced.

use crate::error::{IngestionError, IngestionResult};
use crate::loader::coerce::{CoercionError, coerce_text};
use crate::types::{ColumnType, ColumnTypeMap, HeaderMap, SqlValue};

use super::reader::{Cell, FormatReader, InferencePolicy, RowIter, classify_text, infer_column_types};
use super::unified::IngestionFormat;

/// [`FormatReader`] for comma-separated files.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReader {
    policy: InferencePolicy,
}

impl CsvReader {
    pub fn new(policy: InferencePolicy) -> Self {
        Self { policy }
    }
}

fn csv_reader(source: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source)
}

impl FormatReader for CsvReader {
    type Cell = String;

    fn format(&self) -> IngestionFormat {
        IngestionFormat::Csv
    }

    fn read_headers(&self, source: &[u8]) -> IngestionResult<HeaderMap> {
        let mut rdr = csv_reader(source);
        let headers = rdr.headers()?;
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(IngestionError::malformed("csv has no header row"));
        }
        Ok(headers
            .iter()
            .enumerate()
            .map(|(idx, h)| (idx, h.to_string()))
            .collect())
    }

    fn determine_column_types(&self, source: &[u8]) -> IngestionResult<ColumnTypeMap> {
        let headers = self.read_headers(source)?;
        infer_column_types(&headers, self.read_rows(source)?, self.policy)
    }

    fn read_rows<'a>(&self, source: &'a [u8]) -> IngestionResult<RowIter<'a, String>> {
        let records = csv_reader(source).into_records().map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(IngestionError::from)
        });
        Ok(Box::new(records))
    }
}

impl Cell for String {
    fn classify(&self) -> ColumnType {
        classify_text(self)
    }

    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }

    fn coerce(&self, ty: ColumnType) -> Result<SqlValue, CoercionError> {
        coerce_text(self, ty)
    }
}
