//! The format-reader abstraction and the shared column-type inference rules.
//!
//! Each supported format implements [`FormatReader`]: it can read the header, infer per-column
//! [`ColumnType`]s, and stream data rows of its native [`Cell`] type. Every method takes the
//! whole source as a byte slice and reads it from the start, so the orchestrator can run the
//! three passes over one in-memory buffer.

use crate::error::IngestionResult;
use crate::loader::coerce::{CoercionError, parse_timestamp};
use crate::types::{ColumnType, ColumnTypeMap, HeaderMap, SqlValue};

use super::unified::IngestionFormat;

/// Header that always stays free-form text, whatever its values look like.
pub const FREEFORM_NAME_MARKER: &str = "FIO";

/// Boxed iterator over decoded data rows (header excluded).
pub type RowIter<'a, C> = Box<dyn Iterator<Item = IngestionResult<Vec<C>>> + 'a>;

/// How many data rows are inspected when inferring column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferencePolicy {
    /// Classify from the first data row only.
    FirstRow,
    /// Scan all data rows; the first non-TEXT classification of a column wins.
    #[default]
    AllRows,
}

/// A raw, format-native cell value.
pub trait Cell {
    /// Classify a single value for type inference.
    fn classify(&self) -> ColumnType;

    /// `true` for empty / missing values.
    fn is_blank(&self) -> bool;

    /// Convert to a bindable value for a column of type `ty`.
    ///
    /// Blank cells yield `Ok(SqlValue::Null(ty))`; values that cannot be represented yield a
    /// [`CoercionError`], which the loader turns into NULL.
    fn coerce(&self, ty: ColumnType) -> Result<SqlValue, CoercionError>;
}

/// A reader for one tabular file format.
pub trait FormatReader {
    /// Native cell representation of this format.
    type Cell: Cell;

    /// The format handled by this reader.
    fn format(&self) -> IngestionFormat;

    /// Read column names, keyed by zero-based column index.
    fn read_headers(&self, source: &[u8]) -> IngestionResult<HeaderMap>;

    /// Infer a type for every header column.
    fn determine_column_types(&self, source: &[u8]) -> IngestionResult<ColumnTypeMap>;

    /// Iterate data rows. Row vectors are indexed by column index.
    fn read_rows<'a>(&self, source: &'a [u8]) -> IngestionResult<RowIter<'a, Self::Cell>>;
}

/// Classify a textual value: empty → TEXT, integer → INTEGER, decimal with a fractional
/// separator → NUMERIC, timestamp → TIMESTAMP, `true`/`false` → BOOLEAN, anything else → TEXT.
pub fn classify_text(value: &str) -> ColumnType {
    let v = value.trim();
    if v.is_empty() {
        return ColumnType::Text;
    }
    if v.parse::<i64>().is_ok() {
        return ColumnType::Integer;
    }
    if v.contains('.') && v.parse::<f64>().is_ok_and(f64::is_finite) {
        return ColumnType::Numeric;
    }
    if parse_timestamp(v).is_some() {
        return ColumnType::Timestamp;
    }
    if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false") {
        return ColumnType::Boolean;
    }
    ColumnType::Text
}

/// Type for a column whose values never produced a non-TEXT classification.
pub fn default_type_for_header(header: &str) -> ColumnType {
    if header.eq_ignore_ascii_case(FREEFORM_NAME_MARKER) {
        ColumnType::Text
    } else if header.to_lowercase().contains("id") {
        ColumnType::Integer
    } else {
        ColumnType::Text
    }
}

/// Infer column types for `headers` by scanning `rows` under `policy`.
///
/// The result covers exactly the header index set.
pub(crate) fn infer_column_types<C, I>(
    headers: &HeaderMap,
    rows: I,
    policy: InferencePolicy,
) -> IngestionResult<ColumnTypeMap>
where
    C: Cell,
    I: Iterator<Item = IngestionResult<Vec<C>>>,
{
    let mut resolved = ColumnTypeMap::new();
    let limit = match policy {
        InferencePolicy::FirstRow => 1,
        InferencePolicy::AllRows => usize::MAX,
    };

    for row in rows.take(limit) {
        let row = row?;
        for idx in headers.keys() {
            if resolved.contains_key(idx) {
                continue;
            }
            let ty = row.get(*idx).map_or(ColumnType::Text, Cell::classify);
            if ty != ColumnType::Text {
                resolved.insert(*idx, ty);
            }
        }
        if resolved.len() == headers.len() {
            break;
        }
    }

    Ok(headers
        .iter()
        .map(|(idx, name)| {
            let ty = resolved
                .get(idx)
                .copied()
                .unwrap_or_else(|| default_type_for_header(name));
            (*idx, ty)
        })
        .collect())
}
