//! Core data model shared by the readers, the schema builder and the batch loader.
//!
//! A load works on two maps keyed by zero-based source column index: a [`HeaderMap`] (column
//! names) and a [`ColumnTypeMap`] (inferred [`ColumnType`]s). Both are ordered by index, which is
//! also the column order of the created table.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value as SqliteValue};

/// Column index → column name, as read from the source's header.
pub type HeaderMap = BTreeMap<usize, String>;

/// Column index → inferred logical type.
pub type ColumnTypeMap = BTreeMap<usize, ColumnType>;

/// Logical type of a destination column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnType {
    /// Free-form text. Also the fallback when nothing else can be inferred.
    #[default]
    Text,
    /// 64-bit signed integer.
    Integer,
    /// Decimal / floating point number.
    Numeric,
    /// Date and time without time zone.
    Timestamp,
    /// Boolean.
    Boolean,
}

impl ColumnType {
    /// The SQL type used for this column in `CREATE TABLE`.
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "BIGINT",
            Self::Numeric => "NUMERIC",
            Self::Timestamp => "TIMESTAMP",
            Self::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Numeric => "NUMERIC",
            Self::Timestamp => "TIMESTAMP",
            Self::Boolean => "BOOLEAN",
        };
        f.write_str(name)
    }
}

/// A coerced cell, ready to be bound to an `INSERT` placeholder.
///
/// Nulls keep the column type they were produced for so that logs and tests can tell a
/// missing integer from a missing string.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null(ColumnType),
    Integer(i64),
    Numeric(f64),
    Timestamp(NaiveDateTime),
    Boolean(bool),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Null(_) => Ok(ToSqlOutput::Owned(SqliteValue::Null)),
            Self::Integer(v) => Ok(ToSqlOutput::from(*v)),
            Self::Numeric(v) => Ok(ToSqlOutput::from(*v)),
            Self::Timestamp(ts) => ts.to_sql(),
            Self::Boolean(b) => Ok(ToSqlOutput::from(*b)),
            Self::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Destination table that was (re)created.
    pub table: String,
    /// Columns in table order.
    pub columns: Vec<(String, ColumnType)>,
    /// Rows inserted and committed.
    pub rows_inserted: usize,
    /// Number of batches submitted.
    pub batches: usize,
    /// Cells that could not be coerced and were loaded as NULL.
    pub null_substitutions: usize,
}
