//! Cell coercion helpers shared by the format readers.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::types::{ColumnType, SqlValue};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A single cell could not be represented under its column's type.
///
/// Never escapes the loader: it is logged and the cell is loaded as NULL.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot coerce '{raw}' to {target}: {message}")]
pub struct CoercionError {
    pub target: ColumnType,
    pub raw: String,
    pub message: String,
}

impl CoercionError {
    pub fn new(target: ColumnType, raw: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target,
            raw: raw.into(),
            message: message.into(),
        }
    }
}

/// Parse a timestamp literal (`YYYY-MM-DD HH:MM:SS[.fff]`, `T` separator, or a bare date).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub(crate) fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

pub(crate) fn parse_integer(s: &str) -> Result<i64, String> {
    let s = s.trim();
    match s.parse::<i64>() {
        Ok(v) => Ok(v),
        Err(e) => match s.parse::<f64>() {
            Ok(f) => integral_f64(f).ok_or_else(|| "expected integer (got non-integer number)".to_string()),
            Err(_) => Err(e.to_string()),
        },
    }
}

/// `Some(i)` when `f` is finite, has no fractional part and fits in an `i64`.
pub(crate) fn integral_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Coerce a textual value (CSV cells, spreadsheet string cells).
pub fn coerce_text(raw: &str, ty: ColumnType) -> Result<SqlValue, CoercionError> {
    if raw.trim().is_empty() {
        return Ok(SqlValue::Null(ty));
    }

    let fail = |message: String| CoercionError::new(ty, raw, message);
    match ty {
        ColumnType::Text => Ok(SqlValue::Text(raw.to_string())),
        ColumnType::Integer => parse_integer(raw).map(SqlValue::Integer).map_err(fail),
        ColumnType::Numeric => raw
            .trim()
            .parse::<f64>()
            .map(SqlValue::Numeric)
            .map_err(|e| fail(e.to_string())),
        ColumnType::Timestamp => parse_timestamp(raw)
            .map(SqlValue::Timestamp)
            .ok_or_else(|| fail("expected timestamp (YYYY-MM-DD[ HH:MM:SS])".to_string())),
        ColumnType::Boolean => parse_bool(raw).map(SqlValue::Boolean).map_err(fail),
    }
}
