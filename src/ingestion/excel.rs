#![cfg(feature = "excel")]

//! Spreadsheet (`.xlsx`) reader.
//!
//! Behavior:
//! - only the first sheet of the workbook is read
//! - the first row of the sheet's used range is the header row; blank header cells are skipped,
//!   so the header map can have gaps
//! - remaining rows are data rows; cells keep their native [`calamine::Data`] form until coerced

use std::io::Cursor;

use calamine::{Data, Range, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::error::{IngestionError, IngestionResult};
use crate::loader::coerce::{CoercionError, coerce_text, integral_f64, parse_bool, parse_integer, parse_timestamp};
use crate::types::{ColumnType, ColumnTypeMap, HeaderMap, SqlValue};

use super::reader::{Cell, FormatReader, InferencePolicy, RowIter, classify_text, infer_column_types};
use super::unified::IngestionFormat;

/// [`FormatReader`] for Excel workbooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcelReader {
    policy: InferencePolicy,
}

impl ExcelReader {
    pub fn new(policy: InferencePolicy) -> Self {
        Self { policy }
    }
}

fn first_sheet(source: &[u8]) -> IngestionResult<Range<Data>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(source))?;
    match workbook.worksheet_range_at(0) {
        Some(range) => Ok(range?),
        None => Err(IngestionError::malformed("workbook has no sheets")),
    }
}

fn headers_from_range(range: &Range<Data>) -> IngestionResult<HeaderMap> {
    let header_row = range
        .rows()
        .next()
        .ok_or_else(|| IngestionError::malformed("sheet has no rows (no header row found)"))?;

    let headers: HeaderMap = header_row
        .iter()
        .enumerate()
        .filter(|(_, cell)| !cell.is_blank())
        .map(|(idx, cell)| (idx, cell_to_string(cell)))
        .collect();
    if headers.is_empty() {
        return Err(IngestionError::malformed("sheet header row is empty"));
    }
    Ok(headers)
}

fn data_rows(range: &Range<Data>) -> Vec<IngestionResult<Vec<Data>>> {
    range.rows().skip(1).map(|row| Ok(row.to_vec())).collect()
}

impl FormatReader for ExcelReader {
    type Cell = Data;

    fn format(&self) -> IngestionFormat {
        IngestionFormat::Excel
    }

    fn read_headers(&self, source: &[u8]) -> IngestionResult<HeaderMap> {
        headers_from_range(&first_sheet(source)?)
    }

    fn determine_column_types(&self, source: &[u8]) -> IngestionResult<ColumnTypeMap> {
        let range = first_sheet(source)?;
        let headers = headers_from_range(&range)?;
        infer_column_types(&headers, data_rows(&range).into_iter(), self.policy)
    }

    fn read_rows<'a>(&self, source: &'a [u8]) -> IngestionResult<RowIter<'a, Data>> {
        let range = first_sheet(source)?;
        Ok(Box::new(data_rows(&range).into_iter()))
    }
}

impl Cell for Data {
    fn classify(&self) -> ColumnType {
        match self {
            // Workbooks store whole and fractional amounts alike as floats.
            Data::Int(_) => ColumnType::Numeric,
            Data::Float(f) if f.is_finite() => ColumnType::Numeric,
            Data::DateTime(_) => ColumnType::Timestamp,
            Data::DateTimeIso(s) if parse_timestamp(s).is_some() => ColumnType::Timestamp,
            Data::Bool(_) => ColumnType::Boolean,
            Data::String(s) => classify_text(s),
            _ => ColumnType::Text,
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Data::Empty => true,
            Data::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn coerce(&self, ty: ColumnType) -> Result<SqlValue, CoercionError> {
        if self.is_blank() {
            return Ok(SqlValue::Null(ty));
        }
        if let Data::String(s) = self {
            return coerce_text(s, ty);
        }
        if let Data::Error(e) = self {
            return Err(CoercionError::new(ty, format!("{e:?}"), "error cell"));
        }

        let fail = |message: &str| CoercionError::new(ty, self.to_string(), message);
        match ty {
            ColumnType::Text => Ok(SqlValue::Text(cell_to_string(self))),
            ColumnType::Integer => match self {
                Data::Int(i) => Ok(SqlValue::Integer(*i)),
                Data::Float(f) => integral_f64(*f)
                    .map(SqlValue::Integer)
                    .ok_or_else(|| fail("expected integer (got non-integer float)")),
                Data::DateTimeIso(s) => parse_integer(s)
                    .map(SqlValue::Integer)
                    .map_err(|m| fail(&m)),
                _ => Err(fail("expected integer")),
            },
            ColumnType::Numeric => match self {
                Data::Float(f) => Ok(SqlValue::Numeric(*f)),
                Data::Int(i) => Ok(SqlValue::Numeric(*i as f64)),
                _ => Err(fail("expected number")),
            },
            ColumnType::Timestamp => match self {
                Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64()),
                Data::Float(f) => excel_serial_to_datetime(*f),
                Data::Int(i) => excel_serial_to_datetime(*i as f64),
                Data::DateTimeIso(s) => parse_timestamp(s),
                _ => None,
            }
            .map(SqlValue::Timestamp)
            .ok_or_else(|| fail("expected date/time")),
            ColumnType::Boolean => match self {
                Data::Bool(b) => Ok(SqlValue::Boolean(*b)),
                Data::Int(i) => Ok(SqlValue::Boolean(*i != 0)),
                Data::Float(f) => Ok(SqlValue::Boolean(*f != 0.0)),
                Data::DateTimeIso(s) => parse_bool(s).map(SqlValue::Boolean).map_err(|m| fail(&m)),
                _ => Err(fail("expected bool")),
            },
        }
    }
}

/// Convert an Excel serial date (1900 date system) to a timestamp, rounded to milliseconds.
pub(crate) fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => match integral_f64(*f) {
            Some(i) => i.to_string(),
            None => f.to_string(),
        },
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match excel_serial_to_datetime(dt.as_f64()) {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}
