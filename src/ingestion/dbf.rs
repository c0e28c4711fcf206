//! dBASE (`.dbf`) reader.
//!
//! dBASE files carry their schema in the file header: a 32-byte preamble followed by one 32-byte
//! descriptor per field, terminated by `0x0D`. Column names and types come straight from the
//! descriptors, so no data scanning is needed for type inference.
//!
//! Supported field types:
//!
//! | code | meaning             | column type                       |
//! |------|---------------------|-----------------------------------|
//! | `C`  | character           | TEXT                              |
//! | `N`, `F` | numeric text    | INTEGER if 0 decimals, else NUMERIC |
//! | `I`  | 32-bit integer      | INTEGER                           |
//! | `O`, `B` | 64-bit double   | NUMERIC                           |
//! | `Y`  | currency            | NUMERIC                           |
//! | `D`  | date (`YYYYMMDD`)   | TIMESTAMP                         |
//! | `T`  | FoxPro date-time    | TIMESTAMP                         |
//! | `L`  | logical             | BOOLEAN                           |
//! | `M`  | memo pointer        | TEXT (always NULL, memo files are not read) |
//!
//! Any other field type is loaded as TEXT. Records flagged as deleted are skipped.
//!
//! Field names and character values are decoded with the code page named by the
//! language-driver byte at header offset 29. A zero byte means the writer did not say: such
//! text is read as UTF-8 when it is valid UTF-8 and as windows-1252 otherwise. DOS code pages
//! other than 866 have no decoder and fall back to windows-1252.
//!
//! The format is parsed here directly from the in-memory buffer: everything needed is at fixed
//! offsets in the header, the descriptors and the fixed-width records. Memo (`.dbt`/`.fpt`)
//! files are never opened.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use encoding_rs::Encoding;

use crate::error::{IngestionError, IngestionResult};
use crate::loader::coerce::{CoercionError, integral_f64, parse_bool, parse_integer, parse_timestamp};
use crate::types::{ColumnType, ColumnTypeMap, HeaderMap, SqlValue};

use super::reader::{Cell, FormatReader, RowIter};
use super::unified::IngestionFormat;

const PREAMBLE_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const HEADER_TERMINATOR: u8 = 0x0D;
const END_OF_FILE: u8 = 0x1A;
const DELETED_FLAG: u8 = b'*';
const LANGUAGE_DRIVER_OFFSET: usize = 29;
// Julian day number of 0001-01-01 minus one (chrono counts days from the common era).
const JULIAN_DAY_OFFSET: i64 = 1_721_425;

/// One field descriptor from the file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfField {
    pub name: String,
    pub field_type: u8,
    pub length: usize,
    pub decimal_count: u8,
    offset: usize,
}

impl DbfField {
    /// Destination type for this field's declared dBASE type.
    pub fn column_type(&self) -> ColumnType {
        match self.field_type {
            b'N' | b'F' if self.decimal_count == 0 => ColumnType::Integer,
            b'N' | b'F' | b'O' | b'B' | b'Y' => ColumnType::Numeric,
            b'I' => ColumnType::Integer,
            b'D' | b'T' => ColumnType::Timestamp,
            b'L' => ColumnType::Boolean,
            _ => ColumnType::Text,
        }
    }

    fn decode(&self, raw: &[u8], encoding: Option<&'static Encoding>) -> DbfValue {
        match self.field_type {
            b'C' => decode_text(raw, encoding),
            b'N' | b'F' => decode_numeric(raw, self.decimal_count),
            b'I' if raw.len() == 4 => {
                DbfValue::Integer(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]).into())
            }
            b'O' | b'B' if raw.len() == 8 => DbfValue::Numeric(f64::from_le_bytes(le8(raw))),
            b'Y' if raw.len() == 8 => DbfValue::Numeric(i64::from_le_bytes(le8(raw)) as f64 / 10_000.0),
            b'D' => decode_date(raw),
            b'T' if raw.len() == 8 => decode_datetime(raw),
            b'L' => match raw.first() {
                Some(b'T' | b't' | b'Y' | b'y') => DbfValue::Logical(true),
                Some(b'F' | b'f' | b'N' | b'n') => DbfValue::Logical(false),
                _ => DbfValue::Null,
            },
            b'M' => DbfValue::Null,
            _ => decode_text(raw, encoding),
        }
    }
}

/// Parsed dBASE file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfHeader {
    pub version: u8,
    pub record_count: usize,
    pub header_len: usize,
    pub record_len: usize,
    /// Code page from the language-driver byte; `None` when the byte is zero.
    pub encoding: Option<&'static Encoding>,
    pub fields: Vec<DbfField>,
}

impl DbfHeader {
    /// Parse the preamble and field directory of a dBASE file.
    ///
    /// # Errors
    ///
    /// [`IngestionError::MalformedSource`] if the header is truncated, declares no fields, or
    /// its field lengths do not fit the declared record length.
    pub fn parse(source: &[u8]) -> IngestionResult<Self> {
        if source.len() < PREAMBLE_LEN {
            return Err(IngestionError::malformed("file too short for a dBASE header"));
        }
        let version = source[0];
        let record_count = u32::from_le_bytes([source[4], source[5], source[6], source[7]]) as usize;
        let header_len = u16::from_le_bytes([source[8], source[9]]) as usize;
        let record_len = u16::from_le_bytes([source[10], source[11]]) as usize;
        let encoding = encoding_for_language_driver(source[LANGUAGE_DRIVER_OFFSET]);

        if header_len > source.len() || header_len < PREAMBLE_LEN + 1 {
            return Err(IngestionError::malformed(format!(
                "dBASE header length {header_len} is out of range (file is {} bytes)",
                source.len()
            )));
        }

        let mut fields = Vec::new();
        let mut pos = PREAMBLE_LEN;
        let mut offset = 1; // deletion flag
        loop {
            match source.get(pos) {
                Some(&HEADER_TERMINATOR) => break,
                Some(_) if pos + DESCRIPTOR_LEN <= header_len => {}
                _ => {
                    return Err(IngestionError::malformed(
                        "dBASE field directory is not terminated",
                    ));
                }
            }
            let desc = &source[pos..pos + DESCRIPTOR_LEN];
            let name_bytes = desc[..11].split(|b| *b == 0).next().unwrap_or_default();
            let name = decode_bytes(name_bytes, encoding).trim().to_string();
            let length = desc[16] as usize;
            fields.push(DbfField {
                name,
                field_type: desc[11].to_ascii_uppercase(),
                length,
                decimal_count: desc[17],
                offset,
            });
            offset += length;
            pos += DESCRIPTOR_LEN;
        }

        if fields.is_empty() {
            return Err(IngestionError::malformed("dBASE file declares no fields"));
        }
        if offset > record_len {
            return Err(IngestionError::malformed(format!(
                "dBASE fields need {offset} bytes per record but record length is {record_len}"
            )));
        }

        Ok(Self {
            version,
            record_count,
            header_len,
            record_len,
            encoding,
            fields,
        })
    }

    /// Decode non-deleted records in file order.
    pub fn records<'a>(&self, source: &'a [u8]) -> DbfRecords<'a> {
        DbfRecords {
            header: self.clone(),
            source,
            next: 0,
        }
    }
}

/// Iterator over the live records of a dBASE file.
#[derive(Debug)]
pub struct DbfRecords<'a> {
    header: DbfHeader,
    source: &'a [u8],
    next: usize,
}

impl Iterator for DbfRecords<'_> {
    type Item = IngestionResult<Vec<DbfValue>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.header.record_count {
            let start = self.header.header_len + self.next * self.header.record_len;
            let end = start + self.header.record_len;
            self.next += 1;

            let record = match self.source.get(start..end) {
                Some(r) if r[0] != END_OF_FILE => r,
                _ => {
                    // Stop after reporting the truncation once.
                    let declared = self.header.record_count;
                    self.next = declared;
                    return Some(Err(IngestionError::malformed(format!(
                        "dBASE file is truncated: declared {declared} records"
                    ))));
                }
            };
            if record[0] == DELETED_FLAG {
                continue;
            }

            let values = self
                .header
                .fields
                .iter()
                .map(|f| f.decode(&record[f.offset..f.offset + f.length], self.header.encoding))
                .collect();
            return Some(Ok(values));
        }
        None
    }
}

/// A decoded dBASE value.
#[derive(Debug, Clone, PartialEq)]
pub enum DbfValue {
    Null,
    Character(String),
    Integer(i64),
    Numeric(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Logical(bool),
}

fn le8(raw: &[u8]) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&raw[..8]);
    buf
}

/// Text encoding for a dBASE language-driver id.
fn encoding_for_language_driver(id: u8) -> Option<&'static Encoding> {
    let encoding = match id {
        0x00 => return None,
        0x26 | 0x65 => encoding_rs::IBM866,
        0xC8 => encoding_rs::WINDOWS_1250,
        0xC9 => encoding_rs::WINDOWS_1251,
        0xCA => encoding_rs::WINDOWS_1254,
        0xCB => encoding_rs::WINDOWS_1253,
        0xCC => encoding_rs::WINDOWS_1257,
        0x7C => encoding_rs::WINDOWS_874,
        0x7D => encoding_rs::WINDOWS_1255,
        0x7E => encoding_rs::WINDOWS_1256,
        0x13 | 0x7B => encoding_rs::SHIFT_JIS,
        0x4D | 0x7A => encoding_rs::GBK,
        0x4E | 0x79 => encoding_rs::EUC_KR,
        0x4F | 0x78 => encoding_rs::BIG5,
        _ => encoding_rs::WINDOWS_1252,
    };
    Some(encoding)
}

fn decode_bytes(raw: &[u8], encoding: Option<&'static Encoding>) -> String {
    let encoding = match encoding {
        Some(encoding) => encoding,
        None => match std::str::from_utf8(raw) {
            Ok(text) => return text.to_string(),
            Err(_) => encoding_rs::WINDOWS_1252,
        },
    };
    encoding.decode_without_bom_handling(raw).0.into_owned()
}

fn decode_text(raw: &[u8], encoding: Option<&'static Encoding>) -> DbfValue {
    let trimmed = raw
        .iter()
        .rposition(|b| *b != b' ' && *b != 0)
        .map_or(&raw[..0], |last| &raw[..=last]);
    if trimmed.is_empty() {
        return DbfValue::Null;
    }
    DbfValue::Character(decode_bytes(trimmed, encoding))
}

fn decode_numeric(raw: &[u8], decimal_count: u8) -> DbfValue {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_matches(|c: char| c == ' ' || c == '\0');
    if text.is_empty() || text.starts_with('*') {
        return DbfValue::Null;
    }
    if decimal_count == 0 {
        if let Ok(i) = text.parse::<i64>() {
            return DbfValue::Integer(i);
        }
    }
    match text.parse::<f64>() {
        Ok(f) => DbfValue::Numeric(f),
        Err(_) => DbfValue::Character(text.to_string()),
    }
}

fn decode_date(raw: &[u8]) -> DbfValue {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.is_empty() || text.chars().all(|c| c == '0') {
        return DbfValue::Null;
    }
    match NaiveDate::parse_from_str(text, "%Y%m%d") {
        Ok(d) => DbfValue::Date(d),
        Err(_) => DbfValue::Character(text.to_string()),
    }
}

fn decode_datetime(raw: &[u8]) -> DbfValue {
    let julian_day = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64;
    let millis = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]) as i64;
    if julian_day == 0 {
        return DbfValue::Null;
    }
    i32::try_from(julian_day - JULIAN_DAY_OFFSET)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .zip(TimeDelta::try_milliseconds(millis))
        .and_then(|(date, time)| date.and_time(NaiveTime::MIN).checked_add_signed(time))
        .map_or(DbfValue::Null, DbfValue::DateTime)
}

/// [`FormatReader`] for dBASE files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DbfReader;

impl FormatReader for DbfReader {
    type Cell = DbfValue;

    fn format(&self) -> IngestionFormat {
        IngestionFormat::Dbf
    }

    fn read_headers(&self, source: &[u8]) -> IngestionResult<HeaderMap> {
        let header = DbfHeader::parse(source)?;
        Ok(header
            .fields
            .into_iter()
            .enumerate()
            .map(|(idx, f)| (idx, f.name))
            .collect())
    }

    fn determine_column_types(&self, source: &[u8]) -> IngestionResult<ColumnTypeMap> {
        let header = DbfHeader::parse(source)?;
        Ok(header
            .fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (idx, f.column_type()))
            .collect())
    }

    fn read_rows<'a>(&self, source: &'a [u8]) -> IngestionResult<RowIter<'a, DbfValue>> {
        let header = DbfHeader::parse(source)?;
        Ok(Box::new(header.records(source)))
    }
}

impl Cell for DbfValue {
    fn classify(&self) -> ColumnType {
        match self {
            DbfValue::Null | DbfValue::Character(_) => ColumnType::Text,
            DbfValue::Integer(_) => ColumnType::Integer,
            DbfValue::Numeric(_) => ColumnType::Numeric,
            DbfValue::Date(_) | DbfValue::DateTime(_) => ColumnType::Timestamp,
            DbfValue::Logical(_) => ColumnType::Boolean,
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            DbfValue::Null => true,
            DbfValue::Character(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn coerce(&self, ty: ColumnType) -> Result<SqlValue, CoercionError> {
        if self.is_blank() {
            return Ok(SqlValue::Null(ty));
        }
        let fail = |message: &str| CoercionError::new(ty, format!("{self:?}"), message);
        match (ty, self) {
            (ColumnType::Text, DbfValue::Character(s)) => Ok(SqlValue::Text(s.clone())),
            (ColumnType::Text, DbfValue::Integer(i)) => Ok(SqlValue::Text(i.to_string())),
            (ColumnType::Text, DbfValue::Numeric(f)) => Ok(SqlValue::Text(f.to_string())),
            (ColumnType::Text, DbfValue::Date(d)) => Ok(SqlValue::Text(d.format("%Y-%m-%d").to_string())),
            (ColumnType::Text, DbfValue::DateTime(ts)) => Ok(SqlValue::Text(ts.to_string())),
            (ColumnType::Text, DbfValue::Logical(b)) => Ok(SqlValue::Text(b.to_string())),

            (ColumnType::Integer, DbfValue::Integer(i)) => Ok(SqlValue::Integer(*i)),
            (ColumnType::Integer, DbfValue::Numeric(f)) => integral_f64(*f)
                .map(SqlValue::Integer)
                .ok_or_else(|| fail("expected integer (got non-integer number)")),
            (ColumnType::Integer, DbfValue::Character(s)) => {
                parse_integer(s).map(SqlValue::Integer).map_err(|m| fail(&m))
            }

            (ColumnType::Numeric, DbfValue::Numeric(f)) => Ok(SqlValue::Numeric(*f)),
            (ColumnType::Numeric, DbfValue::Integer(i)) => Ok(SqlValue::Numeric(*i as f64)),
            (ColumnType::Numeric, DbfValue::Character(s)) => s
                .trim()
                .parse::<f64>()
                .map(SqlValue::Numeric)
                .map_err(|e| fail(&e.to_string())),

            (ColumnType::Timestamp, DbfValue::Date(d)) => Ok(SqlValue::Timestamp(d.and_time(NaiveTime::MIN))),
            (ColumnType::Timestamp, DbfValue::DateTime(ts)) => Ok(SqlValue::Timestamp(*ts)),
            (ColumnType::Timestamp, DbfValue::Character(s)) => parse_timestamp(s)
                .map(SqlValue::Timestamp)
                .ok_or_else(|| fail("expected date")),

            (ColumnType::Boolean, DbfValue::Logical(b)) => Ok(SqlValue::Boolean(*b)),
            (ColumnType::Boolean, DbfValue::Character(s)) => {
                parse_bool(s).map(SqlValue::Boolean).map_err(|m| fail(&m))
            }

            _ => Err(fail("incompatible dBASE value")),
        }
    }
}
