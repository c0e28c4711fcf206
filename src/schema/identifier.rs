//! Identifier sanitizing and validation.
//!
//! Table and column names come from file names and header cells, and are interpolated into
//! DDL/DML text (only cell values are bound as parameters). Every name therefore has to pass
//! [`validate_identifier`] before any statement is built from it.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{IngestionError, IngestionResult};

/// Longest identifier accepted (PostgreSQL's `NAMEDATALEN - 1`).
pub const MAX_IDENTIFIER_LEN: usize = 63;

// Letter or underscore first, then letters, digits, underscores. Embedded whitespace and
// parentheses are tolerated for names coming from legacy spreadsheets.
static VALID_SQL_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}_][\p{L}\p{N}_\s()]*$").expect("identifier regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

const RESERVED_KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN", "CONSTRAINT",
    "CREATE", "CROSS", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT",
    "EXISTS", "FOREIGN", "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IN", "INDEX", "INNER",
    "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL",
    "OFFSET", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "REVOKE", "RIGHT", "SELECT",
    "SET", "TABLE", "THEN", "TO", "TRUNCATE", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES",
    "WHEN", "WHERE", "WITH",
];

/// Normalize a raw header into a column name: trim, then collapse whitespace runs to `_`.
pub fn sanitize_header(name: &str) -> String {
    WHITESPACE_RUN.replace_all(name.trim(), "_").into_owned()
}

/// Check that `name` is safe to interpolate into SQL text.
///
/// # Errors
///
/// Returns [`IngestionError::InvalidIdentifier`] for empty or overlong names, names that do not
/// match the identifier grammar (quotes, semicolons, leading digits, ...) and names that consist
/// solely of a reserved SQL keyword.
pub fn validate_identifier(name: &str) -> IngestionResult<()> {
    let reject = |reason: &str| {
        Err(IngestionError::InvalidIdentifier {
            identifier: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return reject("identifier is empty");
    }
    if name.chars().count() > MAX_IDENTIFIER_LEN {
        return reject("identifier is longer than 63 characters");
    }
    if !VALID_SQL_IDENTIFIER.is_match(name) {
        return reject("must start with a letter or underscore and contain only letters, digits, underscores, spaces or parentheses");
    }
    let upper = name.trim().to_ascii_uppercase();
    if RESERVED_KEYWORDS.binary_search(&upper.as_str()).is_ok() {
        return reject("identifier is a reserved SQL keyword");
    }
    Ok(())
}

/// Quote a validated identifier for use in SQL text.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

/// Split a file name into `(table_name, extension)`.
///
/// Directory components are ignored. The extension is everything after the last dot (empty when
/// there is none); the table part has its whitespace runs replaced by `_`.
///
/// # Errors
///
/// Returns [`IngestionError::Schema`] if the file name is empty.
pub fn split_file_name(file_name: &str) -> IngestionResult<(String, String)> {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if base.trim().is_empty() {
        return Err(IngestionError::Schema {
            message: format!("cannot derive a table name from file name '{file_name}'"),
        });
    }

    let (stem, ext) = match base.rfind('.') {
        Some(idx) => (&base[..idx], &base[idx + 1..]),
        None => (base, ""),
    };
    Ok((sanitize_header(stem), ext.to_string()))
}

/// Derive the destination table name from a file name (see [`split_file_name`]).
pub fn table_name_from_file(file_name: &str) -> IngestionResult<String> {
    split_file_name(file_name).map(|(table, _)| table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_list_is_sorted_for_binary_search() {
        let mut sorted = RESERVED_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED_KEYWORDS);
    }

    #[test]
    fn sanitize_collapses_whitespace() {
        assert_eq!(sanitize_header("  join   date "), "join_date");
        assert_eq!(sanitize_header("first\tname\nx"), "first_name_x");
        assert_eq!(sanitize_header("ID"), "ID");
    }

    #[test]
    fn validate_accepts_plain_and_legacy_names() {
        for ok in ["ID", "_hidden", "join_date", "Фамилия", "amount (usd)", "col2"] {
            assert!(validate_identifier(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn validate_rejects_injection_shapes() {
        for bad in [
            "",
            "1abc",
            "name;drop",
            "a\"b",
            "it's",
            "x--",
            "users; DROP TABLE users",
            "SELECT",
            "drop",
            "Table",
        ] {
            assert!(validate_identifier(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn validate_rejects_overlong_names() {
        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        let err = validate_identifier(&long).unwrap_err();
        assert!(err.to_string().contains("longer than 63"));
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LEN)).is_ok());
    }

    #[test]
    fn split_handles_extension_and_spaces() {
        assert_eq!(
            split_file_name("files_test_null__1_.xlsx").unwrap(),
            ("files_test_null__1_".to_string(), "xlsx".to_string())
        );
        assert_eq!(
            split_file_name("file name with spaces.txt").unwrap(),
            ("file_name_with_spaces".to_string(), "txt".to_string())
        );
        assert_eq!(
            split_file_name("/tmp/data/archive.2024.csv").unwrap(),
            ("archive.2024".to_string(), "csv".to_string())
        );
        assert_eq!(
            split_file_name("test").unwrap(),
            ("test".to_string(), String::new())
        );
    }

    #[test]
    fn split_rejects_empty_name() {
        assert!(split_file_name("").is_err());
        assert!(split_file_name("   ").is_err());
    }
}
