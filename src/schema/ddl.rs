//! `DROP` / `CREATE TABLE` generation for a full-replace load.

use rusqlite::Connection;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{ColumnType, ColumnTypeMap, HeaderMap};

use super::identifier::{quote_identifier, validate_identifier};

/// Validate the table name and every column name.
///
/// Called before any statement is sent, so a bad header never leaves the destination half
/// modified.
pub fn validate_schema(headers: &HeaderMap, table_name: &str) -> IngestionResult<()> {
    validate_identifier(table_name)?;
    if headers.is_empty() {
        return Err(IngestionError::Schema {
            message: format!("table '{table_name}' would have no columns"),
        });
    }

    let mut seen = std::collections::HashSet::with_capacity(headers.len());
    for name in headers.values() {
        validate_identifier(name)?;
        if !seen.insert(name.to_lowercase()) {
            return Err(IngestionError::Schema {
                message: format!("duplicate column name '{name}'"),
            });
        }
    }
    Ok(())
}

/// Column definitions in table order. Missing type entries fall back to [`ColumnType::Text`].
pub fn column_definitions(headers: &HeaderMap, column_types: &ColumnTypeMap) -> Vec<(String, ColumnType)> {
    headers
        .iter()
        .map(|(idx, name)| (name.clone(), column_types.get(idx).copied().unwrap_or_default()))
        .collect()
}

/// `DROP TABLE IF EXISTS "<table>"`.
pub fn drop_table_sql(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(table_name))
}

/// `CREATE TABLE IF NOT EXISTS "<table>" ("<col>" <TYPE>, ...)` in header index order.
pub fn create_table_sql(headers: &HeaderMap, column_types: &ColumnTypeMap, table_name: &str) -> String {
    let columns = column_definitions(headers, column_types)
        .into_iter()
        .map(|(name, ty)| format!("{} {}", quote_identifier(&name), ty.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({columns})",
        quote_identifier(table_name)
    )
}

/// Drop and recreate `table_name` with one column per header.
///
/// The drop/create pair is not transactional: if the create fails, the old table is already
/// gone.
///
/// # Errors
///
/// [`IngestionError::InvalidIdentifier`] / [`IngestionError::Schema`] before anything is sent,
/// [`IngestionError::SchemaRejected`] if the backend refuses a statement.
pub fn create_table(
    conn: &Connection,
    headers: &HeaderMap,
    column_types: &ColumnTypeMap,
    table_name: &str,
) -> IngestionResult<()> {
    validate_schema(headers, table_name)?;

    let drop_sql = drop_table_sql(table_name);
    let create_sql = create_table_sql(headers, column_types, table_name);

    tracing::info!(sql = %drop_sql, "dropping table");
    execute_ddl(conn, drop_sql)?;
    tracing::info!(sql = %create_sql, "creating table");
    execute_ddl(conn, create_sql)?;
    Ok(())
}

fn execute_ddl(conn: &Connection, sql: String) -> IngestionResult<()> {
    match conn.execute(&sql, []) {
        Ok(_) => Ok(()),
        Err(source) => Err(IngestionError::SchemaRejected { sql, source }),
    }
}
