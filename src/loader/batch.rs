//! Batched, all-or-nothing `INSERT` of source rows.

use rusqlite::{Connection, Statement, Transaction, params_from_iter};

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::reader::Cell;
use crate::schema::identifier::quote_identifier;
use crate::schema::validate_schema;
use crate::types::{ColumnType, ColumnTypeMap, HeaderMap, SqlValue};

/// Rows submitted per batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 2_500;

/// Options for [`insert_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Rows per batch. Must be > 0.
    pub batch_size: usize,
    /// Drop rows whose header columns are all blank instead of inserting all-NULL rows.
    pub skip_blank_rows: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            skip_blank_rows: false,
        }
    }
}

/// Counters for one committed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows_inserted: usize,
    pub batches: usize,
    pub null_substitutions: usize,
    pub blank_rows_skipped: usize,
}

/// `INSERT INTO "<table>" ("<c1>", ...) VALUES (?, ...)` in header index order.
pub fn insert_sql(headers: &HeaderMap, table_name: &str) -> String {
    let columns = headers
        .values()
        .map(|name| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; headers.len()].join(", ");
    format!(
        "INSERT INTO {} ({columns}) VALUES ({placeholders})",
        quote_identifier(table_name)
    )
}

/// Insert every row from `rows` into `table_name` inside a single transaction.
///
/// Cells are coerced to their column's [`ColumnType`]; cells that cannot be coerced are logged
/// and loaded as NULL. Rows are executed in batches of `options.batch_size`, and the
/// transaction commits once after the last batch. Any error (a backend failure or a source row
/// that cannot be decoded) rolls back everything inserted by this call.
///
/// # Errors
///
/// [`IngestionError::InvalidIdentifier`] / [`IngestionError::Schema`] before the transaction is
/// opened, [`IngestionError::LoadFailure`] for backend errors, or the row iterator's own error.
pub fn insert_data<C, I>(
    conn: &mut Connection,
    headers: &HeaderMap,
    column_types: &ColumnTypeMap,
    table_name: &str,
    rows: I,
    options: LoadOptions,
) -> IngestionResult<LoadStats>
where
    C: Cell,
    I: IntoIterator<Item = IngestionResult<Vec<C>>>,
{
    validate_schema(headers, table_name)?;
    if options.batch_size == 0 {
        return Err(IngestionError::Config {
            message: "batch_size must be > 0".to_string(),
        });
    }

    let sql = insert_sql(headers, table_name);
    let columns: Vec<(usize, ColumnType, &str)> = headers
        .iter()
        .map(|(idx, name)| {
            (
                *idx,
                column_types.get(idx).copied().unwrap_or_default(),
                name.as_str(),
            )
        })
        .collect();

    let tx = conn
        .transaction()
        .map_err(|source| IngestionError::LoadFailure {
            rows_attempted: 0,
            source,
        })?;

    match load_rows(&tx, &sql, &columns, rows, options) {
        Ok(stats) => {
            tx.commit().map_err(|source| IngestionError::LoadFailure {
                rows_attempted: stats.rows_inserted,
                source,
            })?;
            tracing::info!(
                table = table_name,
                rows = stats.rows_inserted,
                batches = stats.batches,
                null_substitutions = stats.null_substitutions,
                "total rows inserted"
            );
            Ok(stats)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                tracing::error!(table = table_name, error = %rollback_err, "rollback failed");
            } else {
                tracing::warn!(table = table_name, error = %err, "load rolled back");
            }
            Err(err)
        }
    }
}

fn load_rows<C, I>(
    tx: &Transaction<'_>,
    sql: &str,
    columns: &[(usize, ColumnType, &str)],
    rows: I,
    options: LoadOptions,
) -> IngestionResult<LoadStats>
where
    C: Cell,
    I: IntoIterator<Item = IngestionResult<Vec<C>>>,
{
    let mut stats = LoadStats::default();
    let mut stmt = tx.prepare(sql).map_err(|source| IngestionError::LoadFailure {
        rows_attempted: 0,
        source,
    })?;
    let mut batch: Vec<Vec<SqlValue>> = Vec::with_capacity(options.batch_size);

    for (idx0, row) in rows.into_iter().enumerate() {
        let data_row = idx0 + 1;
        let row = row?;

        if options.skip_blank_rows && is_blank_row(&row, columns) {
            stats.blank_rows_skipped += 1;
            continue;
        }

        let values = columns
            .iter()
            .map(|&(idx, ty, name)| coerce_cell(row.get(idx), ty, data_row, name, &mut stats))
            .collect();
        batch.push(values);

        if batch.len() == options.batch_size {
            execute_batch(&mut stmt, &mut batch, &mut stats)?;
        }
    }
    if !batch.is_empty() {
        execute_batch(&mut stmt, &mut batch, &mut stats)?;
    }
    Ok(stats)
}

fn coerce_cell<C: Cell>(
    cell: Option<&C>,
    ty: ColumnType,
    data_row: usize,
    column: &str,
    stats: &mut LoadStats,
) -> SqlValue {
    let Some(cell) = cell else {
        return SqlValue::Null(ty);
    };
    match cell.coerce(ty) {
        Ok(v) => v,
        Err(err) => {
            stats.null_substitutions += 1;
            tracing::warn!(row = data_row, column, error = %err, "loading NULL for uncoercible value");
            SqlValue::Null(ty)
        }
    }
}

fn is_blank_row<C: Cell>(row: &[C], columns: &[(usize, ColumnType, &str)]) -> bool {
    columns
        .iter()
        .all(|(idx, _, _)| row.get(*idx).is_none_or(Cell::is_blank))
}

fn execute_batch(
    stmt: &mut Statement<'_>,
    batch: &mut Vec<Vec<SqlValue>>,
    stats: &mut LoadStats,
) -> IngestionResult<()> {
    for values in batch.iter() {
        stmt.execute(params_from_iter(values.iter()))
            .map_err(|source| IngestionError::LoadFailure {
                rows_attempted: stats.rows_inserted + batch.len(),
                source,
            })?;
    }
    stats.rows_inserted += batch.len();
    stats.batches += 1;
    tracing::info!(rows = batch.len(), total = stats.rows_inserted, "rows have been inserted into the table");
    batch.clear();
    Ok(())
}
