mod common;

use rusqlite::Connection;
use tabload::ingestion::csv::CsvReader;
use tabload::ingestion::{FormatReader, InferencePolicy, IngestionOptions, ingest, ingest_from_path, ingest_from_reader};
use tabload::types::ColumnType;

use common::{assert_employees_loaded, count_rows, employees_csv};

#[test]
fn ingest_csv_from_path_happy_path() {
    let mut conn = Connection::open_in_memory().unwrap();
    let summary = ingest_from_path("tests/fixtures/employees.csv", &mut conn, &IngestionOptions::default()).unwrap();

    assert_eq!(summary.table, "employees");
    assert_eq!(summary.rows_inserted, 10);
    assert_eq!(summary.null_substitutions, 0);
    assert_eq!(
        summary.columns,
        vec![
            ("ID".to_string(), ColumnType::Integer),
            ("NAME".to_string(), ColumnType::Text),
            ("SALARY".to_string(), ColumnType::Numeric),
            ("JOIN_DATE".to_string(), ColumnType::Timestamp),
            ("ACTIVE".to_string(), ColumnType::Boolean),
        ]
    );
    assert_employees_loaded(&conn, "employees");
}

#[test]
fn ingest_csv_from_reader_matches_in_memory_ingest() {
    let csv = employees_csv(10);
    let mut conn = Connection::open_in_memory().unwrap();

    ingest_from_reader("employees.csv", csv.as_bytes(), &mut conn, &IngestionOptions::default()).unwrap();
    assert_employees_loaded(&conn, "employees");
}

#[test]
fn ingest_csv_reads_header_types_and_rows_from_the_same_buffer() {
    let csv = employees_csv(3);
    let reader = CsvReader::default();

    let headers = reader.read_headers(csv.as_bytes()).unwrap();
    let types = reader.determine_column_types(csv.as_bytes()).unwrap();
    let rows = reader.read_rows(csv.as_bytes()).unwrap().count();

    assert_eq!(headers.keys().collect::<Vec<_>>(), types.keys().collect::<Vec<_>>());
    assert_eq!(rows, 3);
}

#[test]
fn ingest_csv_unparsable_cells_load_as_null() {
    let input = "ID,AMOUNT,PAID_AT\n1,1.5,2024-01-02\n2,lots,someday\n3,,\n";
    let mut conn = Connection::open_in_memory().unwrap();

    let summary = ingest("payments.csv", input.as_bytes(), &mut conn, &IngestionOptions::default()).unwrap();
    assert_eq!(summary.rows_inserted, 3);
    assert_eq!(summary.null_substitutions, 2);

    let nulls: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM \"payments\" WHERE \"AMOUNT\" IS NULL AND \"PAID_AT\" IS NULL",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(nulls, 2);
}

#[test]
fn ingest_csv_empty_column_uses_header_heuristic() {
    let input = "ORDER_ID,NOTE,FIO\n,,\n,,\n";
    let mut conn = Connection::open_in_memory().unwrap();

    let summary = ingest("orders.csv", input.as_bytes(), &mut conn, &IngestionOptions::default()).unwrap();
    let types: Vec<_> = summary.columns.iter().map(|(_, t)| *t).collect();
    assert_eq!(types, [ColumnType::Integer, ColumnType::Text, ColumnType::Text]);
    // CSV keeps blank rows by default.
    assert_eq!(count_rows(&conn, "orders"), 2);
}

#[test]
fn ingest_csv_first_row_policy_can_miss_later_types() {
    let input = "CODE,QTY\nA,\nB,4\n";
    let mut conn = Connection::open_in_memory().unwrap();

    let all_rows = ingest("stock.csv", input.as_bytes(), &mut conn, &IngestionOptions::default()).unwrap();
    assert_eq!(all_rows.columns[1].1, ColumnType::Integer);

    let opts = IngestionOptions {
        inference: InferencePolicy::FirstRow,
        ..Default::default()
    };
    let first_row = ingest("stock.csv", input.as_bytes(), &mut conn, &opts).unwrap();
    assert_eq!(first_row.columns[1].1, ColumnType::Text);
}

#[test]
fn ingest_csv_header_whitespace_becomes_underscores() {
    let input = "First Name,  Last   Name \nAda,Lovelace\n";
    let mut conn = Connection::open_in_memory().unwrap();

    let summary = ingest("people list.csv", input.as_bytes(), &mut conn, &IngestionOptions::default()).unwrap();
    assert_eq!(summary.table, "people_list");
    assert_eq!(summary.columns[0].0, "First_Name");
    assert_eq!(summary.columns[1].0, "Last_Name");
    assert_eq!(count_rows(&conn, "people_list"), 1);
}

#[test]
fn ingest_csv_errors_on_missing_header() {
    let mut conn = Connection::open_in_memory().unwrap();
    let err = ingest("empty.csv", b"", &mut conn, &IngestionOptions::default()).unwrap_err();
    assert_eq!(err.kind(), tabload::ErrorKind::MalformedSource);
}
