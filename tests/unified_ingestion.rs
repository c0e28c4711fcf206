mod common;

use std::path::PathBuf;

use rusqlite::Connection;
use tabload::config::LoaderConfig;
use tabload::ingestion::{IngestionFormat, IngestionOptions, IngestionRequest, ingest, ingest_from_path};
use tabload::{ErrorKind, IngestionError};

use common::{assert_employees_loaded, count_rows, employees_csv, employees_dbf};

fn table_exists(conn: &Connection, table: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |r| r.get::<_, i64>(0),
    )
    .unwrap()
        > 0
}

#[test]
fn ingest_all_formats_into_one_database() {
    let mut conn = Connection::open_in_memory().unwrap();
    let opts = IngestionOptions::default();

    ingest("from_csv.csv", employees_csv(10).as_bytes(), &mut conn, &opts).unwrap();
    ingest("from_dbf.dbf", &employees_dbf(10), &mut conn, &opts).unwrap();
    #[cfg(feature = "excel_test_writer")]
    {
        ingest("from_xlsx.xlsx", &common::employees_xlsx(10), &mut conn, &opts).unwrap();
        assert_employees_loaded(&conn, "from_xlsx");
    }

    assert_employees_loaded(&conn, "from_csv");
    assert_employees_loaded(&conn, "from_dbf");
}

#[test]
fn ingest_twice_replaces_the_table() {
    let mut conn = Connection::open_in_memory().unwrap();
    let csv = employees_csv(10);

    ingest("employees.csv", csv.as_bytes(), &mut conn, &IngestionOptions::default()).unwrap();
    ingest("employees.csv", csv.as_bytes(), &mut conn, &IngestionOptions::default()).unwrap();
    assert_employees_loaded(&conn, "employees");
}

#[test]
fn ingest_exactly_one_full_batch() {
    let mut conn = Connection::open_in_memory().unwrap();
    let csv = employees_csv(2_500);

    let summary = ingest("bulk.csv", csv.as_bytes(), &mut conn, &IngestionOptions::default()).unwrap();
    assert_eq!(summary.rows_inserted, 2_500);
    assert_eq!(summary.batches, 1);

    let (rows, distinct, min_id, max_id): (i64, i64, i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), COUNT(DISTINCT \"ID\"), MIN(\"ID\"), MAX(\"ID\") FROM \"bulk\"",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!((rows, distinct, min_id, max_id), (2_500, 2_500, 1, 2_500));
}

#[test]
fn ingest_honours_configured_batch_size() {
    let cfg = LoaderConfig::from_yaml_str("loader:\n  batch_size: 4\n").unwrap();
    let mut conn = Connection::open_in_memory().unwrap();

    let summary = ingest("employees.csv", employees_csv(10).as_bytes(), &mut conn, &cfg.to_options()).unwrap();
    assert_eq!(summary.batches, 3);
    assert_employees_loaded(&conn, "employees");
}

#[test]
fn ingest_rejects_unsupported_extension_before_touching_the_database() {
    let mut conn = Connection::open_in_memory().unwrap();

    let err = ingest("report.json", b"[]", &mut conn, &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, IngestionError::UnsupportedFormat { ref extension } if extension == "json"));
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    assert!(!table_exists(&conn, "report"));

    let err = ingest("no_extension", b"a\n1\n", &mut conn, &IngestionOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn ingest_rejects_injection_in_headers_before_any_statement() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute("CREATE TABLE \"victims\" (x INTEGER)", []).unwrap();
    conn.execute("INSERT INTO \"victims\" VALUES (1)", []).unwrap();

    for header in ["name\"; DROP TABLE victims; --", "a;b", "SELECT", "1abc"] {
        let csv = format!("ID,{}\n1,x\n", csv_quote(header));
        let err = ingest("victims.csv", csv.as_bytes(), &mut conn, &IngestionOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema, "header {header:?} was accepted");
    }

    // The existing table was never dropped.
    assert_eq!(count_rows(&conn, "victims"), 1);
}

#[test]
fn ingest_rejects_invalid_table_names() {
    let mut conn = Connection::open_in_memory().unwrap();
    let csv = employees_csv(1);

    let err = ingest("drop.csv", csv.as_bytes(), &mut conn, &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, IngestionError::InvalidIdentifier { .. }));

    let opts = IngestionOptions {
        table_name: Some("x\"; --".to_string()),
        ..Default::default()
    };
    let err = ingest("fine.csv", csv.as_bytes(), &mut conn, &opts).unwrap_err();
    assert!(matches!(err, IngestionError::InvalidIdentifier { .. }));
}

#[test]
fn ingest_rejects_duplicate_column_names() {
    let mut conn = Connection::open_in_memory().unwrap();
    let err = ingest("dupes.csv", b"ID,id\n1,2\n", &mut conn, &IngestionOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(!table_exists(&conn, "dupes"));
}

#[test]
fn ingest_uses_table_and_format_overrides() {
    let mut conn = Connection::open_in_memory().unwrap();
    let opts = IngestionOptions {
        format: Some(IngestionFormat::Dbf),
        table_name: Some("staff".to_string()),
        ..Default::default()
    };

    let summary = ingest("upload.bin", &employees_dbf(10), &mut conn, &opts).unwrap();
    assert_eq!(summary.table, "staff");
    assert_employees_loaded(&conn, "staff");
    assert!(!table_exists(&conn, "upload"));
}

#[test]
fn ingestion_request_runs_from_path() {
    let mut conn = Connection::open_in_memory().unwrap();
    let req = IngestionRequest {
        path: PathBuf::from("tests/fixtures/employees.csv"),
        options: IngestionOptions {
            table_name: Some("queued".to_string()),
            ..Default::default()
        },
    };

    let summary = req.run(&mut conn).unwrap();
    assert_eq!(summary.rows_inserted, 10);
    assert_employees_loaded(&conn, "queued");
}

#[test]
fn ingest_missing_file_is_io_error() {
    let mut conn = Connection::open_in_memory().unwrap();
    let err = ingest_from_path("tests/fixtures/does_not_exist.csv", &mut conn, &IngestionOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
