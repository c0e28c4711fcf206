#![allow(dead_code)]

use rusqlite::Connection;

pub const EMPLOYEE_COLUMNS: [&str; 5] = ["ID", "NAME", "SALARY", "JOIN_DATE", "ACTIVE"];

pub fn salary(i: usize) -> f64 {
    4_500.5 + 1_000.0 * i as f64
}

/// `ID,NAME,SALARY,JOIN_DATE,ACTIVE` with `rows` employees numbered from 1.
pub fn employees_csv(rows: usize) -> String {
    let mut out = EMPLOYEE_COLUMNS.join(",");
    out.push('\n');
    for i in 1..=rows {
        out.push_str(&format!(
            "{i},Employee{i},{:.2},2024-01-{:02} 09:00:00,{}\n",
            salary(i),
            i % 28 + 1,
            i % 2 == 0
        ));
    }
    out
}

// (name, type, length, decimals)
pub type DbfFieldSpec<'a> = (&'a str, u8, u8, u8);

/// Minimal dBASE III writer: `records` are `(deleted, values)` with values as field text.
pub fn build_dbf(fields: &[DbfFieldSpec<'_>], records: &[(bool, Vec<String>)]) -> Vec<u8> {
    build_dbf_encoded(fields, records, 0x00, encoding_rs::UTF_8)
}

/// Like [`build_dbf`], with names and values written in `encoding` and `language_driver` stored
/// at header offset 29.
pub fn build_dbf_encoded(
    fields: &[DbfFieldSpec<'_>],
    records: &[(bool, Vec<String>)],
    language_driver: u8,
    encoding: &'static encoding_rs::Encoding,
) -> Vec<u8> {
    let header_len = 32 + fields.len() * 32 + 1;
    let record_len = 1 + fields.iter().map(|f| f.2 as usize).sum::<usize>();

    let mut out = vec![0u8; 32];
    out[0] = 0x03;
    out[1..4].copy_from_slice(&[124, 1, 2]);
    out[4..8].copy_from_slice(&(records.len() as u32).to_le_bytes());
    out[8..10].copy_from_slice(&(header_len as u16).to_le_bytes());
    out[10..12].copy_from_slice(&(record_len as u16).to_le_bytes());
    out[29] = language_driver;
    for (name, ty, len, dec) in fields {
        let name = encoding.encode(name).0;
        let mut desc = [0u8; 32];
        desc[..name.len()].copy_from_slice(&name);
        desc[11] = *ty;
        desc[16] = *len;
        desc[17] = *dec;
        out.extend_from_slice(&desc);
    }
    out.push(0x0D);
    for (deleted, values) in records {
        out.push(if *deleted { b'*' } else { b' ' });
        for ((_, ty, len, _), v) in fields.iter().zip(values) {
            let len = *len as usize;
            let bytes = encoding.encode(v).0;
            let padding = vec![b' '; len.saturating_sub(bytes.len())];
            let padded = if matches!(ty, b'N' | b'F') {
                [padding.as_slice(), &bytes[..]].concat()
            } else {
                [&bytes[..], padding.as_slice()].concat()
            };
            out.extend_from_slice(&padded[..len]);
        }
    }
    out.push(0x1A);
    out
}

pub const EMPLOYEE_DBF_FIELDS: [DbfFieldSpec<'static>; 5] = [
    ("ID", b'N', 10, 0),
    ("NAME", b'C', 20, 0),
    ("SALARY", b'N', 12, 2),
    ("JOIN_DATE", b'D', 8, 0),
    ("ACTIVE", b'L', 1, 0),
];

pub fn employee_dbf_record(i: usize) -> Vec<String> {
    vec![
        i.to_string(),
        format!("Employee{i}"),
        format!("{:.2}", salary(i)),
        format!("202401{:02}", i % 28 + 1),
        if i % 2 == 0 { "T" } else { "F" }.to_string(),
    ]
}

pub fn employees_dbf(rows: usize) -> Vec<u8> {
    let records: Vec<_> = (1..=rows).map(|i| (false, employee_dbf_record(i))).collect();
    build_dbf(&EMPLOYEE_DBF_FIELDS, &records)
}

#[cfg(feature = "excel_test_writer")]
pub fn employees_xlsx(rows: usize) -> Vec<u8> {
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    let mut wb = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let ws = wb.add_worksheet();
    ws.set_name("Employees").unwrap();

    for (col, name) in EMPLOYEE_COLUMNS.iter().enumerate() {
        ws.write_string(0, col as u16, *name).unwrap();
    }
    for i in 1..=rows {
        let row = i as u32;
        let joined = ExcelDateTime::parse_from_str(&format!("2024-01-{:02} 09:00:00", i % 28 + 1)).unwrap();
        ws.write_number(row, 0, i as f64).unwrap();
        ws.write_string(row, 1, format!("Employee{i}")).unwrap();
        ws.write_number(row, 2, salary(i)).unwrap();
        ws.write_datetime_with_format(row, 3, &joined, &date_format).unwrap();
        ws.write_boolean(row, 4, i % 2 == 0).unwrap();
    }

    wb.save_to_buffer().unwrap()
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |r| r.get(0))
        .unwrap()
}

/// Check the canonical 10-employee load.
pub fn assert_employees_loaded(conn: &Connection, table: &str) {
    assert_eq!(count_rows(conn, table), 10);

    let mut stmt = conn
        .prepare(&format!(
            "SELECT \"ID\", \"NAME\", \"SALARY\", \"JOIN_DATE\", \"ACTIVE\" FROM \"{table}\" ORDER BY \"ID\""
        ))
        .unwrap();
    let rows: Vec<(i64, String, f64, Option<String>, bool)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    for (n, (id, name, salary, joined, active)) in rows.into_iter().enumerate() {
        let i = n as i64 + 1;
        assert_eq!(id, i);
        assert_eq!(name, format!("Employee{i}"));
        assert!((5_000.0..=15_000.0).contains(&salary), "salary {salary} out of range");
        let joined = joined.expect("join date is NULL");
        assert!(joined.starts_with("2024-01-"), "unexpected join date {joined}");
        assert_eq!(active, i % 2 == 0);
    }
}
