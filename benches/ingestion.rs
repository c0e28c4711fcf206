//! End-to-end CSV ingestion into in-memory SQLite.
//!
//! Run with: cargo bench --bench ingestion

use std::fmt::Write;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rusqlite::Connection;
use tabload::ingestion::{IngestionOptions, InferencePolicy, ingest};

fn make_csv(rows: usize) -> String {
    let mut out = String::from("ID,NAME,SALARY,JOIN_DATE,ACTIVE\n");
    for i in 1..=rows {
        let _ = writeln!(
            out,
            "{i},Employee{i},{}.50,2024-01-{:02} 09:00:00,{}",
            5000 + i % 10_000,
            i % 28 + 1,
            i % 2 == 0
        );
    }
    out
}

fn bench_csv_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_ingest");
    for rows in [1_000usize, 10_000] {
        let csv = make_csv(rows);
        group.throughput(Throughput::Elements(rows as u64));
        for (label, inference) in [("all_rows", InferencePolicy::AllRows), ("first_row", InferencePolicy::FirstRow)] {
            let options = IngestionOptions {
                inference,
                ..Default::default()
            };
            group.bench_with_input(BenchmarkId::new(label, rows), &csv, |b, csv| {
                b.iter(|| {
                    let mut conn = Connection::open_in_memory().expect("open sqlite");
                    let summary = ingest("employees.csv", csv.as_bytes(), &mut conn, &options).expect("ingest");
                    black_box(summary.rows_inserted)
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_csv_ingest);
criterion_main!(benches);
