#[path = "common/mod.rs"]
mod common;

use common::*;
use rekap::{
    extract_table, opd_from_url, AggregateKey, Aggregator, DataRecap, MemoryLog, MonthlyTotals, ScrapedRow, TableError, TracingLog,
    YearMonth,
};

const MUNGKU: &str = "https://kel-mungkubaru.palangkaraya.go.id/data-real-time/";
const PAHANDUT: &str = "https://kel-pahandutseberang.palangkaraya.go.id/data-real-time/";

fn row(opd: &str, date: (i32, u8, u8), judul: &str, satuan: &str, qty: i64) -> ScrapedRow {
    ScrapedRow {
        opd: opd.to_string(),
        date: day(date.0, date.1, date.2),
        time: "08:00".to_string(),
        title: judul.to_string(),
        unit: satuan.to_string(),
        quantity: qty,
    }
}

fn key(opd: &str, (year, month): (u16, u8), judul: &str, satuan: &str) -> AggregateKey {
    AggregateKey { opd: opd.into(), bulan: YearMonth { year, month }, judul: judul.into(), satuan: satuan.into() }
}

#[test]
fn opd_is_url_host() {
    assert_eq!(opd_from_url(MUNGKU).unwrap(), "kel-mungkubaru.palangkaraya.go.id");
    assert!(matches!(opd_from_url("not a url"), Err(TableError::BadUrl(_))));
}

/// Header row is skipped, cells are trimmed, quantities are integers, dates are typed.
#[test]
fn extracts_first_table_rows() {
    let html = data_page(&[
        ("2025-07-01", "08:00", "Surat Keterangan", " Lembar ", "3"),
        ("2025-07-15", "09:30", " Surat Keterangan", "Lembar", "5"),
        ("2025-08-02", "10:00", "KTP", "Berkas", "2"),
    ]);
    let t = extract_table(&html, "opd-a").unwrap();

    assert_eq!(t.headers, vec!["Tanggal", "Waktu", "Judul", "Satuan", "Jumlah"]);
    assert_eq!(t.rows.len(), 3);
    assert_eq!(t.rows[0], row("opd-a", (2025, 7, 1), "Surat Keterangan", "Lembar", 3));
    assert_eq!(t.rows[1].title, "Surat Keterangan");
    assert_eq!(t.rows[2].quantity, 2);
}

#[test]
fn non_integer_quantity_fails_the_page() {
    let html = data_page(&[("2025-07-01", "08:00", "KTP", "Berkas", "3"), ("2025-07-02", "08:00", "KTP", "Berkas", "tiga")]);
    match extract_table(&html, "x") {
        Err(TableError::BadQuantity { row, value }) => {
            assert_eq!(row, 2);
            assert_eq!(value, "tiga");
        }
        other => panic!("expected BadQuantity, got {:?}", other),
    }
}

#[test]
fn shape_errors() {
    assert!(matches!(extract_table("<html><body><p>kosong</p></body></html>", "x"), Err(TableError::NoTable)));

    let short = "<table><tr><th>a</th></tr><tr><td>2025-07-01</td><td>08:00</td></tr></table>";
    assert!(matches!(extract_table(short, "x"), Err(TableError::ShortRow { row: 1, found: 2 })));

    let bad_date = data_page(&[("01/07/2025", "08:00", "KTP", "Berkas", "1")]);
    assert!(matches!(extract_table(&bad_date, "x"), Err(TableError::BadDate { .. })));
}

/// Same key with quantities [3, 5, 2] sums to 10; a different month or unit never merges.
#[test]
fn sums_per_key() {
    let rows = vec![
        row("A", (2025, 7, 1), "X", "unit", 3),
        row("A", (2025, 7, 9), "X", "unit", 5),
        row("A", (2025, 7, 31), "X", "unit", 2),
        row("A", (2025, 8, 1), "X", "unit", 100),
        row("A", (2025, 7, 3), "X", "lembar", 7),
        row("B", (2025, 7, 3), "X", "unit", 11),
    ];
    let agg = MonthlyTotals::from_rows(&rows);

    assert_eq!(agg.get(&key("A", (2025, 7), "X", "unit")), Some(10));
    assert_eq!(agg.get(&key("A", (2025, 8), "X", "unit")), Some(100));
    assert_eq!(agg.get(&key("A", (2025, 7), "X", "lembar")), Some(7));
    assert_eq!(agg.get(&key("B", (2025, 7), "X", "unit")), Some(11));
    assert_eq!(agg.len(), 4);
    assert_eq!(agg.iter().map(|(_, v)| v).sum::<i128>(), rows.iter().map(|r| i128::from(r.quantity)).sum::<i128>());
}

/// Quantities near the `i64` limits still sum exactly, and the CSV carries the full value.
#[test]
fn sums_past_i64_range_stay_exact() {
    let rows = vec![
        row("A", (2025, 7, 1), "X", "unit", i64::MAX),
        row("A", (2025, 7, 2), "X", "unit", 1),
        row("A", (2025, 7, 3), "Y", "unit", i64::MIN),
        row("A", (2025, 7, 4), "Y", "unit", -1),
    ];
    let mut agg = MonthlyTotals::from_rows(&rows[..2]);
    agg.merge(MonthlyTotals::from_rows(&rows[2..]));

    assert_eq!(agg.get(&key("A", (2025, 7), "X", "unit")), Some(i128::from(i64::MAX) + 1));
    assert_eq!(agg.get(&key("A", (2025, 7), "Y", "unit")), Some(i128::from(i64::MIN) - 1));

    let csv = String::from_utf8(agg.write_csv(Vec::new()).unwrap()).unwrap();
    assert!(csv.contains("A,2025-07,X,unit,9223372036854775808"));
    assert!(csv.contains("A,2025-07,Y,unit,-9223372036854775809"));
}

/// Merging partial aggregates equals aggregating everything at once.
#[test]
fn merge_matches_single_pass() {
    let a = vec![row("A", (2025, 7, 1), "X", "unit", 3), row("A", (2025, 7, 2), "Y", "unit", 1)];
    let b = vec![row("A", (2025, 7, 5), "X", "unit", 5), row("A", (2025, 7, 6), "X", "unit", 2)];

    let mut merged = MonthlyTotals::from_rows(&a);
    merged.merge(MonthlyTotals::from_rows(&b));
    let single = MonthlyTotals::from_rows(a.iter().chain(b.iter()));

    assert_eq!(merged, single);
    assert_eq!(merged.get(&key("A", (2025, 7), "X", "unit")), Some(10));
}

/// Titles differing only by case stay in separate buckets.
#[test]
fn titles_are_not_case_folded() {
    let rows = vec![row("A", (2025, 7, 1), "KTP", "Berkas", 1), row("A", (2025, 7, 1), "ktp", "Berkas", 1)];
    assert_eq!(MonthlyTotals::from_rows(&rows).len(), 2);
}

/// Full recap over two sources; one page of the second source is malformed and
/// contributes nothing while the rest is written sorted by key.
#[test]
fn recap_writes_sorted_totals_and_skips_bad_page() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("rekap.csv");
    let broken = "https://kel-langkai.palangkaraya.go.id/data-real-time/";

    let fetcher = FakeFetcher::default()
        .with_page(
            MUNGKU,
            data_page(&[
                ("2025-07-01", "08:00", "KTP", "Berkas", "3"),
                ("2025-07-20", "08:00", "KTP", "Berkas", "5"),
                ("2025-07-21", "08:00", "KTP", "Berkas", "2"),
                ("2025-06-30", "08:00", "KK", "Berkas", "4"),
            ]),
        )
        .with_page(PAHANDUT, data_page(&[("2025-07-05", "08:00", "KTP", "Berkas", "9")]))
        .with_page(broken, data_page(&[("2025-07-05", "08:00", "KTP", "Berkas", "9"), ("x", "y", "z", "w", "1")]));

    let log = MemoryLog::new();
    let summary = DataRecap::new()
        .urls([MUNGKU, broken, PAHANDUT, "https://kel-sabaru.palangkaraya.go.id/data-real-time/"])
        .output(&out)
        .progress(false)
        .run(&fetcher, &log)
        .unwrap();

    assert_eq!(summary.pages_ok, 2);
    assert_eq!(summary.failed.len(), 2);
    assert_eq!(summary.failed[0].url, broken);
    assert!(summary.failed[1].error.contains("404"));
    assert!(log.contains("Failed to scrape"));

    let rows = read_csv(&out);
    assert_eq!(rows[0], vec!["opd", "bulan", "judul", "satuan", "jumlah"]);
    assert_eq!(
        rows[1..].to_vec(),
        vec![
            vec!["kel-mungkubaru.palangkaraya.go.id", "2025-06", "KK", "Berkas", "4"],
            vec!["kel-mungkubaru.palangkaraya.go.id", (2025, 7), "KTP", "Berkas", "10"],
            vec!["kel-pahandutseberang.palangkaraya.go.id", (2025, 7), "KTP", "Berkas", "9"],
        ]
    );
    assert_eq!(summary.buckets, 3);
    assert_eq!(summary.rows_ingested, 5);
}

/// The same source listed twice contributes to the same buckets.
#[test]
fn repeated_source_accumulates() {
    let fetcher = FakeFetcher::default().with_page(MUNGKU, data_page(&[("2025-07-01", "08:00", "KTP", "Berkas", "3")]));
    let (totals, summary) = DataRecap::new().urls([MUNGKU, MUNGKU]).progress(false).collect(&fetcher, &TracingLog);

    assert_eq!(summary.pages_ok, 2);
    assert_eq!(totals.get(&key("kel-mungkubaru.palangkaraya.go.id", (2025, 7), "KTP", "Berkas")), Some(6));
}
