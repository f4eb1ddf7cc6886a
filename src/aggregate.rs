//! Grouped sums over scraped rows.
//! Implement `Aggregator` for your aggregation state; pages are folded into a page-local
//! accumulator and merged into the run total only once the whole page parsed.

use crate::model::{AggregateKey, ScrapedRow, RECAP_HEADER};
use crate::sink::RecordSink;
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Write;

pub trait Aggregator: Default {
    fn ingest(&mut self, row: &ScrapedRow);
    fn merge(&mut self, other: Self);
}

/// Sum of `jumlah` per (opd, bulan, judul, satuan), iterated in key order.
/// Sums are widened to `i128`, so adding any number of `i64` quantities cannot overflow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonthlyTotals {
    totals: BTreeMap<AggregateKey, i128>,
}

impl MonthlyTotals {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a ScrapedRow>) -> Self {
        let mut agg = Self::default();
        for r in rows {
            agg.ingest(r);
        }
        agg
    }

    pub fn get(&self, key: &AggregateKey) -> Option<i128> {
        self.totals.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AggregateKey, i128)> {
        self.totals.iter().map(|(k, v)| (k, *v))
    }

    /// One row per bucket after the `opd, bulan, judul, satuan, jumlah` header.
    pub fn write_csv<W: Write>(&self, out: W) -> Result<W> {
        let mut sink = RecordSink::from_writer(out, &RECAP_HEADER)?;
        for (k, v) in self.iter() {
            sink.write_fields([k.opd.clone(), k.bulan.to_string(), k.judul.clone(), k.satuan.clone(), v.to_string()])?;
        }
        sink.finish()
    }
}

impl Aggregator for MonthlyTotals {
    fn ingest(&mut self, row: &ScrapedRow) {
        *self.totals.entry(row.key()).or_insert(0) += i128::from(row.quantity);
    }

    fn merge(&mut self, other: Self) {
        for (k, v) in other.totals {
            *self.totals.entry(k).or_insert(0) += v;
        }
    }
}
