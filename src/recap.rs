//! Pipeline B: scrape each page's data table, sum quantities per (opd, month, title, unit),
//! and write the recap CSV.

use crate::aggregate::{Aggregator, MonthlyTotals};
use crate::config::RecapOptions;
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::logsink::LogSink;
use crate::progress::make_count_progress;
use crate::table::{extract_table, opd_from_url, ExtractedTable};
use crate::util::{create_output, init_tracing_once};
use anyhow::{Context, Result};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// A page that contributed nothing, and why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageFailure {
    pub url: String,
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecapSummary {
    pub pages_ok: usize,
    pub rows_ingested: u64,
    pub buckets: usize,
    pub failed: Vec<PageFailure>,
    pub output: PathBuf,
}

#[derive(Clone, Default)]
pub struct DataRecap {
    pub(crate) opts: RecapOptions,
}

impl DataRecap {
    pub fn new() -> Self {
        Self { opts: RecapOptions::default() }
    }

    pub fn with_options(opts: RecapOptions) -> Self {
        Self { opts }
    }

    // -------- Builder methods --------
    pub fn urls<I, S>(mut self, urls: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> { self.opts = self.opts.with_urls(urls); self }
    pub fn output(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output(path); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }

    pub fn run_http<L: LogSink + ?Sized>(&self, log: &L) -> Result<RecapSummary> {
        init_tracing_once();
        let fetcher = HttpFetcher::new(&self.opts.user_agent, self.opts.request_timeout)?;
        self.run(&fetcher, log)
    }

    /// Fetch, extract and aggregate every page, then write the recap file.
    pub fn run<F, L>(&self, fetcher: &F, log: &L) -> Result<RecapSummary>
    where
        F: PageFetcher + ?Sized,
        L: LogSink + ?Sized,
    {
        let out_path = &self.opts.output;
        let out = match create_output(out_path) {
            Ok(f) => BufWriter::new(f),
            Err(e) => {
                log.emit(&format!("Failed to create CSV file {}: {}", out_path.display(), e));
                return Err(e).with_context(|| format!("create output {}", out_path.display()));
            }
        };

        let (totals, mut summary) = self.collect(fetcher, log);
        totals.write_csv(out).with_context(|| format!("write {}", out_path.display()))?;
        summary.output = out_path.clone();

        log.emit(&format!(
            "Recap saved to {} ({} buckets from {} pages, {} failed)",
            out_path.display(),
            summary.buckets,
            summary.pages_ok,
            summary.failed.len()
        ));
        Ok(summary)
    }

    /// Aggregate all configured pages without writing anything.
    pub fn collect<F, L>(&self, fetcher: &F, log: &L) -> (MonthlyTotals, RecapSummary)
    where
        F: PageFetcher + ?Sized,
        L: LogSink + ?Sized,
    {
        let pb = make_count_progress(self.opts.urls.len() as u64, "Recap: pages", self.opts.progress);
        let mut total = MonthlyTotals::default();
        let mut summary = RecapSummary {
            pages_ok: 0,
            rows_ingested: 0,
            buckets: 0,
            failed: Vec::new(),
            output: self.opts.output.clone(),
        };

        for url in &self.opts.urls {
            match scrape_page(fetcher, url) {
                Ok(table) => {
                    tracing::debug!(url=%url, headers=?table.headers, "table headers");
                    summary.rows_ingested += table.rows.len() as u64;
                    summary.pages_ok += 1;
                    total.merge(MonthlyTotals::from_rows(&table.rows));
                    log.emit(&format!("Scraped {} rows from {}", table.rows.len(), url));
                }
                Err(e) => {
                    log.emit(&format!("Failed to scrape {}: {:#}", url, e));
                    summary.failed.push(PageFailure { url: url.clone(), error: format!("{:#}", e) });
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message("Recap: pages done");

        summary.buckets = total.len();
        (total, summary)
    }
}

/// One page end to end; any fetch or shape error fails the page as a whole.
pub fn scrape_page<F: PageFetcher + ?Sized>(fetcher: &F, url: &str) -> Result<ExtractedTable> {
    let opd = opd_from_url(url)?;
    let html = fetcher.fetch(url)?;
    let table = extract_table(&html, &opd).with_context(|| format!("parse table of {url}"))?;
    Ok(table)
}
