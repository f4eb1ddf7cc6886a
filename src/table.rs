//! Typed extraction of the first `<table>` on a municipal "data real-time" page.
//! Expected cell order per row: date, time, title, unit, quantity.

use crate::date::parse_ymd;
use crate::model::ScrapedRow;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    InvalidSelector(String),

    #[error("no <table> element on the page")]
    NoTable,

    #[error("row {row}: expected at least 5 cells, found {found}")]
    ShortRow { row: usize, found: usize },

    #[error("row {row}: invalid date '{value}'")]
    BadDate { row: usize, value: String },

    #[error("row {row}: quantity '{value}' is not an integer")]
    BadQuantity { row: usize, value: String },

    #[error("cannot derive a source name from URL '{0}'")]
    BadUrl(String),
}

/// Header labels and typed rows of one page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedTable {
    pub headers: Vec<String>,
    pub rows: Vec<ScrapedRow>,
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector, TableError> {
    Selector::parse(sel_str).map_err(|_| TableError::InvalidSelector(sel_str.into()))
}

/// Concatenated, per-node trimmed text of an element.
fn cell_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect::<String>()
}

/// Source identifier: the host part of the page URL.
pub fn opd_from_url(url: &str) -> Result<String, TableError> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .ok_or_else(|| TableError::BadUrl(url.to_string()))
}

/// Parse the first table of `html`. The first `<tr>` is the header row and is skipped;
/// any malformed data row fails the whole page.
pub fn extract_table(html: &str, opd: &str) -> Result<ExtractedTable, TableError> {
    let doc = Html::parse_document(html);
    let table_sel = create_selector("table")?;
    let th_sel = create_selector("th")?;
    let tr_sel = create_selector("tr")?;
    let td_sel = create_selector("td")?;

    let table = doc.select(&table_sel).next().ok_or(TableError::NoTable)?;
    let headers = table.select(&th_sel).map(cell_text).collect();

    let mut rows = Vec::new();
    for (i, tr) in table.select(&tr_sel).skip(1).enumerate() {
        let row = i + 1;
        let cells: Vec<String> = tr.select(&td_sel).map(cell_text).collect();
        if cells.len() < 5 {
            return Err(TableError::ShortRow { row, found: cells.len() });
        }
        let date = parse_ymd(&cells[0]).map_err(|_| TableError::BadDate { row, value: cells[0].clone() })?;
        let quantity = cells[4]
            .parse::<i64>()
            .map_err(|_| TableError::BadQuantity { row, value: cells[4].clone() })?;
        rows.push(ScrapedRow {
            opd: opd.to_string(),
            date,
            time: cells[1].clone(),
            title: cells[2].clone(),
            unit: cells[3].trim().to_string(),
            quantity,
        });
    }
    Ok(ExtractedTable { headers, rows })
}
