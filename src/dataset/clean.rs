//! Data cleaning.
//!
//! Cleaning mirrors the preprocessing the dashboard applies on every upload:
//! drop "Unnamed" placeholder columns, normalize the spreadsheet `#REF!`
//! sentinel to missing, drop rows containing any missing cell, parse the
//! sale date day-first, and drop (counting) rows whose date or numeric
//! fields fail to parse.

use chrono::NaiveDate;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dataset::{RawTable, SalesDataset, SalesRecord};
use crate::error::{Error, Result};

/// Columns the cleaner requires in the input table
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Product Name",
    "Quantity",
    "Sell Price",
    "Date Sold",
    "Product Category",
    "Store Name",
];

/// Spreadsheet auto-fill error token treated as a missing value
pub const SENTINEL_ERROR_TOKEN: &str = "#REF!";

/// Header pattern for index/placeholder columns exported by spreadsheets
const UNNAMED_COLUMN_PATTERN: &str = r"(?i)^unnamed";

/// Date formats tried in order when parsing "Date Sold" (day-first, then ISO)
const DATE_FORMATS: [&str; 4] = ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Counts of everything the cleaner dropped or substituted.
///
/// Nothing is removed silently: the presentation layer surfaces these
/// counts as warnings next to the preprocessed table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    /// Rows in the raw input
    pub rows_in: usize,
    /// Rows surviving every cleaning step
    pub rows_out: usize,
    /// Placeholder columns removed
    pub unnamed_columns_dropped: usize,
    /// Rows dropped because at least one cell was missing (or the sentinel)
    pub rows_dropped_missing: usize,
    /// Rows dropped because "Date Sold" failed to parse
    pub rows_dropped_invalid_date: usize,
    /// Rows dropped because "Quantity" or "Sell Price" failed to parse
    pub rows_dropped_invalid_number: usize,
}

impl CleanReport {
    /// Total number of rows removed by cleaning
    pub fn rows_dropped(&self) -> usize {
        self.rows_dropped_missing + self.rows_dropped_invalid_date + self.rows_dropped_invalid_number
    }
}

/// Clean a raw table into a typed, date-indexed sales dataset.
///
/// Fails with [`Error::MissingColumn`] when a required column is absent and
/// with [`Error::EmptyData`] when no rows survive, so downstream stages
/// never run over a structurally broken input.
pub fn clean(table: &RawTable) -> Result<(SalesDataset, CleanReport)> {
    let mut report = CleanReport {
        rows_in: table.row_count(),
        ..CleanReport::default()
    };

    // Strip placeholder columns before checking the schema
    let unnamed = Regex::new(UNNAMED_COLUMN_PATTERN).expect("static pattern");
    let keep: Vec<usize> = table
        .column_names()
        .iter()
        .enumerate()
        .filter(|(_, name)| !unnamed.is_match(name))
        .map(|(i, _)| i)
        .collect();
    report.unnamed_columns_dropped = table.column_names().len() - keep.len();
    let table = table.select_columns(&keep);

    // Structural check: every required column must be present
    let mut positions = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
        positions[slot] = table
            .column_index(name)
            .ok_or_else(|| Error::MissingColumn((*name).to_string()))?;
    }
    let [product_col, quantity_col, price_col, date_col, category_col, store_col] = positions;

    // Named columns beyond the required six pass through untyped
    let extra_cols: Vec<usize> = (0..table.column_names().len())
        .filter(|i| !positions.contains(i))
        .collect();
    let extra_columns: Vec<String> = extra_cols
        .iter()
        .map(|&i| table.column_names()[i].clone())
        .collect();

    let mut records = Vec::with_capacity(table.row_count());
    let mut extra_values = Vec::with_capacity(table.row_count());
    for row in table.rows() {
        // All-or-nothing per row: one missing cell discards the row
        if row
            .iter()
            .any(|cell| cell.is_empty() || cell == SENTINEL_ERROR_TOKEN)
        {
            report.rows_dropped_missing += 1;
            continue;
        }

        let date_sold = match parse_date(&row[date_col]) {
            Some(date) => date,
            None => {
                report.rows_dropped_invalid_date += 1;
                continue;
            }
        };

        let quantity = row[quantity_col].parse::<u32>().ok();
        let sell_price = row[price_col]
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0);
        let (quantity, sell_price) = match (quantity, sell_price) {
            (Some(q), Some(p)) => (q, p),
            _ => {
                report.rows_dropped_invalid_number += 1;
                continue;
            }
        };

        records.push(SalesRecord {
            product_name: row[product_col].clone(),
            quantity,
            sell_price,
            date_sold,
            product_category: row[category_col].clone(),
            store_name: row[store_col].clone(),
        });
        extra_values.push(extra_cols.iter().map(|&i| row[i].clone()).collect());
    }

    report.rows_out = records.len();
    if report.rows_dropped() > 0 {
        warn!(
            "cleaning dropped {} of {} rows ({} missing, {} invalid dates, {} invalid numbers)",
            report.rows_dropped(),
            report.rows_in,
            report.rows_dropped_missing,
            report.rows_dropped_invalid_date,
            report.rows_dropped_invalid_number
        );
    }

    let dataset = SalesDataset::with_extras(records, extra_columns, extra_values)?;
    Ok((dataset, report))
}

/// Tolerant day-first date parsing
fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value.trim(), fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_day_first() {
        assert_eq!(
            parse_date("25-12-2023"),
            NaiveDate::from_ymd_opt(2023, 12, 25)
        );
        assert_eq!(
            parse_date("05/01/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(
            parse_date("2024-01-05"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("32-01-2024"), None);
    }
}
