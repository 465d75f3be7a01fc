//! Sales dataset types.
//!
//! A [`RawTable`] is the untyped tabular form of an uploaded or cached CSV
//! file. Cleaning (see [`clean`]) turns it into a [`SalesDataset`] of typed
//! [`SalesRecord`]s indexed by sale date. Schema violations are caught at
//! this boundary instead of propagating as silent missing values.

pub mod clean;

pub use clean::{clean, CleanReport, REQUIRED_COLUMNS, SENTINEL_ERROR_TOKEN};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Date format used for persisted artifacts (day-month-year)
pub const ARTIFACT_DATE_FORMAT: &str = "%d-%m-%Y";

/// An untyped table of string cells with named columns, as read from CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Create an empty table with the given column names
    pub fn new(columns: Vec<String>) -> Self {
        RawTable {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; its length must match the column count
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InconsistentRowCount {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in order
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in order
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// A copy of this table restricted to the columns at `keep`
    pub(crate) fn select_columns(&self, keep: &[usize]) -> RawTable {
        let columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
            .collect();
        RawTable { columns, rows }
    }
}

/// One cleaned sales transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub product_name: String,
    pub quantity: u32,
    pub sell_price: f64,
    pub date_sold: NaiveDate,
    pub product_category: String,
    pub store_name: String,
}

/// A cleaned, date-indexed sales dataset.
///
/// The date index is not unique; several sales of the same product on the
/// same day are expected. Records keep their input order. Named columns
/// beyond the required six are carried along untyped so they survive into
/// the preprocessed artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesDataset {
    records: Vec<SalesRecord>,
    extra_columns: Vec<String>,
    extra_values: Vec<Vec<String>>,
}

impl SalesDataset {
    /// Build a dataset from cleaned records, with no extra columns
    pub fn new(records: Vec<SalesRecord>) -> Result<Self> {
        Self::with_extras(records, Vec::new(), Vec::new())
    }

    /// Build a dataset carrying untyped extra columns alongside the records.
    /// `extra_values` holds one row per record, in record order.
    pub fn with_extras(
        records: Vec<SalesRecord>,
        extra_columns: Vec<String>,
        extra_values: Vec<Vec<String>>,
    ) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::EmptyData(
                "no rows remain after cleaning".to_string(),
            ));
        }
        if extra_columns.is_empty() {
            return Ok(SalesDataset {
                records,
                extra_columns,
                extra_values: Vec::new(),
            });
        }
        if extra_values.len() != records.len() {
            return Err(Error::InconsistentRowCount {
                expected: records.len(),
                found: extra_values.len(),
            });
        }
        for row in &extra_values {
            if row.len() != extra_columns.len() {
                return Err(Error::InconsistentRowCount {
                    expected: extra_columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(SalesDataset {
            records,
            extra_columns,
            extra_values,
        })
    }

    /// Names of the untyped extra columns carried through cleaning
    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Global minimum and maximum sale dates
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        let mut min = self.records[0].date_sold;
        let mut max = min;
        for r in &self.records[1..] {
            if r.date_sold < min {
                min = r.date_sold;
            }
            if r.date_sold > max {
                max = r.date_sold;
            }
        }
        (min, max)
    }

    /// Unique product names, sorted ascending
    pub fn product_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .iter()
            .map(|r| r.product_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Total quantity sold for one product across the whole dataset
    pub fn total_quantity(&self, product: &str) -> u64 {
        self.records
            .iter()
            .filter(|r| r.product_name == product)
            .map(|r| u64::from(r.quantity))
            .sum()
    }

    /// Render the dataset as a raw table, dates first and formatted with
    /// `date_format` (artifact persistence uses day-month-year). Extra
    /// columns follow the six typed ones.
    pub fn to_table(&self, date_format: &str) -> RawTable {
        let mut columns = vec![
            "Date Sold".to_string(),
            "Product Name".to_string(),
            "Quantity".to_string(),
            "Sell Price".to_string(),
            "Product Category".to_string(),
            "Store Name".to_string(),
        ];
        columns.extend(self.extra_columns.iter().cloned());
        let mut table = RawTable::new(columns);
        for (i, r) in self.records.iter().enumerate() {
            let mut row = vec![
                r.date_sold.format(date_format).to_string(),
                r.product_name.clone(),
                r.quantity.to_string(),
                r.sell_price.to_string(),
                r.product_category.clone(),
                r.store_name.clone(),
            ];
            if let Some(extras) = self.extra_values.get(i) {
                row.extend(extras.iter().cloned());
            }
            // Row width matches the header above
            table.push_row(row).expect("fixed-width row");
        }
        table
    }
}
