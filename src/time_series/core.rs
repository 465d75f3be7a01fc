//! Weekly time axis and sales series.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Snap a date to the Monday starting its week
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// A dense, gap-free grid of Monday-start weeks over a closed date range.
///
/// Every product series in a dataset shares one grid spanning the global
/// min/max sale dates, so series lengths are identical across products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyIndex {
    start: NaiveDate,
    len: usize,
}

impl WeeklyIndex {
    /// The grid of weeks covering `[min, max]`
    pub fn spanning(min: NaiveDate, max: NaiveDate) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidInput(format!(
                "invalid date range: {min} is after {max}"
            )));
        }
        let start = week_start(min);
        let end = week_start(max);
        let len = ((end - start).num_days() / 7) as usize + 1;
        Ok(WeeklyIndex { start, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First week label
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last week label
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::weeks(self.len as i64 - 1)
    }

    /// Week label at position `i`
    pub fn get(&self, i: usize) -> Option<NaiveDate> {
        (i < self.len).then(|| self.start + Duration::weeks(i as i64))
    }

    /// Position of the week containing `date`
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        let offset = (week_start(date) - self.start).num_days();
        if offset < 0 || offset % 7 != 0 {
            return None;
        }
        let pos = (offset / 7) as usize;
        (pos < self.len).then_some(pos)
    }

    /// Iterate week labels in order
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.len).map(move |i| self.start + Duration::weeks(i as i64))
    }

    /// A sub-grid of `len` weeks starting at position `offset`
    pub fn slice(&self, offset: usize, len: usize) -> Result<WeeklyIndex> {
        if offset + len > self.len {
            return Err(Error::InvalidInput(format!(
                "slice {offset}..{} out of bounds for {} weeks",
                offset + len,
                self.len
            )));
        }
        Ok(WeeklyIndex {
            start: self.start + Duration::weeks(offset as i64),
            len,
        })
    }
}

/// Weekly quantity series for one product on a [`WeeklyIndex`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSeries {
    product: String,
    index: WeeklyIndex,
    values: Vec<f64>,
}

impl SalesSeries {
    pub fn new(product: String, index: WeeklyIndex, values: Vec<f64>) -> Result<Self> {
        if values.len() != index.len() {
            return Err(Error::InvalidInput(format!(
                "series length {} does not match index length {}",
                values.len(),
                index.len()
            )));
        }
        Ok(SalesSeries {
            product,
            index,
            values,
        })
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn index(&self) -> &WeeklyIndex {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of all weekly quantities
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// (week label, quantity) pairs in time order
    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.index.iter().zip(self.values.iter().copied())
    }

    /// Chronological train/test split with no shuffling.
    ///
    /// The test segment holds `round(test_fraction * len)` trailing weeks;
    /// the train segment holds everything before it. Time order is a
    /// correctness requirement for model evaluation, so there is no random
    /// variant of this operation.
    pub fn split(&self, test_fraction: f64) -> Result<(SalesSeries, SalesSeries)> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(Error::InvalidInput(format!(
                "test fraction must be in [0, 1): {test_fraction}"
            )));
        }
        let n = self.len();
        let test_len = (n as f64 * test_fraction).round() as usize;
        let train_len = n - test_len;
        if train_len == 0 || test_len == 0 {
            return Err(Error::InsufficientData(format!(
                "cannot split {n} weeks into non-empty train and test segments"
            )));
        }
        let train = SalesSeries {
            product: self.product.clone(),
            index: self.index.slice(0, train_len)?,
            values: self.values[..train_len].to_vec(),
        };
        let test = SalesSeries {
            product: self.product.clone(),
            index: self.index.slice(train_len, test_len)?,
            values: self.values[train_len..].to_vec(),
        };
        Ok((train, test))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_start_snaps_to_monday() {
        // 2024-01-01 is a Monday
        assert_eq!(week_start(date(2024, 1, 1)), date(2024, 1, 1));
        assert_eq!(week_start(date(2024, 1, 4)), date(2024, 1, 1));
        assert_eq!(week_start(date(2024, 1, 7)), date(2024, 1, 1));
        assert_eq!(week_start(date(2024, 1, 8)), date(2024, 1, 8));
    }

    #[test]
    fn spanning_counts_weeks_inclusive() {
        let index = WeeklyIndex::spanning(date(2024, 1, 3), date(2024, 1, 16)).unwrap();
        assert_eq!(index.start(), date(2024, 1, 1));
        assert_eq!(index.len(), 3);
        assert_eq!(index.end(), date(2024, 1, 15));
    }

    #[test]
    fn position_maps_any_day_of_week() {
        let index = WeeklyIndex::spanning(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(index.position(date(2024, 1, 1)), Some(0));
        assert_eq!(index.position(date(2024, 1, 14)), Some(1));
        assert_eq!(index.position(date(2024, 2, 5)), None);
        assert_eq!(index.position(date(2023, 12, 31)), None);
    }

    #[test]
    fn split_is_contiguous_and_ordered() {
        let index = WeeklyIndex::spanning(date(2024, 1, 1), date(2024, 3, 4)).unwrap();
        let n = index.len();
        let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let series = SalesSeries::new("t-shirt".to_string(), index, values).unwrap();

        let (train, test) = series.split(0.2).unwrap();
        assert_eq!(train.len() + test.len(), n);
        assert_eq!(test.len(), (n as f64 * 0.2).round() as usize);
        assert_eq!(
            test.index().start(),
            train.index().end() + Duration::weeks(1)
        );
        assert_eq!(test.index().end(), series.index().end());
    }

    #[test]
    fn split_rejects_tiny_series() {
        let index = WeeklyIndex::spanning(date(2024, 1, 1), date(2024, 1, 8)).unwrap();
        let series = SalesSeries::new("t-shirt".to_string(), index, vec![1.0, 2.0]).unwrap();
        assert!(series.split(0.2).is_err());
    }
}
