//! Resampling cleaned sales onto the shared weekly grid.

use crate::dataset::SalesDataset;
use crate::error::Result;
use crate::time_series::core::{SalesSeries, WeeklyIndex};

/// Weekly quantity series for one product.
///
/// Quantities are summed within each Monday-start week and reindexed onto
/// the grid spanning the dataset's global min/max sale dates, zero-filled
/// for weeks without sales. A product absent from most (or all) weeks still
/// yields a full-length series of zeros.
pub fn weekly_series(dataset: &SalesDataset, product: &str) -> Result<SalesSeries> {
    let (min, max) = dataset.date_range();
    let index = WeeklyIndex::spanning(min, max)?;
    let mut values = vec![0.0; index.len()];
    for record in dataset
        .records()
        .iter()
        .filter(|r| r.product_name == product)
    {
        // Dates are within [min, max] by construction, so position holds
        if let Some(pos) = index.position(record.date_sold) {
            values[pos] += f64::from(record.quantity);
        }
    }
    SalesSeries::new(product.to_string(), index, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{SalesDataset, SalesRecord};
    use chrono::NaiveDate;

    fn record(product: &str, quantity: u32, date: (i32, u32, u32)) -> SalesRecord {
        SalesRecord {
            product_name: product.to_string(),
            quantity,
            sell_price: 10.0,
            date_sold: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            product_category: "Men".to_string(),
            store_name: "Store A".to_string(),
        }
    }

    #[test]
    fn sums_within_weeks_and_zero_fills() {
        let dataset = SalesDataset::new(vec![
            record("jeans", 3, (2024, 1, 2)),  // week of Jan 1
            record("jeans", 4, (2024, 1, 5)),  // same week
            record("jeans", 2, (2024, 1, 16)), // week of Jan 15
            record("coat", 9, (2024, 1, 10)),  // widens nothing, same range
        ])
        .unwrap();

        let series = weekly_series(&dataset, "jeans").unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.values(), &[7.0, 0.0, 2.0]);
    }

    #[test]
    fn grid_spans_global_range_not_product_range() {
        let dataset = SalesDataset::new(vec![
            record("jeans", 1, (2024, 1, 1)),
            record("coat", 1, (2024, 2, 26)),
        ])
        .unwrap();

        let jeans = weekly_series(&dataset, "jeans").unwrap();
        let coat = weekly_series(&dataset, "coat").unwrap();
        assert_eq!(jeans.len(), coat.len());
        assert_eq!(jeans.len(), 9);
    }

    #[test]
    fn unknown_product_yields_all_zero_series() {
        let dataset = SalesDataset::new(vec![record("jeans", 5, (2024, 1, 1))]).unwrap();
        let series = weekly_series(&dataset, "dress").unwrap();
        assert_eq!(series.total(), 0.0);
        assert_eq!(series.len(), 1);
    }
}
