//! Store and category analytics.
//!
//! Aggregates the cleaned dataset by (store, category) to answer the
//! dashboard's standing questions: how much of each category does each
//! store sell, which store performs best per category, and what stock
//! level covers the 95th percentile of historical demand.
//!
//! Grouped output is ordered ascending by (store, category); "first
//! occurrence" tie-breaking downstream refers to that order. All tables
//! are derived and recomputed on every run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{RawTable, SalesDataset};

/// Aggregate sales for one (store, category) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreCategorySales {
    pub store_name: String,
    pub product_category: String,
    /// Sum of quantities over every transaction of the pair
    pub total_quantity: u64,
    /// Mean per-transaction sell price
    pub mean_sell_price: f64,
}

/// Recommended stock level for one (store, category) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedInventoryRow {
    pub store_name: String,
    pub product_category: String,
    /// 95th percentile of per-transaction quantity
    pub recommended_inventory: f64,
}

/// Group by (store, category): total quantity sold and mean sell price.
///
/// One row per pair observed in the dataset, ordered by store then category.
pub fn aggregate_sales(dataset: &SalesDataset) -> Vec<StoreCategorySales> {
    let mut groups: BTreeMap<(String, String), (u64, f64, usize)> = BTreeMap::new();
    for r in dataset.records() {
        let entry = groups
            .entry((r.store_name.clone(), r.product_category.clone()))
            .or_insert((0, 0.0, 0));
        entry.0 += u64::from(r.quantity);
        entry.1 += r.sell_price;
        entry.2 += 1;
    }
    groups
        .into_iter()
        .map(
            |((store_name, product_category), (total_quantity, price_sum, n))| StoreCategorySales {
                store_name,
                product_category,
                total_quantity,
                mean_sell_price: price_sum / n as f64,
            },
        )
        .collect()
}

/// The best-performing store per category, by total quantity sold.
///
/// Ties keep the first row in grouped order. Output is one aggregate row
/// per category, ordered by category.
pub fn best_store_per_category(rows: &[StoreCategorySales]) -> Vec<StoreCategorySales> {
    let mut best: BTreeMap<&str, &StoreCategorySales> = BTreeMap::new();
    for row in rows {
        match best.get(row.product_category.as_str()) {
            Some(current) if current.total_quantity >= row.total_quantity => {}
            _ => {
                best.insert(row.product_category.as_str(), row);
            }
        }
    }
    best.into_values().cloned().collect()
}

/// Recommended inventory per (store, category): the 95th percentile of
/// per-transaction quantity, not of the aggregated sum
pub fn recommended_inventory(dataset: &SalesDataset) -> Vec<RecommendedInventoryRow> {
    let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for r in dataset.records() {
        groups
            .entry((r.store_name.clone(), r.product_category.clone()))
            .or_default()
            .push(f64::from(r.quantity));
    }
    groups
        .into_iter()
        .map(|((store_name, product_category), mut quantities)| {
            quantities.sort_by(|a, b| a.partial_cmp(b).expect("quantities are finite"));
            RecommendedInventoryRow {
                store_name,
                product_category,
                recommended_inventory: percentile(&quantities, 0.95),
            }
        })
        .collect()
}

/// The `n` most-sold products, by total quantity descending (name ascending
/// on equal totals, so the ranking is deterministic)
pub fn top_products(dataset: &SalesDataset, n: usize) -> Vec<String> {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for r in dataset.records() {
        *totals.entry(r.product_name.clone()).or_insert(0) += u64::from(r.quantity);
    }
    let mut ranked: Vec<(String, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(n).map(|(name, _)| name).collect()
}

/// Render aggregate rows as a raw table for artifact persistence
pub fn sales_table(rows: &[StoreCategorySales]) -> RawTable {
    let mut table = RawTable::new(vec![
        "Store Name".to_string(),
        "Product Category".to_string(),
        "Quantity".to_string(),
        "Sell Price".to_string(),
    ]);
    for row in rows {
        table
            .push_row(vec![
                row.store_name.clone(),
                row.product_category.clone(),
                row.total_quantity.to_string(),
                row.mean_sell_price.to_string(),
            ])
            .expect("fixed-width row");
    }
    table
}

/// Render inventory rows as a raw table for artifact persistence
pub fn inventory_table(rows: &[RecommendedInventoryRow]) -> RawTable {
    let mut table = RawTable::new(vec![
        "Store Name".to_string(),
        "Product Category".to_string(),
        "Recommended Inventory".to_string(),
    ]);
    for row in rows {
        table
            .push_row(vec![
                row.store_name.clone(),
                row.product_category.clone(),
                row.recommended_inventory.to_string(),
            ])
            .expect("fixed-width row");
    }
    table
}

/// Percentile with linear interpolation between order statistics.
/// Input must be sorted ascending.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = p * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let weight_hi = idx - lo as f64;
    sorted[lo] * (1.0 - weight_hi) + sorted[hi] * weight_hi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 1.0), 4.0);
        assert!((percentile(&data, 0.5) - 2.5).abs() < 1e-12);
        assert!((percentile(&data, 0.95) - 3.85).abs() < 1e-12);
    }

    #[test]
    fn percentile_single_value() {
        assert_eq!(percentile(&[7.0], 0.95), 7.0);
    }
}
