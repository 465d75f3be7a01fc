//! Pipeline driver.
//!
//! [`SalesPipeline`] wires the stages together over an injected
//! [`DatasetStore`], replacing the dashboard's implicit process-wide file
//! paths with explicit session state. Stages themselves are pure; only the
//! driver persists artifacts. Each interaction re-runs the relevant stages
//! synchronously, with no background work and no locking of the store.
//!
//! Per-product model failures are absorbed into [`ProductOutcome::Failed`]
//! entries so one degenerate series never aborts the other products or the
//! aggregate analytics.

use log::{debug, warn};
use serde::Serialize;

use crate::analytics::{
    aggregate_sales, best_store_per_category, inventory_table, recommended_inventory, sales_table,
    top_products, RecommendedInventoryRow, StoreCategorySales,
};
use crate::dataset::{clean, CleanReport, RawTable, SalesDataset, ARTIFACT_DATE_FORMAT};
use crate::error::{Error, Result};
use crate::storage::{keys, DatasetStore};
use crate::time_series::{
    forecasting::forecast_product, prepare::weekly_series, stats::stationarity_report,
    ProductForecast, StationarityReport,
};

/// Held-out fraction of each product's series used for scoring
pub const TEST_FRACTION: f64 = 0.2;
/// Seasonal period of the weekly demand model
pub const SEASONAL_PERIOD: usize = 4;
/// How many of the most-sold products the batch operations cover
pub const TOP_PRODUCT_COUNT: usize = 30;

/// Result of a per-product stage: completed, or failed with a reason while
/// the rest of the batch carried on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProductOutcome<T> {
    Completed(T),
    Failed { product: String, reason: String },
}

impl<T> ProductOutcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, ProductOutcome::Failed { .. })
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            ProductOutcome::Completed(value) => Some(value),
            ProductOutcome::Failed { .. } => None,
        }
    }
}

/// The aggregate analytics tables for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreAnalytics {
    /// Total quantity and mean price per (store, category)
    pub sales_by_store_category: Vec<StoreCategorySales>,
    /// The best-performing store per category, one row each
    pub best_store_per_category: Vec<StoreCategorySales>,
    /// 95th-percentile demand per (store, category)
    pub recommended_inventory: Vec<RecommendedInventoryRow>,
}

/// Session driver owning the artifact store
#[derive(Debug)]
pub struct SalesPipeline<S: DatasetStore> {
    store: S,
}

impl<S: DatasetStore> SalesPipeline<S> {
    pub fn new(store: S) -> Self {
        SalesPipeline { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingest an uploaded table: clean it and persist both the raw upload
    /// and the preprocessed dataset. Structural problems (missing columns,
    /// nothing left after cleaning) fail before anything is persisted.
    pub fn ingest(&mut self, table: &RawTable) -> Result<(SalesDataset, CleanReport)> {
        let (dataset, report) = clean(table)?;
        self.store.save(keys::UPLOADED_DATASET, table)?;
        self.store.save(
            keys::PREPROCESSED_DATASET,
            &dataset.to_table(ARTIFACT_DATE_FORMAT),
        )?;
        debug!(
            "ingested {} rows ({} dropped by cleaning)",
            report.rows_out,
            report.rows_dropped()
        );
        Ok((dataset, report))
    }

    /// Reload the preprocessed dataset cached by an earlier [`ingest`].
    ///
    /// [`Error::NoDataset`] when nothing has been uploaded yet, which the
    /// presentation layer turns into an "upload first" instruction.
    ///
    /// [`ingest`]: SalesPipeline::ingest
    pub fn load_cached(&self) -> Result<SalesDataset> {
        match self.store.load(keys::PREPROCESSED_DATASET)? {
            Some(table) => clean(&table).map(|(dataset, _)| dataset),
            None => Err(Error::NoDataset),
        }
    }

    /// Aggregate analytics over the cleaned dataset, persisting the
    /// best-store and recommended-inventory tables as cache artifacts.
    /// Results are recomputed on every run; the artifacts are advisory.
    pub fn analytics(&mut self, dataset: &SalesDataset) -> Result<StoreAnalytics> {
        let sales = aggregate_sales(dataset);
        let best = best_store_per_category(&sales);
        let inventory = recommended_inventory(dataset);

        self.store
            .save(keys::BEST_STORE_FOR_CATEGORY, &sales_table(&best))?;
        self.store
            .save(keys::RECOMMENDED_INVENTORY, &inventory_table(&inventory))?;

        Ok(StoreAnalytics {
            sales_by_store_category: sales,
            best_store_per_category: best,
            recommended_inventory: inventory,
        })
    }

    /// ADF stationarity report for one product on the shared weekly grid
    pub fn stationarity(&self, dataset: &SalesDataset, product: &str) -> Result<StationarityReport> {
        let series = weekly_series(dataset, product)?;
        stationarity_report(&series)
    }

    /// Stationarity reports for the most-sold products; failures are
    /// reported per product without aborting the batch
    pub fn stationarity_all(
        &self,
        dataset: &SalesDataset,
        top_n: usize,
    ) -> Vec<ProductOutcome<StationarityReport>> {
        top_products(dataset, top_n)
            .into_iter()
            .map(|product| match self.stationarity(dataset, &product) {
                Ok(report) => ProductOutcome::Completed(report),
                Err(e) => {
                    warn!("stationarity test failed for {product}: {e}");
                    ProductOutcome::Failed {
                        product,
                        reason: e.to_string(),
                    }
                }
            })
            .collect()
    }

    /// SARIMA forecast for one product: chronological 80/20 split,
    /// automatic order selection, fit on train, score on the held-out weeks
    pub fn forecast(&self, dataset: &SalesDataset, product: &str) -> Result<ProductForecast> {
        let series = weekly_series(dataset, product)?;
        forecast_product(&series, SEASONAL_PERIOD, TEST_FRACTION)
    }

    /// Forecasts for the most-sold products. A fit failure on one product
    /// (all-zero or too-short series) becomes a `Failed` outcome; the
    /// remaining products are unaffected.
    pub fn forecast_all(
        &self,
        dataset: &SalesDataset,
        top_n: usize,
    ) -> Vec<ProductOutcome<ProductForecast>> {
        top_products(dataset, top_n)
            .into_iter()
            .map(|product| match self.forecast(dataset, &product) {
                Ok(forecast) => ProductOutcome::Completed(forecast),
                Err(e) => {
                    warn!("model fit failed for product {product}: {e}");
                    ProductOutcome::Failed {
                        product,
                        reason: e.to_string(),
                    }
                }
            })
            .collect()
    }
}
