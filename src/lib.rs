//! Clothalytics: retail sales analytics and demand forecasting.
//!
//! The crate implements a linear analysis pipeline over a retail sales
//! dataset: CSV ingestion, cleaning, store/category aggregation, weekly
//! resampling per product, stationarity testing, and SARIMA forecasting
//! with automatic order selection.
//!
//! Presentation layers (dashboards, charts) live outside this crate; every
//! stage returns plain serializable tables and reports for them to render.

pub mod analytics;
pub mod dataset;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod storage;
pub mod time_series;

// Re-export commonly used types
pub use dataset::{CleanReport, RawTable, SalesDataset, SalesRecord};
pub use error::{Error, Result};
pub use pipeline::{ProductOutcome, SalesPipeline, StoreAnalytics};
pub use storage::{DatasetStore, DiskStore, MemoryStore};
pub use time_series::{
    AdfResult, AutoSarima, ForecastAccuracy, ProductForecast, SalesSeries, SarimaForecaster,
    SarimaOrder, SeasonalOrder, StationarityReport, WeeklyIndex,
};

// Export version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
