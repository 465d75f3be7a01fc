//! Time series preparation, testing and forecasting.
//!
//! Per-product demand is modelled on a dense weekly grid shared by every
//! product in the dataset. The module provides:
//!
//! - a Monday-start weekly index and series type ([`core`])
//! - resampling of cleaned sales onto that grid ([`prepare`])
//! - the Augmented Dickey-Fuller stationarity test ([`stats`])
//! - SARIMA forecasting with automatic order selection ([`forecasting`])

pub mod core;
pub mod forecasting;
pub mod prepare;
pub mod stats;

pub use self::core::{week_start, SalesSeries, WeeklyIndex};
pub use forecasting::{
    AutoSarima, ForecastAccuracy, ProductForecast, SarimaForecaster, SarimaOrder, SeasonalOrder,
};
pub use prepare::weekly_series;
pub use stats::{adf_test, stationarity_report, AdfCriticalValues, AdfResult, StationarityReport};
