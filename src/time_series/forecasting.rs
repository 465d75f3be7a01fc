//! SARIMA forecasting with automatic order selection.
//!
//! A product's weekly series is split chronologically (train before test,
//! no shuffling), a seasonal ARIMA order is selected by grid search over a
//! bounded candidate set using AICc, the model is fitted on the training
//! segment only, and the held-out horizon is forecast and scored with MAE
//! and RMSE.
//!
//! Parameter estimation follows the classical moment-based route:
//! differencing (regular then seasonal), Yule-Walker AR estimation via
//! Levinson-Durbin, moving-average terms approximated from the AR
//! residuals, and a Gaussian log-likelihood for the information criteria.
//! The grid is walked in a fixed order and a candidate replaces the
//! incumbent only on a strictly better criterion, so selection is
//! deterministic for a given series.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time_series::core::SalesSeries;

/// Non-seasonal ARIMA order (p, d, q)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarimaOrder {
    /// Autoregressive terms
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// Moving-average terms
    pub q: usize,
}

/// Seasonal order (P, D, Q) with period m
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    /// Seasonal period length (weeks per cycle)
    pub period: usize,
}

/// Forecast accuracy against held-out actuals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
}

/// MAE and RMSE between actual and predicted values
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<ForecastAccuracy> {
    if actual.len() != predicted.len() {
        return Err(Error::InvalidInput(format!(
            "evaluation lengths differ: {} actual vs {} predicted",
            actual.len(),
            predicted.len()
        )));
    }
    if actual.is_empty() {
        return Err(Error::EmptyData("nothing to evaluate".to_string()));
    }
    let n = actual.len() as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    for (a, p) in actual.iter().zip(predicted) {
        let err = a - p;
        abs_sum += err.abs();
        sq_sum += err * err;
    }
    Ok(ForecastAccuracy {
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
    })
}

/// One differencing step and the series that existed before it was applied,
/// kept so forecasts can be integrated back to the original scale
#[derive(Debug, Clone)]
struct DiffStep {
    seasonal: bool,
    history: Vec<f64>,
}

/// Seasonal ARIMA model
#[derive(Debug, Clone)]
pub struct SarimaForecaster {
    order: SarimaOrder,
    seasonal: SeasonalOrder,
    ar_params: Option<Vec<f64>>,
    ma_params: Option<Vec<f64>>,
    seasonal_ar_params: Option<Vec<f64>>,
    seasonal_ma_params: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    differenced: Option<Vec<f64>>,
    diff_steps: Option<Vec<DiffStep>>,
    log_likelihood: Option<f64>,
    n_params: usize,
}

impl SarimaForecaster {
    pub fn new(order: SarimaOrder, seasonal: SeasonalOrder) -> Self {
        let n_params = order.p + order.q + seasonal.p + seasonal.q + 1; // +1 for variance
        SarimaForecaster {
            order,
            seasonal,
            ar_params: None,
            ma_params: None,
            seasonal_ar_params: None,
            seasonal_ma_params: None,
            residuals: None,
            differenced: None,
            diff_steps: None,
            log_likelihood: None,
            n_params,
        }
    }

    /// A non-seasonal ARIMA model
    pub fn arima(p: usize, d: usize, q: usize) -> Self {
        Self::new(
            SarimaOrder { p, d, q },
            SeasonalOrder {
                p: 0,
                d: 0,
                q: 0,
                period: 1,
            },
        )
    }

    pub fn order(&self) -> SarimaOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> SeasonalOrder {
        self.seasonal
    }

    /// Fit the model to a training series
    pub fn fit(&mut self, values: &[f64]) -> Result<()> {
        let min_len = self.order.p
            + self.order.d
            + self.order.q
            + self.seasonal.period * (self.seasonal.p + self.seasonal.d + self.seasonal.q)
            + 1;
        if values.len() < min_len {
            return Err(Error::InsufficientData(format!(
                "series too short for SARIMA({},{},{})({},{},{})[{}]: need {} observations, got {}",
                self.order.p,
                self.order.d,
                self.order.q,
                self.seasonal.p,
                self.seasonal.d,
                self.seasonal.q,
                self.seasonal.period,
                min_len,
                values.len()
            )));
        }

        // Regular differencing first, then seasonal, recording each step
        let mut working = values.to_vec();
        let mut steps = Vec::with_capacity(self.order.d + self.seasonal.d);
        for _ in 0..self.order.d {
            if working.len() <= 1 {
                break;
            }
            steps.push(DiffStep {
                seasonal: false,
                history: working.clone(),
            });
            working = working.windows(2).map(|w| w[1] - w[0]).collect();
        }
        if self.seasonal.period > 1 {
            for _ in 0..self.seasonal.d {
                if working.len() <= self.seasonal.period {
                    break;
                }
                steps.push(DiffStep {
                    seasonal: true,
                    history: working.clone(),
                });
                working = working
                    .iter()
                    .skip(self.seasonal.period)
                    .zip(working.iter())
                    .map(|(curr, prev)| curr - prev)
                    .collect();
            }
        }

        let ar_params = estimate_ar_params(&working, self.order.p);

        // Residuals of the AR part alone, used to seed the MA estimates
        let mut ar_residuals = Vec::with_capacity(working.len());
        for i in 0..working.len() {
            let mut prediction = 0.0;
            for (j, &param) in ar_params.iter().enumerate() {
                if i > j {
                    prediction += param * working[i - j - 1];
                }
            }
            ar_residuals.push(working[i] - prediction);
        }

        let ma_params = estimate_ma_params(&ar_residuals, self.order.q);
        let seasonal_ar_params = if self.seasonal.p > 0 {
            estimate_ar_params(&working, self.seasonal.p)
        } else {
            vec![]
        };
        let seasonal_ma_params = if self.seasonal.q > 0 {
            estimate_ma_params(&ar_residuals, self.seasonal.q)
        } else {
            vec![]
        };

        // One-step-ahead fit over the differenced series
        let mut residuals: Vec<f64> = Vec::with_capacity(working.len());
        for i in 0..working.len() {
            let mut prediction = 0.0;
            for (j, &param) in ar_params.iter().enumerate() {
                if i > j {
                    prediction += param * working[i - j - 1];
                }
            }
            for (j, &param) in ma_params.iter().enumerate() {
                if i > j && j < residuals.len() {
                    prediction += param * residuals[residuals.len() - j - 1];
                }
            }
            for (j, &param) in seasonal_ar_params.iter().enumerate() {
                let lag = (j + 1) * self.seasonal.period;
                if i >= lag {
                    prediction += param * working[i - lag];
                }
            }
            for (j, &param) in seasonal_ma_params.iter().enumerate() {
                let lag = (j + 1) * self.seasonal.period;
                if lag <= residuals.len() {
                    prediction += param * residuals[residuals.len() - lag];
                }
            }
            residuals.push(working[i] - prediction);
        }

        let variance = residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64;
        self.log_likelihood = Some(gaussian_log_likelihood(&residuals, variance));
        self.ar_params = Some(ar_params);
        self.ma_params = Some(ma_params);
        self.seasonal_ar_params = Some(seasonal_ar_params);
        self.seasonal_ma_params = Some(seasonal_ma_params);
        self.residuals = Some(residuals);
        self.differenced = Some(working);
        self.diff_steps = Some(steps);
        Ok(())
    }

    /// Forecast `periods` steps ahead on the original scale
    pub fn forecast(&self, periods: usize) -> Result<Vec<f64>> {
        let not_fitted = || Error::InvalidOperation("model not fitted".to_string());
        let ar_params = self.ar_params.as_ref().ok_or_else(not_fitted)?;
        let ma_params = self.ma_params.as_ref().ok_or_else(not_fitted)?;
        let seasonal_ar = self.seasonal_ar_params.as_ref().ok_or_else(not_fitted)?;
        let seasonal_ma = self.seasonal_ma_params.as_ref().ok_or_else(not_fitted)?;
        let differenced = self.differenced.as_ref().ok_or_else(not_fitted)?;
        let residuals = self.residuals.as_ref().ok_or_else(not_fitted)?;
        let steps = self.diff_steps.as_ref().ok_or_else(not_fitted)?;

        let mut extended = differenced.clone();
        let mut extended_residuals = residuals.clone();
        let mut forecasts = Vec::with_capacity(periods);

        for _ in 0..periods {
            let n = extended.len();
            let mut forecast = 0.0;
            for (j, &param) in ar_params.iter().enumerate() {
                if n > j {
                    forecast += param * extended[n - j - 1];
                }
            }
            // Future residuals have expectation zero; only observed ones
            // contribute to the MA terms
            for (j, &param) in ma_params.iter().enumerate() {
                if j < extended_residuals.len() {
                    let idx = extended_residuals.len() - j - 1;
                    if idx < residuals.len() {
                        forecast += param * extended_residuals[idx];
                    }
                }
            }
            for (j, &param) in seasonal_ar.iter().enumerate() {
                let lag = (j + 1) * self.seasonal.period;
                if n >= lag {
                    forecast += param * extended[n - lag];
                }
            }
            for (j, &param) in seasonal_ma.iter().enumerate() {
                let lag = (j + 1) * self.seasonal.period;
                if lag <= extended_residuals.len() {
                    let idx = extended_residuals.len() - lag;
                    if idx < residuals.len() {
                        forecast += param * extended_residuals[idx];
                    }
                }
            }
            forecasts.push(forecast);
            extended.push(forecast);
            extended_residuals.push(0.0);
        }

        Ok(integrate(&forecasts, steps, self.seasonal.period))
    }

    /// Akaike information criterion
    pub fn aic(&self) -> Option<f64> {
        self.log_likelihood
            .map(|ll| -2.0 * ll + 2.0 * self.n_params as f64)
    }

    /// Corrected AIC for small samples
    pub fn aicc(&self, n_obs: usize) -> Option<f64> {
        self.aic().map(|aic| {
            let k = self.n_params as f64;
            let n = n_obs as f64;
            if n - k - 1.0 > 0.0 {
                aic + (2.0 * k * (k + 1.0)) / (n - k - 1.0)
            } else {
                f64::INFINITY
            }
        })
    }

    /// Bayesian information criterion
    pub fn bic(&self, n_obs: usize) -> Option<f64> {
        self.log_likelihood
            .map(|ll| -2.0 * ll + self.n_params as f64 * (n_obs as f64).ln())
    }
}

/// Undo the recorded differencing steps, anchoring each level on the
/// observed history
fn integrate(forecasts: &[f64], steps: &[DiffStep], period: usize) -> Vec<f64> {
    let mut current = forecasts.to_vec();
    for step in steps.iter().rev() {
        let lag = if step.seasonal { period } else { 1 };
        let mut extended = step.history.clone();
        for &value in &current {
            let anchor = extended[extended.len() - lag];
            extended.push(value + anchor);
        }
        current = extended.split_off(step.history.len());
    }
    current
}

/// Yule-Walker AR estimation via the Levinson-Durbin recursion
fn estimate_ar_params(values: &[f64], order: usize) -> Vec<f64> {
    if order == 0 || values.len() < order + 1 {
        return vec![];
    }

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let var = centered.iter().map(|v| v * v).sum::<f64>() / n as f64;
    if var.abs() < 1e-10 {
        return vec![0.0; order];
    }

    let mut autocorr = Vec::with_capacity(order + 1);
    for lag in 0..=order {
        let cov: f64 = centered
            .iter()
            .take(n - lag)
            .zip(centered.iter().skip(lag))
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        autocorr.push(cov / var);
    }

    let mut phi = vec![vec![0.0; order]; order];
    let mut partial = vec![0.0; order];
    phi[0][0] = autocorr[1];
    partial[0] = autocorr[1];

    for k in 1..order {
        let mut num = autocorr[k + 1];
        let mut den = 1.0;
        for j in 0..k {
            num -= phi[k - 1][j] * autocorr[k - j];
            den -= phi[k - 1][j] * autocorr[j + 1];
        }
        partial[k] = if den.abs() < 1e-10 { 0.0 } else { num / den };
        phi[k][k] = partial[k];
        for j in 0..k {
            phi[k][j] = phi[k - 1][j] - partial[k] * phi[k - 1][k - 1 - j];
        }
    }

    phi[order - 1].clone()
}

/// Moving-average terms approximated from the autocorrelation of the AR
/// residuals, clamped to the invertible range
fn estimate_ma_params(ar_residuals: &[f64], order: usize) -> Vec<f64> {
    if order == 0 || ar_residuals.len() < order + 1 {
        return vec![];
    }

    let n = ar_residuals.len();
    let mean = ar_residuals.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = ar_residuals.iter().map(|v| v - mean).collect();
    let var = centered.iter().map(|v| v * v).sum::<f64>() / n as f64;
    if var.abs() < 1e-10 {
        return vec![0.0; order];
    }

    (1..=order)
        .map(|lag| {
            let cov: f64 = centered
                .iter()
                .take(n - lag)
                .zip(centered.iter().skip(lag))
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64;
            (cov / var).clamp(-0.99, 0.99)
        })
        .collect()
}

fn gaussian_log_likelihood(residuals: &[f64], variance: f64) -> f64 {
    let n = residuals.len() as f64;
    if variance <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let sum_sq: f64 = residuals.iter().map(|r| r * r).sum();
    -0.5 * n * (2.0 * std::f64::consts::PI).ln() - 0.5 * n * variance.ln()
        - sum_sq / (2.0 * variance)
}

/// Information criterion used to rank candidate orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionCriterion {
    Aic,
    /// Corrected AIC, preferred on the short samples weekly retail data gives
    #[default]
    Aicc,
    Bic,
}

/// Automatic SARIMA order selection by exhaustive grid search.
///
/// Candidate (p, q) and seasonal (P, Q) ranges are bounded; differencing
/// orders are fixed up front by variance-reduction heuristics. Candidates
/// whose criterion is not finite (degenerate fits included) are skipped,
/// so a constant or all-zero series yields a "no suitable model" error
/// rather than a bogus fit.
#[derive(Debug, Clone)]
pub struct AutoSarima {
    max_p: usize,
    max_q: usize,
    max_seasonal_p: usize,
    max_seasonal_q: usize,
    max_d: usize,
    max_seasonal_d: usize,
    seasonal_period: usize,
    criterion: SelectionCriterion,
}

impl AutoSarima {
    /// Selector with the default bounded grid (p,q <= 2; P,Q <= 1)
    pub fn new(seasonal_period: usize) -> Self {
        AutoSarima {
            max_p: 2,
            max_q: 2,
            max_seasonal_p: 1,
            max_seasonal_q: 1,
            max_d: 2,
            max_seasonal_d: 1,
            seasonal_period,
            criterion: SelectionCriterion::default(),
        }
    }

    pub fn max_p(mut self, p: usize) -> Self {
        self.max_p = p;
        self
    }

    pub fn max_q(mut self, q: usize) -> Self {
        self.max_q = q;
        self
    }

    pub fn max_seasonal_p(mut self, p: usize) -> Self {
        self.max_seasonal_p = p;
        self
    }

    pub fn max_seasonal_q(mut self, q: usize) -> Self {
        self.max_seasonal_q = q;
        self
    }

    pub fn criterion(mut self, criterion: SelectionCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Search the grid and return the best model fitted to `values`
    pub fn select(&self, values: &[f64]) -> Result<SarimaForecaster> {
        let n_obs = values.len();
        let d = self.estimate_differencing_order(values);
        let seasonal_d = self.estimate_seasonal_differencing_order(values);

        let mut best: Option<(f64, SarimaForecaster)> = None;
        for p in 0..=self.max_p {
            for q in 0..=self.max_q {
                for seasonal_p in 0..=self.max_seasonal_p {
                    for seasonal_q in 0..=self.max_seasonal_q {
                        let mut model = SarimaForecaster::new(
                            SarimaOrder { p, d, q },
                            SeasonalOrder {
                                p: seasonal_p,
                                d: seasonal_d,
                                q: seasonal_q,
                                period: self.seasonal_period,
                            },
                        );
                        if model.fit(values).is_err() {
                            continue;
                        }
                        let score = match self.criterion {
                            SelectionCriterion::Aic => model.aic(),
                            SelectionCriterion::Aicc => model.aicc(n_obs),
                            SelectionCriterion::Bic => model.bic(n_obs),
                        }
                        .unwrap_or(f64::INFINITY);
                        if !score.is_finite() {
                            continue;
                        }
                        match &best {
                            Some((incumbent, _)) if *incumbent <= score => {}
                            _ => best = Some((score, model)),
                        }
                    }
                }
            }
        }

        match best {
            Some((score, model)) => {
                debug!(
                    "selected SARIMA({},{},{})({},{},{})[{}] with criterion {:.3}",
                    model.order.p,
                    model.order.d,
                    model.order.q,
                    model.seasonal.p,
                    model.seasonal.d,
                    model.seasonal.q,
                    model.seasonal.period,
                    score
                );
                Ok(model)
            }
            None => Err(Error::InvalidOperation(
                "no suitable model found for series".to_string(),
            )),
        }
    }

    /// Differencing order by variance reduction: difference while it shrinks
    /// the variance by at least 10%
    fn estimate_differencing_order(&self, values: &[f64]) -> usize {
        let var0 = variance(values);
        if var0 < 1e-10 || self.max_d == 0 {
            return 0;
        }
        let diff1: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let var1 = variance(&diff1);
        if var1 >= var0 * 0.9 {
            return 0;
        }
        if self.max_d >= 2 {
            let diff2: Vec<f64> = diff1.windows(2).map(|w| w[1] - w[0]).collect();
            if variance(&diff2) < var1 * 0.9 {
                return 2;
            }
        }
        1
    }

    /// Seasonal differencing order, same variance heuristic at the seasonal lag
    fn estimate_seasonal_differencing_order(&self, values: &[f64]) -> usize {
        if self.seasonal_period <= 1
            || self.max_seasonal_d == 0
            || values.len() <= self.seasonal_period * 2
        {
            return 0;
        }
        let var0 = variance(values);
        if var0 < 1e-10 {
            return 0;
        }
        let seasonal_diff: Vec<f64> = values
            .iter()
            .skip(self.seasonal_period)
            .zip(values.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
        if variance(&seasonal_diff) < var0 * 0.8 {
            1
        } else {
            0
        }
    }
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Forecast result for one product over its held-out horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductForecast {
    pub product: String,
    pub order: SarimaOrder,
    pub seasonal_order: SeasonalOrder,
    /// Predicted quantity per held-out week, in time order
    pub predictions: Vec<(NaiveDate, f64)>,
    pub accuracy: ForecastAccuracy,
}

/// Split, select, fit and score a forecast for one product's series.
///
/// Any failure (short series, degenerate train segment, no converging
/// candidate) is reported as a per-product [`Error::ModelFit`] so the rest
/// of the pipeline can carry on with other products.
pub fn forecast_product(
    series: &SalesSeries,
    seasonal_period: usize,
    test_fraction: f64,
) -> Result<ProductForecast> {
    let fit_error = |e: Error| Error::ModelFit {
        product: series.product().to_string(),
        reason: e.to_string(),
    };

    let (train, test) = series.split(test_fraction).map_err(fit_error)?;
    let model = AutoSarima::new(seasonal_period)
        .select(train.values())
        .map_err(fit_error)?;
    let predicted = model.forecast(test.len()).map_err(fit_error)?;
    let accuracy = evaluate(test.values(), &predicted).map_err(fit_error)?;

    Ok(ProductForecast {
        product: series.product().to_string(),
        order: model.order(),
        seasonal_order: model.seasonal_order(),
        predictions: test.index().iter().zip(predicted).collect(),
        accuracy,
    })
}
