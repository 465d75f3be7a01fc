//! Stationarity testing.
//!
//! Implements the Augmented Dickey-Fuller test for a unit root, the form
//! used on each product's weekly series before forecasting: regression with
//! a constant, lag order chosen by AIC up to Schwert's rule, and p-values
//! interpolated from the asymptotic Dickey-Fuller tau distribution for the
//! constant case. Each call is stateless; products are tested independently.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time_series::core::SalesSeries;

/// Significance threshold for the non-stationarity classification
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Asymptotic critical values of the Dickey-Fuller tau distribution,
/// constant case (Fuller 1976; MacKinnon 2010)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfCriticalValues {
    #[serde(rename = "1%")]
    pub one_percent: f64,
    #[serde(rename = "5%")]
    pub five_percent: f64,
    #[serde(rename = "10%")]
    pub ten_percent: f64,
}

impl Default for AdfCriticalValues {
    fn default() -> Self {
        AdfCriticalValues {
            one_percent: -3.43,
            five_percent: -2.86,
            ten_percent: -2.57,
        }
    }
}

/// Result of an Augmented Dickey-Fuller test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// The tau test statistic
    pub statistic: f64,
    /// Probability of the statistic under the unit-root null hypothesis
    pub p_value: f64,
    /// Number of lagged difference terms included in the regression
    pub used_lag: usize,
    /// Observations used in the final regression
    pub n_obs: usize,
    pub critical_values: AdfCriticalValues,
}

impl AdfResult {
    /// Fail to reject the unit-root null at the 5% level
    pub fn is_non_stationary(&self) -> bool {
        self.p_value > SIGNIFICANCE_LEVEL
    }
}

/// Per-product stationarity report for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityReport {
    pub product: String,
    /// Total historical sales of the product, for context
    pub total_sales: f64,
    pub adf: AdfResult,
    pub non_stationary: bool,
}

/// Run the ADF test on a product's weekly series
pub fn stationarity_report(series: &SalesSeries) -> Result<StationarityReport> {
    let adf = adf_test(series.values())?;
    Ok(StationarityReport {
        product: series.product().to_string(),
        total_sales: series.total(),
        non_stationary: adf.is_non_stationary(),
        adf,
    })
}

/// Augmented Dickey-Fuller test with constant.
///
/// The regression is `dy[t] = a + b*y[t-1] + sum(c_i * dy[t-i]) + e`; the
/// statistic is the t-ratio of `b`. Lag order is selected by AIC over a
/// common sample up to Schwert's maximum, then the chosen lag is refitted
/// on the full usable sample.
///
/// A constant (including all-zero) series carries no evidence against the
/// null, so it reports statistic 0 and p-value 1 instead of failing.
pub fn adf_test(values: &[f64]) -> Result<AdfResult> {
    let n = values.len();
    if n < 4 {
        return Err(Error::InsufficientData(format!(
            "ADF test needs at least 4 observations, got {n}"
        )));
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if (max - min).abs() < 1e-12 {
        return Ok(AdfResult {
            statistic: 0.0,
            p_value: 1.0,
            used_lag: 0,
            n_obs: n,
            critical_values: AdfCriticalValues::default(),
        });
    }

    let dy: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    // Schwert's rule, capped so the common regression keeps some freedom
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize;
    let max_feasible = (dy.len().saturating_sub(6)) / 2;
    let max_lag = schwert.min(max_feasible);

    // Lag selection on the sample common to all candidate lags
    let mut best_lag = 0;
    let mut best_aic = f64::INFINITY;
    for lag in 0..=max_lag {
        if let Ok(fit) = adf_regression(values, &dy, lag, max_lag) {
            let n_eff = fit.n as f64;
            let aic = n_eff * (fit.ssr / n_eff).max(f64::MIN_POSITIVE).ln() + 2.0 * fit.k as f64;
            if aic < best_aic {
                best_aic = aic;
                best_lag = lag;
            }
        }
    }

    // Final fit on the full sample available for the selected lag
    let fit = adf_regression(values, &dy, best_lag, best_lag)?;
    let statistic = fit.coefficients[1] / fit.std_errors[1];

    Ok(AdfResult {
        statistic,
        p_value: tau_mu_p_value(statistic),
        used_lag: best_lag,
        n_obs: fit.n,
        critical_values: AdfCriticalValues::default(),
    })
}

struct RegressionFit {
    coefficients: Vec<f64>,
    std_errors: Vec<f64>,
    ssr: f64,
    n: usize,
    k: usize,
}

/// Fit the ADF regression with `lag` difference terms, starting the sample
/// at `start_lag` so different lags can share a common sample
fn adf_regression(
    values: &[f64],
    dy: &[f64],
    lag: usize,
    start_lag: usize,
) -> Result<RegressionFit> {
    let k = lag + 2;
    let rows: Vec<usize> = (start_lag..dy.len()).collect();
    if rows.len() <= k {
        return Err(Error::InsufficientData(format!(
            "ADF regression with lag {lag} needs more than {k} observations"
        )));
    }

    let y: Vec<f64> = rows.iter().map(|&t| dy[t]).collect();
    let mut design: Vec<Vec<f64>> = Vec::with_capacity(k);
    design.push(vec![1.0; rows.len()]);
    design.push(rows.iter().map(|&t| values[t]).collect());
    for i in 1..=lag {
        design.push(rows.iter().map(|&t| dy[t - i]).collect());
    }

    ols(&y, &design)
}

/// Ordinary least squares via normal equations.
/// `x` holds the design matrix column by column.
fn ols(y: &[f64], x: &[Vec<f64>]) -> Result<RegressionFit> {
    let n = y.len();
    let k = x.len();

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in i..k {
            let dot: f64 = x[i].iter().zip(&x[j]).map(|(a, b)| a * b).sum();
            xtx[i][j] = dot;
            xtx[j][i] = dot;
        }
        xty[i] = x[i].iter().zip(y).map(|(a, b)| a * b).sum();
    }

    let inv = invert(&xtx)?;
    let coefficients: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inv[i][j] * xty[j]).sum())
        .collect();

    let mut ssr = 0.0;
    for t in 0..n {
        let fitted: f64 = (0..k).map(|i| coefficients[i] * x[i][t]).sum();
        let residual = y[t] - fitted;
        ssr += residual * residual;
    }

    let sigma2 = ssr / (n - k) as f64;
    let std_errors: Vec<f64> = (0..k).map(|i| (sigma2 * inv[i][i]).sqrt()).collect();

    Ok(RegressionFit {
        coefficients,
        std_errors,
        ssr,
        n,
        k,
    })
}

/// Invert a small symmetric matrix by Gauss-Jordan elimination with
/// partial pivoting
fn invert(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let k = matrix.len();
    let mut work: Vec<Vec<f64>> = matrix.to_vec();
    let mut inv = vec![vec![0.0; k]; k];
    for (i, row) in inv.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for col in 0..k {
        let pivot_row = (col..k)
            .max_by(|&a, &b| {
                work[a][col]
                    .abs()
                    .partial_cmp(&work[b][col].abs())
                    .expect("finite pivots")
            })
            .expect("non-empty range");
        if work[pivot_row][col].abs() < 1e-12 {
            return Err(Error::ComputationError(
                "singular design matrix in ADF regression".to_string(),
            ));
        }
        work.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = work[col][col];
        for j in 0..k {
            work[col][j] /= pivot;
            inv[col][j] /= pivot;
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = work[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                work[row][j] -= factor * work[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Ok(inv)
}

/// Asymptotic quantiles of the Dickey-Fuller tau distribution for the
/// constant case (Fuller 1976), as (quantile, probability) pairs
const TAU_MU_QUANTILES: [(f64, f64); 9] = [
    (-3.43, 0.01),
    (-3.12, 0.025),
    (-2.86, 0.05),
    (-2.57, 0.10),
    (-1.57, 0.50),
    (-0.44, 0.90),
    (-0.07, 0.95),
    (0.23, 0.975),
    (0.60, 0.99),
];

/// p-value by linear interpolation within the tabulated range, clamped to
/// the end probabilities outside it
fn tau_mu_p_value(statistic: f64) -> f64 {
    let (first_q, first_p) = TAU_MU_QUANTILES[0];
    if statistic <= first_q {
        return first_p;
    }
    let (last_q, last_p) = TAU_MU_QUANTILES[TAU_MU_QUANTILES.len() - 1];
    if statistic >= last_q {
        return last_p;
    }
    for window in TAU_MU_QUANTILES.windows(2) {
        let (q0, p0) = window[0];
        let (q1, p1) = window[1];
        if statistic <= q1 {
            let weight = (statistic - q0) / (q1 - q0);
            return p0 + weight * (p1 - p0);
        }
    }
    last_p
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random values in [0, 10)
    fn noise_series(len: usize) -> Vec<f64> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) % 1000) as f64 / 100.0
            })
            .collect()
    }

    #[test]
    fn p_value_interpolation_is_monotone() {
        assert_eq!(tau_mu_p_value(-10.0), 0.01);
        assert_eq!(tau_mu_p_value(5.0), 0.99);
        let mut previous = 0.0;
        for i in 0..100 {
            let stat = -5.0 + i as f64 * 0.1;
            let p = tau_mu_p_value(stat);
            assert!(p >= previous, "p-value must not decrease: {stat}");
            previous = p;
        }
        assert!((tau_mu_p_value(-2.86) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn white_noise_is_stationary() {
        let result = adf_test(&noise_series(80)).unwrap();
        assert!(result.statistic < -3.43, "got {}", result.statistic);
        assert!(result.p_value < SIGNIFICANCE_LEVEL);
        assert!(!result.is_non_stationary());
    }

    #[test]
    fn trending_series_is_non_stationary() {
        let noise = noise_series(80);
        let values: Vec<f64> = noise
            .iter()
            .enumerate()
            .map(|(i, v)| i as f64 * 2.0 + v)
            .collect();
        let result = adf_test(&values).unwrap();
        assert!(result.p_value > SIGNIFICANCE_LEVEL, "got {}", result.p_value);
        assert!(result.is_non_stationary());
    }

    #[test]
    fn constant_series_reports_without_error() {
        let result = adf_test(&vec![0.0; 30]).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);

        let result = adf_test(&vec![5.0; 30]).unwrap();
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn too_short_series_is_rejected() {
        assert!(adf_test(&[1.0, 2.0, 3.0]).is_err());
    }
}
