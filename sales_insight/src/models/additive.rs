//! Additive trend + seasonality model
//!
//! `y(t) = trend(t) + yearly(t) + weekly(t) + noise`, where the trend is
//! piecewise linear with evenly spaced changepoints and the seasonal terms are
//! truncated Fourier series. Coefficients are the MAP estimate under Gaussian
//! priors, which reduces to a ridge regression on the scaled series.

use crate::config::ForecastConfig;
use crate::data::SalesSeries;
use crate::error::{InsightError, Result};
use crate::models::{ForecastModel, PredictedPoint, TrainedForecastModel};
use chrono::{Datelike, NaiveDate};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use sales_math::linalg::{dot, ridge_least_squares};
use sales_math::seasonality::FourierSeasonality;
use sales_math::stats::{mean, quantile_sorted};
use statrs::distribution::Laplace;
use tracing::debug;

/// `num_days_from_ce` of 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Yearly seasonality needs this much history, in days
const YEARLY_MIN_SPAN_DAYS: f64 = 730.0;

/// Weekly seasonality needs this much history, in days
const WEEKLY_MIN_SPAN_DAYS: f64 = 14.0;

/// Prior standard deviation of the base growth rate
const SLOPE_PRIOR_SCALE: f64 = 5.0;

/// Floor on the residual variance used to weight the priors
const MIN_NOISE_VARIANCE: f64 = 1e-6;

/// Keeps the Laplace scale of simulated trend changes positive
const MIN_CHANGE_SCALE: f64 = 1e-8;

fn days_since_epoch(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

/// Untrained additive model holding its hyperparameters
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    config: ForecastConfig,
}

impl AdditiveModel {
    /// Create a model with the given forecasting parameters
    pub fn from_config(config: &ForecastConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Forecasting parameters used when training
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    fn changepoint_indices(&self, n: usize) -> Vec<usize> {
        let history = (n as f64 * self.config.changepoint_range).floor() as usize;
        let count = self.config.n_changepoints.min(history.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }

        let last = (history - 1) as f64;
        let mut indices: Vec<usize> = (1..=count)
            .map(|i| (last * i as f64 / count as f64).round() as usize)
            .collect();
        indices.dedup();
        indices
    }

    fn seasonalities(&self, span_days: f64) -> Result<Vec<FourierSeasonality>> {
        let mut components = Vec::new();
        if span_days >= YEARLY_MIN_SPAN_DAYS && self.config.yearly_order > 0 {
            let yearly = FourierSeasonality::yearly(self.config.yearly_order);
            components.push(yearly.map_err(InsightError::fit)?);
        }
        if span_days >= WEEKLY_MIN_SPAN_DAYS && self.config.weekly_order > 0 {
            let weekly = FourierSeasonality::weekly(self.config.weekly_order);
            components.push(weekly.map_err(InsightError::fit)?);
        }
        Ok(components)
    }
}

impl Default for AdditiveModel {
    fn default() -> Self {
        Self::from_config(&ForecastConfig::default())
    }
}

/// Fitted additive model
#[derive(Debug, Clone)]
pub struct TrainedAdditiveModel {
    name: String,
    first_date: NaiveDate,
    last_date: NaiveDate,
    /// Length of the training history in days; `t = 1` at the last date
    span_days: f64,
    y_scale: f64,
    /// Changepoint locations on the scaled time axis
    changepoints: Vec<f64>,
    seasonalities: Vec<FourierSeasonality>,
    coefficients: Vec<f64>,
    /// Residual standard deviation in scaled units
    sigma: f64,
    interval_width: f64,
    uncertainty_samples: usize,
    seed: u64,
}

impl TrainedAdditiveModel {
    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.first_date).num_days() as f64 / self.span_days
    }

    fn design_row(&self, date: NaiveDate) -> Vec<f64> {
        design_row(
            self.scaled_time(date),
            days_since_epoch(date),
            &self.changepoints,
            &self.seasonalities,
        )
    }

    fn trend_changes(&self) -> &[f64] {
        &self.coefficients[2..2 + self.changepoints.len()]
    }

    /// Residual standard deviation in sales units
    pub fn sigma(&self) -> f64 {
        self.sigma * self.y_scale
    }

    /// Number of trend changepoints
    pub fn n_changepoints(&self) -> usize {
        self.changepoints.len()
    }

    /// Seasonal components included in the fit
    pub fn seasonalities(&self) -> &[FourierSeasonality] {
        &self.seasonalities
    }

    /// Point prediction without intervals
    pub fn point_predict(&self, date: NaiveDate) -> f64 {
        dot(&self.design_row(date), &self.coefficients) * self.y_scale
    }

    /// Simulated deviations from the point prediction, one row per date
    ///
    /// Samples come in antithetic pairs, so every row is symmetric about zero.
    fn simulate_deviations(&self, dates: &[NaiveDate]) -> Result<Vec<Vec<f64>>> {
        let pairs = (self.uncertainty_samples + 1) / 2;
        let mut deviations = vec![Vec::with_capacity(pairs * 2); dates.len()];

        let noise = Normal::new(0.0, self.sigma)
            .map_err(|e| InsightError::FitError(format!("invalid noise scale: {e}")))?;

        let changes = self.trend_changes();
        let horizon = dates
            .iter()
            .map(|date| (*date - self.last_date).num_days())
            .max()
            .unwrap_or(0)
            .max(0) as usize;

        let drift_model = if changes.is_empty() || horizon == 0 {
            None
        } else {
            let magnitudes: Vec<f64> = changes.iter().map(|d| d.abs()).collect();
            let mean_change = mean(&magnitudes).map_err(InsightError::fit)?;
            let laplace = Laplace::new(0.0, mean_change + MIN_CHANGE_SCALE).map_err(|e| {
                InsightError::FitError(format!("invalid trend change scale: {e}"))
            })?;
            let rate = (changes.len() as f64 / self.span_days).min(1.0);
            Some((laplace, rate))
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let step = 1.0 / self.span_days;
        let mut drift = vec![0.0; horizon + 1];

        for _ in 0..pairs {
            if let Some((laplace, rate)) = &drift_model {
                let mut slope = 0.0;
                for day in 1..=horizon {
                    drift[day] = drift[day - 1] + slope * step;
                    if rng.gen_bool(*rate) {
                        slope += laplace.sample(&mut rng);
                    }
                }
            }

            for (date, row) in dates.iter().zip(deviations.iter_mut()) {
                let ahead = (*date - self.last_date).num_days();
                let trend = if ahead > 0 { drift[ahead as usize] } else { 0.0 };
                let deviation = trend + noise.sample(&mut rng);
                row.push(deviation);
                row.push(-deviation);
            }
        }

        Ok(deviations)
    }
}

impl ForecastModel for AdditiveModel {
    type Trained = TrainedAdditiveModel;

    fn train(&self, series: &SalesSeries) -> Result<Self::Trained> {
        let n = series.len();
        let (first_date, last_date) = match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) if n >= 2 => (first, last),
            _ => {
                return Err(InsightError::FitError(format!(
                    "At least 2 observations are required, got {n}"
                )))
            }
        };
        if let Some(bad) = series.values().iter().find(|v| !v.is_finite()) {
            return Err(InsightError::FitError(format!(
                "Series contains a non-finite value ({bad})"
            )));
        }

        let max_abs = series.values().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let y_scale = if max_abs > 0.0 { max_abs } else { 1.0 };
        let span_days = (last_date - first_date).num_days() as f64;

        let t: Vec<f64> = series
            .dates()
            .iter()
            .map(|d| (*d - first_date).num_days() as f64 / span_days)
            .collect();
        let changepoints: Vec<f64> = self
            .changepoint_indices(n)
            .into_iter()
            .map(|i| t[i])
            .collect();
        let seasonalities = self.seasonalities(span_days)?;

        let design: Vec<Vec<f64>> = series
            .dates()
            .iter()
            .zip(&t)
            .map(|(date, &ti)| {
                design_row(ti, days_since_epoch(*date), &changepoints, &seasonalities)
            })
            .collect();
        let target: Vec<f64> = series.values().iter().map(|v| v / y_scale).collect();

        let prior_variances = prior_variances(
            changepoints.len(),
            seasonalities.iter().map(FourierSeasonality::width).sum(),
            &self.config,
        );

        // First pass weights the priors with unit noise, the second with the
        // residual variance of the first.
        let mut noise_var = 1.0;
        let mut coefficients = Vec::new();
        let mut mse = 0.0;
        for _ in 0..2 {
            let penalties: Vec<f64> = prior_variances
                .iter()
                .map(|var| var.map_or(0.0, |v| noise_var / v))
                .collect();
            coefficients = ridge_least_squares(&design, &target, &penalties)
                .map_err(InsightError::fit)?;
            mse = mean_squared_residual(&design, &target, &coefficients);
            noise_var = mse.max(MIN_NOISE_VARIANCE);
        }

        if !mse.is_finite() {
            return Err(InsightError::FitError(
                "Fitted model produced non-finite residuals".to_string(),
            ));
        }

        debug!(
            observations = n,
            changepoints = changepoints.len(),
            seasonal_components = seasonalities.len(),
            sigma = mse.sqrt() * y_scale,
            "fitted additive model"
        );

        Ok(TrainedAdditiveModel {
            name: self.name().to_string(),
            first_date,
            last_date,
            span_days,
            y_scale,
            changepoints,
            seasonalities,
            coefficients,
            sigma: mse.sqrt(),
            interval_width: self.config.interval_width,
            uncertainty_samples: self.config.uncertainty_samples,
            seed: self.config.seed,
        })
    }

    fn name(&self) -> &str {
        "Additive Trend + Seasonality"
    }
}

impl TrainedForecastModel for TrainedAdditiveModel {
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<PredictedPoint>> {
        let fitted: Vec<f64> = dates
            .iter()
            .map(|date| dot(&self.design_row(*date), &self.coefficients))
            .collect();

        if self.uncertainty_samples == 0 {
            return Ok(dates
                .iter()
                .zip(fitted)
                .map(|(date, yhat)| {
                    let predicted = yhat * self.y_scale;
                    PredictedPoint {
                        date: *date,
                        predicted,
                        lower_bound: predicted,
                        upper_bound: predicted,
                    }
                })
                .collect());
        }

        let lower_q = (1.0 - self.interval_width) / 2.0;
        let upper_q = (1.0 + self.interval_width) / 2.0;
        let deviations = self.simulate_deviations(dates)?;

        dates
            .iter()
            .zip(fitted)
            .zip(deviations)
            .map(|((date, yhat), mut row)| {
                row.sort_by(f64::total_cmp);
                let lower = quantile_sorted(&row, lower_q).map_err(InsightError::fit)?;
                let upper = quantile_sorted(&row, upper_q).map_err(InsightError::fit)?;
                Ok(PredictedPoint {
                    date: *date,
                    predicted: yhat * self.y_scale,
                    lower_bound: (yhat + lower) * self.y_scale,
                    upper_bound: (yhat + upper) * self.y_scale,
                })
            })
            .collect()
    }

    fn last_date(&self) -> NaiveDate {
        self.last_date
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `[1, t, (t - c_1)+, .., (t - c_m)+, fourier features..]`
fn design_row(
    t: f64,
    t_days: f64,
    changepoints: &[f64],
    seasonalities: &[FourierSeasonality],
) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + changepoints.len() + seasonalities.len() * 2);
    row.push(1.0);
    row.push(t);
    row.extend(changepoints.iter().map(|c| (t - c).max(0.0)));
    for component in seasonalities {
        row.extend(component.features(t_days));
    }
    row
}

/// Prior variance per coefficient; `None` leaves it unpenalised
fn prior_variances(
    n_changepoints: usize,
    n_seasonal: usize,
    config: &ForecastConfig,
) -> Vec<Option<f64>> {
    // Laplace(0, b) has variance 2b^2
    let change_var = 2.0 * config.changepoint_prior_scale.powi(2);
    let seasonal_var = config.seasonality_prior_scale.powi(2);

    let mut variances = vec![None, Some(SLOPE_PRIOR_SCALE.powi(2))];
    variances.extend(std::iter::repeat(Some(change_var)).take(n_changepoints));
    variances.extend(std::iter::repeat(Some(seasonal_var)).take(n_seasonal));
    variances
}

fn mean_squared_residual(design: &[Vec<f64>], target: &[f64], coefficients: &[f64]) -> f64 {
    let total: f64 = design
        .iter()
        .zip(target)
        .map(|(row, y)| (y - dot(row, coefficients)).powi(2))
        .sum();
    total / target.len() as f64
}
