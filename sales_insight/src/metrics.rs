//! Metrics for evaluating forecast performance

use crate::models::{ActualPoint, PredictedPoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backtest accuracy over the dates present in both lists
///
/// Each history date is scored once. Returns `None` when no date overlaps.
pub fn backtest_accuracy(
    actual: &[ActualPoint],
    predicted: &[PredictedPoint],
) -> Option<ForecastAccuracy> {
    let by_date: BTreeMap<NaiveDate, f64> =
        predicted.iter().map(|p| (p.date, p.predicted)).collect();

    ForecastAccuracy::from_pairs(
        actual
            .iter()
            .filter_map(|a| by_date.get(&a.date).map(|&p| (a.actual, p))),
    )
}

#[derive(Debug, Default)]
struct ErrorSums {
    absolute: f64,
    squared: f64,
    percentage: f64,
    symmetric: f64,
    points: usize,
}

impl ErrorSums {
    fn add(&mut self, actual: f64, predicted: f64) {
        let error = actual - predicted;
        self.absolute += error.abs();
        self.squared += error * error;
        // zero actuals still count as a point
        if actual != 0.0 {
            self.percentage += 100.0 * error.abs() / actual.abs();
        }
        let scale = actual.abs() + predicted.abs();
        if scale != 0.0 {
            self.symmetric += 200.0 * error.abs() / scale;
        }
        self.points += 1;
    }
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// Number of compared points
    pub points: usize,
}

impl ForecastAccuracy {
    /// Score `(actual, predicted)` pairs; `None` for an empty sequence
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let sums = pairs
            .into_iter()
            .fold(ErrorSums::default(), |mut sums, (actual, predicted)| {
                sums.add(actual, predicted);
                sums
            });
        if sums.points == 0 {
            return None;
        }

        let n = sums.points as f64;
        let mse = sums.squared / n;
        Some(Self {
            mae: sums.absolute / n,
            mse,
            rmse: mse.sqrt(),
            mape: sums.percentage / n,
            smape: sums.symmetric / n,
            points: sums.points,
        })
    }
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics ({} points):", self.points)?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        Ok(())
    }
}
