//! Per-request forecasting for one (store, product) pair

use crate::config::ForecastConfig;
use crate::data::SalesDataset;
use crate::encoding::{CategoryEncoder, CategoryField, Code};
use crate::error::{InsightError, Result};
use crate::metrics::{backtest_accuracy, ForecastAccuracy};
use crate::models::{
    ActualPoint, AdditiveModel, ForecastModel, PredictedPoint, TrainedForecastModel,
};
use crate::utils::{future_dates, DateWindow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Actual and predicted sales inside the requested window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub actual: Vec<ActualPoint>,
    pub predicted: Vec<PredictedPoint>,
    /// Accuracy over dates present in both lists
    pub accuracy: Option<ForecastAccuracy>,
}

/// Fits a fresh model per request; nothing is cached between calls
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    model: AdditiveModel,
    horizon_days: usize,
}

impl ForecastEngine {
    pub fn new(config: &ForecastConfig) -> Self {
        Self {
            model: AdditiveModel::from_config(config),
            horizon_days: config.horizon_days,
        }
    }

    /// Days predicted past the last observation
    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    /// Forecast one pair and report both series inside `window`
    ///
    /// The model is trained on the pair's full history regardless of the
    /// window. Actuals and predictions are filtered independently, so either
    /// list may be empty.
    pub fn forecast(
        &self,
        dataset: &SalesDataset,
        encoder: &CategoryEncoder,
        store_id: Code,
        product_name: Code,
        window: DateWindow,
    ) -> Result<ForecastResult> {
        encoder.require_code(CategoryField::StoreId, store_id)?;
        encoder.require_code(CategoryField::ProductName, product_name)?;

        let series = dataset.series(store_id, product_name);
        let last_date = match series.last_date() {
            Some(date) => date,
            None => {
                return Err(InsightError::NoData {
                    store_id,
                    product_name,
                })
            }
        };

        info!(
            store_id,
            product_name,
            observations = series.len(),
            start = %window.start,
            end = %window.end,
            "forecasting"
        );

        let trained = self.model.train(&series)?;

        let mut dates = series.dates().to_vec();
        dates.extend(future_dates(last_date, self.horizon_days));
        let predictions = trained.predict(&dates)?;

        let actual: Vec<ActualPoint> = series
            .points()
            .filter(|(date, _)| window.contains(*date))
            .map(|(date, actual)| ActualPoint { date, actual })
            .collect();
        let predicted: Vec<PredictedPoint> = predictions
            .into_iter()
            .filter(|p| window.contains(p.date))
            .collect();
        let accuracy = backtest_accuracy(&actual, &predicted);

        debug!(
            actual = actual.len(),
            predicted = predicted.len(),
            model = trained.name(),
            "forecast window filtered"
        );

        Ok(ForecastResult {
            actual,
            predicted,
            accuracy,
        })
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(&ForecastConfig::default())
    }
}
