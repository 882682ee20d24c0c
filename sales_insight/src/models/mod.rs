//! Forecasting models for daily sales series

use crate::data::SalesSeries;
use crate::error::Result;
use crate::utils::future_dates;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Observed smoothed sales on one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActualPoint {
    pub date: NaiveDate,
    pub actual: f64,
}

/// Model output on one date with its uncertainty interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictedPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug + Send + Sync {
    /// Predict values, with intervals, for arbitrary dates
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<PredictedPoint>>;

    /// Last date of the training series
    fn last_date(&self) -> NaiveDate;

    /// Name of the model
    fn name(&self) -> &str;

    /// Predict `horizon` consecutive days past the training series
    fn forecast(&self, horizon: usize) -> Result<Vec<PredictedPoint>> {
        self.predict(&future_dates(self.last_date(), horizon))
    }
}

/// Forecast model that can be trained on a sales series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a daily series
    fn train(&self, series: &SalesSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod additive;

pub use additive::{AdditiveModel, TrainedAdditiveModel};
