//! Fourier series features for periodic components

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Length of a year in days
pub const YEARLY_PERIOD: f64 = 365.25;

/// Length of a week in days
pub const WEEKLY_PERIOD: f64 = 7.0;

/// A periodic component approximated by a truncated Fourier series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourierSeasonality {
    period: f64,
    order: usize,
}

impl FourierSeasonality {
    /// Create a new seasonality with the given period (in days) and number of harmonics
    pub fn new(period: f64, order: usize) -> Result<Self> {
        if !(period.is_finite() && period > 0.0) {
            return Err(MathError::InvalidInput(
                "Seasonality period must be a positive number of days".to_string(),
            ));
        }
        if order == 0 {
            return Err(MathError::InvalidInput(
                "Fourier order must be greater than zero".to_string(),
            ));
        }

        Ok(Self { period, order })
    }

    /// Yearly seasonality with the given order
    pub fn yearly(order: usize) -> Result<Self> {
        Self::new(YEARLY_PERIOD, order)
    }

    /// Weekly seasonality with the given order
    pub fn weekly(order: usize) -> Result<Self> {
        Self::new(WEEKLY_PERIOD, order)
    }

    /// Get the period in days
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Get the number of harmonics
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of design columns this component contributes
    pub fn width(&self) -> usize {
        2 * self.order
    }

    /// Feature row for a point in time measured in days since a fixed epoch
    ///
    /// Columns are `sin(2πkt/P), cos(2πkt/P)` for `k = 1..=order`.
    pub fn features(&self, t_days: f64) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width());
        for k in 1..=self.order {
            let angle = 2.0 * PI * k as f64 * t_days / self.period;
            row.push(angle.sin());
            row.push(angle.cos());
        }
        row
    }
}
