//! Exponentially weighted moving averages
//!
//! Smoothed sales are an EWMA of raw daily sales. Datasets normally ship with
//! the smoothed column precomputed; this derives it when they don't.

use crate::{MathError, Result};

/// Exponentially weighted moving average with a span-derived smoothing factor
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    alpha: f64,
    current: Option<f64>,
}

impl ExponentialMovingAverage {
    /// Create a new EWMA where `alpha = 2 / (span + 1)`
    pub fn new(span: usize) -> Result<Self> {
        if span == 0 {
            return Err(MathError::InvalidInput(
                "Span must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            alpha: 2.0 / (span as f64 + 1.0),
            current: None,
        })
    }

    /// Update the EWMA with a new observation and return the smoothed value
    pub fn update(&mut self, value: f64) -> f64 {
        let next = match self.current {
            None => value,
            Some(previous) => self.alpha * value + (1.0 - self.alpha) * previous,
        };
        self.current = Some(next);
        next
    }

    /// Get the current smoothed value
    pub fn value(&self) -> Result<f64> {
        self.current.ok_or_else(|| {
            MathError::InsufficientData("No observations have been smoothed yet".to_string())
        })
    }

    /// Reset the EWMA, forgetting all observations
    pub fn reset(&mut self) {
        self.current = None;
    }
}
