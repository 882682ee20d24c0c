//! # Sales Math
//!
//! Numeric building blocks for the sales insight pipeline.
//! This crate provides the dense least-squares solver used to fit additive
//! forecasting models, Fourier seasonality features, k-means clustering and
//! a handful of sample statistics.

use thiserror::Error;

pub mod clustering;
pub mod linalg;
pub mod moving_averages;
pub mod seasonality;
pub mod stats;

pub use clustering::{KMeans, KMeansFit};

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
