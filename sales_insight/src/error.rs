//! Error types for the sales_insight crate

use crate::encoding::{CategoryField, Code};
use polars::prelude::PolarsError;
use sales_math::MathError;
use thiserror::Error;

/// Custom error types for the sales_insight crate
#[derive(Debug, Error)]
pub enum InsightError {
    /// A label or code that the categorical encoder does not know
    #[error("Invalid {field}: '{label}'")]
    UnknownCategory { field: CategoryField, label: String },

    /// Valid store and product, but the dataset has no rows for the pair
    #[error("No data available for store {store_id} and product {product_name}")]
    NoData { store_id: Code, product_name: Code },

    /// Forecasting model could not be fitted or evaluated
    #[error("Fit error: {0}")]
    FitError(String),

    /// K-means sweep or final clustering failed
    #[error("Clustering error: {0}")]
    ClusteringError(String),

    /// Malformed request dates
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    /// Error related to dataset validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error in configuration or label artifacts
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, InsightError>;

impl InsightError {
    /// Wrap a numeric failure raised while fitting a forecast
    pub fn fit(err: MathError) -> Self {
        InsightError::FitError(err.to_string())
    }

    /// Wrap a numeric failure raised while clustering
    pub fn clustering(err: MathError) -> Self {
        InsightError::ClusteringError(err.to_string())
    }

    /// HTTP-equivalent status for the boundary layer
    pub fn status_code(&self) -> u16 {
        match self {
            InsightError::UnknownCategory { .. } | InsightError::InvalidRange(_) => 400,
            InsightError::NoData { .. } => 404,
            InsightError::FitError(_)
            | InsightError::ClusteringError(_)
            | InsightError::DataError(_)
            | InsightError::ConfigError(_)
            | InsightError::IoError(_)
            | InsightError::PolarsError(_) => 500,
        }
    }

    /// True when the caller sent a bad request rather than the service failing
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<PolarsError> for InsightError {
    fn from(err: PolarsError) -> Self {
        InsightError::PolarsError(err.to_string())
    }
}
