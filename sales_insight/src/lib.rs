//! # Sales Insight
//!
//! Forecasting and clustering over a fixed historical sales dataset.
//!
//! ## Features
//!
//! - Dataset loading from CSV or Parquet (smoothed daily sales per store and product)
//! - Categorical label ↔ code encoding for stores, products, categories and regions
//! - Additive trend + seasonality forecasts with uncertainty intervals
//! - Store/category clustering with an elbow choice of k
//! - Transport-agnostic request/response contracts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sales_insight::config::AppConfig;
//! use sales_insight::service::{ForecastRequest, SalesInsightService};
//!
//! let config = AppConfig::load(None)?;
//! let service = SalesInsightService::from_config(&config)?;
//!
//! let response = service.handle_forecast(&ForecastRequest {
//!     store_id: "S001".to_string(),
//!     product_name: "Battery".to_string(),
//!     start_date: "2023-01-01".to_string(),
//!     end_date: "2023-03-31".to_string(),
//! })?;
//! println!("{} predictions", response.predicted_sales.len());
//!
//! let clusters = service.handle_clustering()?;
//! println!("k = {}", clusters.optimal_k);
//! # Ok::<(), sales_insight::InsightError>(())
//! ```

pub mod aggregation;
pub mod clustering;
pub mod config;
pub mod data;
pub mod encoding;
pub mod error;
pub mod forecast;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod service;
pub mod utils;

// Re-export commonly used types
pub use crate::aggregation::{AggregationRow, AggregationView};
pub use crate::clustering::{ClusterAssignment, ClusterEngine, ClusteringOutcome};
pub use crate::config::AppConfig;
pub use crate::data::{DataLoader, SalesDataset, SalesRecord, SalesSeries};
pub use crate::encoding::{CategoryEncoder, CategoryField, Code};
pub use crate::error::{InsightError, Result};
pub use crate::forecast::{ForecastEngine, ForecastResult};
pub use crate::models::{ActualPoint, ForecastModel, PredictedPoint, TrainedForecastModel};
pub use crate::service::SalesInsightService;
pub use crate::utils::DateWindow;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
