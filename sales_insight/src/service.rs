//! Transport-agnostic request handling
//!
//! The types here are the JSON contract of the forecast and clustering
//! endpoints. Whatever transport sits in front (HTTP, the CLI) only has to
//! deserialize a request, call a handler and serialize the response, using
//! [`InsightError::status_code`] for failures.

use crate::aggregation::AggregationView;
use crate::clustering::{ClusterEngine, ClusteringOutcome};
use crate::config::AppConfig;
use crate::data::{DataLoader, SalesDataset};
use crate::encoding::{CategoryEncoder, CategoryField, Code};
use crate::error::{InsightError, Result};
use crate::forecast::{ForecastEngine, ForecastResult};
use crate::metrics::ForecastAccuracy;
use crate::models::{ActualPoint, PredictedPoint};
use crate::utils::DateWindow;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub store_id: String,
    pub product_name: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub store_id: String,
    pub product_name: String,
    pub actual_sales: Vec<ActualPoint>,
    pub predicted_sales: Vec<PredictedPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<ForecastAccuracy>,
}

/// One clustered (category, store) row as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub category: Code,
    pub store_id: Code,
    pub sales: f64,
    pub cluster: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterResponse {
    pub clusters: Vec<ClusterEntry>,
    pub optimal_k: usize,
    pub inertia: Vec<f64>,
}

impl From<ClusteringOutcome> for ClusterResponse {
    fn from(outcome: ClusteringOutcome) -> Self {
        let clusters = outcome
            .assignments
            .into_iter()
            .map(|a| ClusterEntry {
                category: a.category,
                store_id: a.store_id,
                sales: a.sales_total,
                cluster: a.cluster_id,
            })
            .collect();

        Self {
            clusters,
            optimal_k: outcome.chosen_k,
            inertia: outcome.inertia,
        }
    }
}

/// Error payload returned with a non-2xx status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    /// Status code and payload for a failed request
    pub fn from_error(err: &InsightError) -> (u16, Self) {
        (
            err.status_code(),
            Self {
                error: err.to_string(),
            },
        )
    }
}

/// Loaded dataset, encoder and engines shared by every request
///
/// All state is immutable after construction, so one service can be shared
/// across threads behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct SalesInsightService {
    dataset: Arc<SalesDataset>,
    encoder: Arc<CategoryEncoder>,
    aggregation: AggregationView,
    forecast_engine: ForecastEngine,
    cluster_engine: ClusterEngine,
}

impl SalesInsightService {
    /// Assemble a service from an already loaded dataset
    pub fn new(dataset: SalesDataset, encoder: CategoryEncoder, config: &AppConfig) -> Self {
        for (field, codes) in encoder.unknown_codes(&dataset) {
            warn!(
                field = %field,
                codes = ?codes,
                encoding_version = encoder.version(),
                "dataset contains codes the label tables cannot decode"
            );
        }

        let aggregation = AggregationView::from_dataset(&dataset);
        info!(
            records = dataset.len(),
            aggregation_rows = aggregation.len(),
            "sales insight service ready"
        );

        Self {
            dataset: Arc::new(dataset),
            encoder: Arc::new(encoder),
            aggregation,
            forecast_engine: ForecastEngine::new(&config.forecast),
            cluster_engine: ClusterEngine::new(&config.clustering),
        }
    }

    /// Load the dataset and label tables named by the configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let encoder = match &config.dataset.labels_path {
            Some(path) => CategoryEncoder::from_path(path)?,
            None => CategoryEncoder::builtin(),
        };
        let dataset = DataLoader::from_path(&config.dataset.path, &config.dataset)?;
        Ok(Self::new(dataset, encoder, config))
    }

    pub fn dataset(&self) -> &SalesDataset {
        &self.dataset
    }

    pub fn encoder(&self) -> &CategoryEncoder {
        &self.encoder
    }

    pub fn aggregation(&self) -> &AggregationView {
        &self.aggregation
    }

    /// Forecast a store/product pair given by label
    pub fn forecast(
        &self,
        store_id: &str,
        product_name: &str,
        window: DateWindow,
    ) -> Result<ForecastResult> {
        let (store, product) = self.encode_pair(store_id, product_name)?;
        self.forecast_codes(store, product, window)
    }

    fn encode_pair(&self, store_id: &str, product_name: &str) -> Result<(Code, Code)> {
        Ok((
            self.encoder.require(CategoryField::StoreId, store_id)?,
            self.encoder.require(CategoryField::ProductName, product_name)?,
        ))
    }

    fn forecast_codes(
        &self,
        store: Code,
        product: Code,
        window: DateWindow,
    ) -> Result<ForecastResult> {
        self.forecast_engine
            .forecast(&self.dataset, &self.encoder, store, product, window)
    }

    /// Cluster all store/category totals
    pub fn cluster_all(&self) -> Result<ClusteringOutcome> {
        self.cluster_engine.cluster_all(&self.aggregation)
    }

    /// Validate and answer a forecast request
    ///
    /// Labels are checked before dates, and both before the dataset is
    /// consulted.
    pub fn handle_forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        let (store, product) = self.encode_pair(&request.store_id, &request.product_name)?;
        let window = DateWindow::parse(&request.start_date, &request.end_date)?;

        let result = self.forecast_codes(store, product, window)?;

        Ok(ForecastResponse {
            store_id: request.store_id.clone(),
            product_name: request.product_name.clone(),
            actual_sales: result.actual,
            predicted_sales: result.predicted,
            accuracy: result.accuracy,
        })
    }

    /// Answer a clustering request
    pub fn handle_clustering(&self) -> Result<ClusterResponse> {
        self.cluster_all().map(ClusterResponse::from)
    }
}
