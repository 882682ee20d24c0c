//! Store/category clustering with automatic choice of k

use crate::aggregation::AggregationView;
use crate::config::ClusteringConfig;
use crate::encoding::Code;
use crate::error::{InsightError, Result};
use sales_math::KMeans;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Cluster label of one aggregation row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub category: Code,
    pub store_id: Code,
    pub sales_total: f64,
    pub cluster_id: usize,
}

/// Assignments plus the sweep that chose k
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringOutcome {
    /// One entry per aggregation row, in row order
    pub assignments: Vec<ClusterAssignment>,
    pub chosen_k: usize,
    /// Inertia for k = 1, 2, ... as swept
    pub inertia: Vec<f64>,
}

/// Pick k at the sharpest drop of an inertia curve
///
/// Returns `argmin(diff(inertia)) + 2`, taking the first index on ties, and 2
/// when fewer than two values are given.
pub fn elbow_k(inertia: &[f64]) -> Result<usize> {
    if let Some(bad) = inertia.iter().find(|v| !v.is_finite()) {
        return Err(InsightError::ClusteringError(format!(
            "Inertia sequence contains a non-finite value ({bad})"
        )));
    }
    if inertia.len() < 2 {
        return Ok(2);
    }

    let mut best = 0;
    let mut best_drop = f64::INFINITY;
    for (i, pair) in inertia.windows(2).enumerate() {
        let drop = pair[1] - pair[0];
        if drop < best_drop {
            best = i;
            best_drop = drop;
        }
    }

    Ok(best + 2)
}

#[derive(Debug, Clone, Default)]
pub struct ClusterEngine {
    config: ClusteringConfig,
}

impl ClusterEngine {
    pub fn new(config: &ClusteringConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn kmeans(&self, k: usize) -> Result<KMeans> {
        Ok(KMeans::new(k)
            .map_err(InsightError::clustering)?
            .with_n_init(self.config.n_init)
            .with_max_iter(self.config.max_iter)
            .with_tolerance(self.config.tolerance)
            .with_seed(self.config.seed))
    }

    /// Inertia of the best k-means fit for k = 1..=min(max_k, rows)
    pub fn inertia_sweep(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        let max_k = self.config.max_k.min(features.len());
        (1..=max_k)
            .map(|k| {
                let fit = self
                    .kmeans(k)?
                    .fit(features)
                    .map_err(InsightError::clustering)?;
                Ok(fit.inertia())
            })
            .collect()
    }

    /// Cluster every row of the view
    ///
    /// The view is only read; the result is a new list annotated with cluster
    /// ids in `[0, chosen_k)`. Ids carry no meaning across calls.
    pub fn cluster_all(&self, view: &AggregationView) -> Result<ClusteringOutcome> {
        if view.is_empty() {
            return Err(InsightError::ClusteringError(
                "No store/category rows to cluster".to_string(),
            ));
        }

        let features = view.features();
        let inertia = self.inertia_sweep(&features)?;
        let elbow = elbow_k(&inertia)?;
        let chosen_k = elbow.min(features.len());
        debug!(?inertia, elbow, chosen_k, "inertia sweep finished");

        let fit = self
            .kmeans(chosen_k)?
            .fit(&features)
            .map_err(InsightError::clustering)?;
        debug!(
            centroids = ?fit.centroids(),
            iterations = fit.n_iter(),
            "final fit converged"
        );

        let assignments = view
            .rows()
            .iter()
            .zip(fit.labels())
            .map(|(row, &cluster_id)| ClusterAssignment {
                category: row.category,
                store_id: row.store_id,
                sales_total: row.sales_total,
                cluster_id,
            })
            .collect();

        info!(rows = view.len(), chosen_k, "clustered store/category totals");

        Ok(ClusteringOutcome {
            assignments,
            chosen_k,
            inertia,
        })
    }
}
