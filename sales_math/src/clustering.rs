//! K-means clustering
//!
//! Lloyd's algorithm with k-means++ seeding. Every fit draws from a generator
//! seeded by [`KMeans::seed`], so the same data and parameters always produce
//! the same centroids and inertia.

use crate::stats::variance;
use crate::{MathError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// K-means clustering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    n_clusters: usize,
    n_init: usize,
    max_iter: usize,
    tolerance: f64,
    seed: u64,
}

/// Result of a k-means fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansFit {
    centroids: Vec<Vec<f64>>,
    labels: Vec<usize>,
    inertia: f64,
    n_iter: usize,
}

impl KMeans {
    /// Create a k-means model with `n_clusters` clusters and default settings
    ///
    /// Defaults: 10 initialisations, 300 Lloyd iterations, relative tolerance
    /// `1e-4`, seed 42.
    pub fn new(n_clusters: usize) -> Result<Self> {
        if n_clusters == 0 {
            return Err(MathError::InvalidInput(
                "Number of clusters must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            n_clusters,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
        })
    }

    /// Set the number of independent initialisations; the best by inertia wins
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Set the maximum number of Lloyd iterations per initialisation
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Set the convergence tolerance, relative to the mean feature variance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Get the number of clusters
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Get the number of initialisations
    pub fn n_init(&self) -> usize {
        self.n_init
    }

    /// Get the random seed
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fit the model to `data`, one point per row
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<KMeansFit> {
        let dims = validate(data)?;
        if self.n_clusters > data.len() {
            return Err(MathError::InvalidInput(format!(
                "n_samples={} should be >= n_clusters={}",
                data.len(),
                self.n_clusters
            )));
        }

        let tolerance = self.tolerance * mean_feature_variance(data, dims);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.n_init {
            let seeds = kmeans_plus_plus(data, self.n_clusters, &mut rng);
            let candidate = lloyd(data, seeds, self.max_iter, tolerance);
            let better = best
                .as_ref()
                .map_or(true, |current| candidate.inertia < current.inertia);
            if better {
                best = Some(candidate);
            }
        }

        let fit = best.ok_or_else(|| {
            MathError::CalculationError("No k-means initialisation was run".to_string())
        })?;

        if !fit.inertia.is_finite() {
            return Err(MathError::CalculationError(
                "K-means produced a non-finite inertia".to_string(),
            ));
        }

        Ok(fit)
    }
}

impl KMeansFit {
    /// Cluster centres, one per cluster
    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    /// Cluster label of every fitted point, each in `[0, k)`
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Sum of squared distances from each point to its assigned centre
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Lloyd iterations run by the winning initialisation
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

fn validate(data: &[Vec<f64>]) -> Result<usize> {
    let first = data.first().ok_or_else(|| {
        MathError::InsufficientData("Cannot cluster an empty dataset".to_string())
    })?;
    let dims = first.len();
    if dims == 0 {
        return Err(MathError::InvalidInput(
            "Points must have at least one feature".to_string(),
        ));
    }

    for (i, point) in data.iter().enumerate() {
        if point.len() != dims {
            return Err(MathError::InvalidInput(format!(
                "Point {i} has {} features, expected {dims}",
                point.len()
            )));
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(format!(
                "Point {i} contains a non-finite value"
            )));
        }
    }

    Ok(dims)
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index of and squared distance to the closest centre; ties go to the lowest index
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, centre) in centroids.iter().enumerate() {
        let d = squared_distance(point, centre);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn mean_feature_variance(data: &[Vec<f64>], dims: usize) -> f64 {
    let total: f64 = (0..dims)
        .map(|d| {
            let column: Vec<f64> = data.iter().map(|p| p[d]).collect();
            variance(&column).unwrap_or(0.0)
        })
        .sum();
    total / dims as f64
}

/// Pick an index with probability proportional to `weights`
fn weighted_index(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    if total <= 0.0 {
        return rng.gen_range(0..weights.len());
    }

    let target = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > target {
            return i;
        }
    }
    weights.len() - 1
}

/// Greedy k-means++ seeding: each step samples several candidates and keeps
/// the one that lowers the potential the most
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let local_trials = 2 + (k as f64).ln().floor() as usize;
    let mut centroids = Vec::with_capacity(k);

    let first = rng.gen_range(0..data.len());
    centroids.push(data[first].clone());

    let mut closest: Vec<f64> = data
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();
    let mut potential: f64 = closest.iter().sum();

    while centroids.len() < k {
        let mut best: Option<(usize, f64, Vec<f64>)> = None;

        for _ in 0..local_trials {
            let candidate = weighted_index(&closest, potential, rng);
            let distances: Vec<f64> = data
                .iter()
                .zip(&closest)
                .map(|(p, &c)| c.min(squared_distance(p, &data[candidate])))
                .collect();
            let candidate_potential: f64 = distances.iter().sum();

            let improves = best
                .as_ref()
                .map_or(true, |(_, pot, _)| candidate_potential < *pot);
            if improves {
                best = Some((candidate, candidate_potential, distances));
            }
        }

        if let Some((index, pot, distances)) = best {
            centroids.push(data[index].clone());
            closest = distances;
            potential = pot;
        }
    }

    centroids
}

fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>]) -> (Vec<usize>, Vec<f64>) {
    data.iter().map(|p| nearest(p, centroids)).unzip()
}

fn lloyd(
    data: &[Vec<f64>],
    mut centroids: Vec<Vec<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> KMeansFit {
    let k = centroids.len();
    let dims = centroids[0].len();
    let mut n_iter = 0;

    for _ in 0..max_iter {
        n_iter += 1;
        let (labels, distances) = assign(data, &centroids);

        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in data.iter().zip(&labels) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(point) {
                *s += v;
            }
        }

        // Empty clusters take over the points worst served by their centre
        let mut far_points: Vec<usize> = (0..data.len()).collect();
        far_points.sort_by(|&a, &b| distances[b].total_cmp(&distances[a]));
        let mut far_points = far_points.into_iter();

        let mut next = Vec::with_capacity(k);
        for (sum, &count) in sums.iter().zip(&counts) {
            if count > 0 {
                next.push(sum.iter().map(|s| s / count as f64).collect::<Vec<f64>>());
            } else {
                let index = far_points.next().unwrap_or(0);
                next.push(data[index].clone());
            }
        }

        let shift: f64 = centroids
            .iter()
            .zip(&next)
            .map(|(old, new)| squared_distance(old, new))
            .sum();
        centroids = next;

        if shift <= tolerance {
            break;
        }
    }

    let (labels, distances) = assign(data, &centroids);
    KMeansFit {
        centroids,
        labels,
        inertia: distances.iter().sum(),
        n_iter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn points(values: &[f64]) -> Vec<Vec<f64>> {
        values.iter().map(|&v| vec![v]).collect()
    }

    #[test]
    fn test_separated_groups_are_recovered() {
        let data = points(&[1.0, 1.2, 0.9, 50.0, 51.0, 49.5, 100.0, 101.0]);
        let fit = KMeans::new(3).unwrap().fit(&data).unwrap();

        let labels = fit.labels();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_eq!(labels[6], labels[7]);
        assert_ne!(labels[0], labels[3]);
        assert_ne!(labels[3], labels[6]);
        assert_ne!(labels[0], labels[6]);
        assert!(fit.inertia() < 5.0);
    }

    #[test]
    fn test_single_cluster_inertia_is_total_sum_of_squares() {
        let data = points(&[1.0, 2.0, 3.0, 4.0]);
        let fit = KMeans::new(1).unwrap().fit(&data).unwrap();

        assert_abs_diff_eq!(fit.centroids()[0][0], 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.inertia(), 5.0, epsilon = 1e-12);
        assert!(fit.labels().iter().all(|&l| l == 0));
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let data = points(&[3.0, 7.0, 8.0, 15.0, 16.0, 30.0, 31.0, 33.0]);
        let model = KMeans::new(3).unwrap().with_seed(7);

        let a = model.fit(&data).unwrap();
        let b = model.fit(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_inertia_does_not_increase_with_k() {
        let data = points(&[3.0, 7.0, 8.0, 15.0, 16.0, 30.0, 31.0, 33.0, 60.0]);
        let inertia: Vec<f64> = (1..=5)
            .map(|k| KMeans::new(k).unwrap().fit(&data).unwrap().inertia())
            .collect();

        for pair in inertia.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9);
        }
    }

    #[test]
    fn test_more_clusters_than_distinct_points() {
        let data = points(&[5.0, 5.0, 5.0]);
        let fit = KMeans::new(2).unwrap().fit(&data).unwrap();

        assert_abs_diff_eq!(fit.inertia(), 0.0);
        assert!(fit.labels().iter().all(|&l| l < 2));
    }

    #[test]
    fn test_points_share_a_label_with_their_nearest_centroid() {
        let data = points(&[0.0, 0.5, 10.0, 10.5]);
        let fit = KMeans::new(2).unwrap().fit(&data).unwrap();

        assert_eq!(fit.labels()[0], fit.labels()[1]);
        assert_eq!(fit.labels()[2], fit.labels()[3]);
        assert_ne!(fit.labels()[0], fit.labels()[2]);
        assert!(fit.n_iter() >= 1);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(KMeans::new(0).is_err());

        let model = KMeans::new(3).unwrap();
        assert!(model.fit(&[]).is_err());
        assert!(model.fit(&points(&[1.0, 2.0])).is_err());
        assert!(model.fit(&[vec![1.0], vec![f64::NAN], vec![2.0]]).is_err());
        assert!(model.fit(&[vec![1.0], vec![1.0, 2.0], vec![2.0]]).is_err());
    }
}
