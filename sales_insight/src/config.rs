//! Application configuration
//!
//! Settings come from compiled-in defaults, then an optional TOML file, then
//! `SALES_INSIGHT_*` environment variables. The merged result is validated
//! before use.

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "SALES_INSIGHT_CONFIG";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub forecast: ForecastConfig,
    pub clustering: ClusteringConfig,
    pub logging: LoggingConfig,
}

/// Where the dataset lives and how it is prepared on load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    /// CSV or Parquet file with the historical sales
    pub path: PathBuf,
    /// Optional TOML label artifact; the built-in tables are used when absent
    pub labels_path: Option<PathBuf>,
    /// EWMA span applied when the dataset only has raw sales
    pub smoothing_span: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/sales.csv"),
            labels_path: None,
            smoothing_span: 7,
        }
    }
}

/// Parameters of the additive forecasting model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Days predicted past the last observation
    pub horizon_days: usize,
    /// Probability mass covered by the uncertainty interval
    pub interval_width: f64,
    /// Simulated trajectories used for the interval; 0 disables it
    pub uncertainty_samples: usize,
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may be placed
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub yearly_order: usize,
    pub weekly_order: usize,
    pub seed: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 365,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly_order: 10,
            weekly_order: 3,
            seed: 42,
        }
    }
}

/// Parameters of the k-means sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusteringConfig {
    /// Largest k tried by the elbow sweep
    pub max_k: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_k: 5,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `sales_insight=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = InsightError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(InsightError::ConfigError(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` (if any) and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| lookup(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing sections and keys fall back to defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| InsightError::ConfigError(format!("invalid configuration: {e}")))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            InsightError::ConfigError(format!("cannot read `{}`: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    fn apply_env_overrides<F>(&mut self, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SALES_INSIGHT_DATASET_PATH") {
            self.dataset.path = PathBuf::from(value);
        }
        if let Some(value) = lookup("SALES_INSIGHT_LABELS_PATH") {
            self.dataset.labels_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("SALES_INSIGHT_SMOOTHING_SPAN") {
            self.dataset.smoothing_span = parse_env("SALES_INSIGHT_SMOOTHING_SPAN", &value)?;
        }

        if let Some(value) = lookup("SALES_INSIGHT_FORECAST_HORIZON_DAYS") {
            self.forecast.horizon_days = parse_env("SALES_INSIGHT_FORECAST_HORIZON_DAYS", &value)?;
        }
        if let Some(value) = lookup("SALES_INSIGHT_FORECAST_SEED") {
            self.forecast.seed = parse_env("SALES_INSIGHT_FORECAST_SEED", &value)?;
        }
        if let Some(value) = lookup("SALES_INSIGHT_CLUSTERING_MAX_K") {
            self.clustering.max_k = parse_env("SALES_INSIGHT_CLUSTERING_MAX_K", &value)?;
        }
        if let Some(value) = lookup("SALES_INSIGHT_CLUSTERING_SEED") {
            self.clustering.seed = parse_env("SALES_INSIGHT_CLUSTERING_SEED", &value)?;
        }

        if let Some(value) = lookup("SALES_INSIGHT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = lookup("SALES_INSIGHT_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    /// Reject settings the engines cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.dataset.smoothing_span == 0 {
            return Err(invalid("dataset.smoothing_span must be greater than zero"));
        }

        let forecast = &self.forecast;
        if forecast.horizon_days == 0 {
            return Err(invalid("forecast.horizon_days must be greater than zero"));
        }
        if !(forecast.interval_width > 0.0 && forecast.interval_width < 1.0) {
            return Err(invalid("forecast.interval_width must be in (0, 1)"));
        }
        if !(forecast.changepoint_range > 0.0 && forecast.changepoint_range <= 1.0) {
            return Err(invalid("forecast.changepoint_range must be in (0, 1]"));
        }
        if !(forecast.changepoint_prior_scale > 0.0 && forecast.seasonality_prior_scale > 0.0) {
            return Err(invalid("forecast prior scales must be positive"));
        }

        let clustering = &self.clustering;
        if clustering.max_k == 0 {
            return Err(invalid("clustering.max_k must be greater than zero"));
        }
        if clustering.n_init == 0 || clustering.max_iter == 0 {
            return Err(invalid(
                "clustering.n_init and clustering.max_iter must be greater than zero",
            ));
        }
        if !(clustering.tolerance.is_finite() && clustering.tolerance >= 0.0) {
            return Err(invalid("clustering.tolerance must be a non-negative number"));
        }

        if self.logging.level.trim().is_empty() {
            return Err(invalid("logging.level must not be empty"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> InsightError {
    InsightError::ConfigError(message.to_string())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| InsightError::ConfigError(format!("{key} has invalid value `{value}`")))
}
