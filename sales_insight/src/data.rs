//! Historical sales data: records, per-pair series and dataset loading

use crate::config::DatasetConfig;
use crate::encoding::{CategoryField, Code};
use crate::error::{InsightError, Result};
use crate::utils::parse_date;
use chrono::NaiveDate;
use polars::prelude::*;
use sales_math::moving_averages::ExponentialMovingAverage;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Name of the date column
pub const DATE_COLUMN: &str = "Date";

/// Name of the smoothed sales column
pub const EWMA_COLUMN: &str = "EWMA";

/// Name of the raw sales column, used when no smoothed column is present
pub const RAW_SALES_COLUMN: &str = "Units Sold";

/// Inventory carried per unit of smoothed sales
pub const INVENTORY_FACTOR: f64 = 1.5;

/// One row of the dataset: a product's smoothed sales at one store on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub store_id: Code,
    pub product_name: Code,
    pub category: Code,
    pub region: Code,
    /// Exponentially weighted moving average of raw daily sales
    pub smoothed_sales: f64,
    /// Derived as `smoothed_sales * 1.5`
    pub inventory_level: f64,
}

impl SalesRecord {
    /// Create a record, deriving the inventory level from smoothed sales
    pub fn new(
        date: NaiveDate,
        store_id: Code,
        product_name: Code,
        category: Code,
        region: Code,
        smoothed_sales: f64,
    ) -> Self {
        Self {
            date,
            store_id,
            product_name,
            category,
            region,
            smoothed_sales,
            inventory_level: smoothed_sales * INVENTORY_FACTOR,
        }
    }

    fn pair(&self) -> (Code, Code) {
        (self.store_id, self.product_name)
    }
}

/// Daily smoothed-sales series of one (store, product) pair, ascending by date
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SalesSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl SalesSeries {
    /// Create a series from parallel date and value vectors
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(InsightError::DataError(format!(
                "Series has {} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(InsightError::DataError(format!(
                "Series dates must be strictly increasing ({} is followed by {})",
                pair[0], pair[1]
            )));
        }

        Ok(Self { dates, values })
    }

    /// Observation dates
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Observed smoothed sales
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `(date, value)` pairs in date order
    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// First observation date
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// Last observation date
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        self.dates.len()
    }
}

/// Immutable collection of sales records, loaded once
///
/// Records are kept sorted by (store, product, date) so a pair's series is a
/// contiguous slice.
#[derive(Debug, Clone, Default)]
pub struct SalesDataset {
    records: Vec<SalesRecord>,
}

impl SalesDataset {
    /// Build a dataset from records in any order
    ///
    /// Rejects negative or non-finite smoothed sales and repeated dates within a
    /// (store, product) pair. Gaps in a pair's daily series are logged.
    pub fn from_records(mut records: Vec<SalesRecord>) -> Result<Self> {
        if let Some(bad) = records
            .iter()
            .find(|r| !(r.smoothed_sales.is_finite() && r.smoothed_sales >= 0.0))
        {
            return Err(InsightError::DataError(format!(
                "Smoothed sales must be a non-negative number, got {} for store {} product {} on {}",
                bad.smoothed_sales, bad.store_id, bad.product_name, bad.date
            )));
        }

        records.sort_by(|a, b| (a.pair(), a.date).cmp(&(b.pair(), b.date)));

        let mut gaps = 0usize;
        for pair in records.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.pair() != next.pair() {
                continue;
            }
            if prev.date == next.date {
                return Err(InsightError::DataError(format!(
                    "Duplicate record for store {} product {} on {}",
                    next.store_id, next.product_name, next.date
                )));
            }
            if (next.date - prev.date).num_days() > 1 {
                gaps += 1;
            }
        }
        if gaps > 0 {
            warn!(gaps, "sales series contain missing days");
        }

        Ok(Self { records })
    }

    /// All records, sorted by (store, product, date)
    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    /// Smoothed-sales series for one (store, product) pair; empty if absent
    pub fn series(&self, store_id: Code, product_name: Code) -> SalesSeries {
        let key = (store_id, product_name);
        let start = self.records.partition_point(|r| r.pair() < key);
        let end = self.records.partition_point(|r| r.pair() <= key);
        let slice = &self.records[start..end];

        SalesSeries {
            dates: slice.iter().map(|r| r.date).collect(),
            values: slice.iter().map(|r| r.smoothed_sales).collect(),
        }
    }

    /// Earliest and latest date in the dataset
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.date).min()?;
        let last = self.records.iter().map(|r| r.date).max()?;
        Some((first, last))
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Data loader for sales datasets
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a dataset from a CSV or Parquet file, chosen by extension
    pub fn from_path<P: AsRef<Path>>(path: P, config: &DatasetConfig) -> Result<SalesDataset> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let df = match path.extension().and_then(|ext| ext.to_str()) {
            Some("parquet") => ParquetReader::new(file).finish()?,
            _ => CsvReader::new(file)
                .infer_schema(None)
                .has_header(true)
                .finish()?,
        };

        info!(path = %path.display(), rows = df.height(), "loaded sales dataset");
        Self::from_dataframe(&df, config)
    }

    /// Load a dataset from a CSV file with default settings
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<SalesDataset> {
        Self::from_path(path, &DatasetConfig::default())
    }

    /// Build a dataset from an existing DataFrame
    ///
    /// Expects `Date`, the four categorical code columns, and either `EWMA` or
    /// raw `Units Sold` (smoothed per store and product on load).
    pub fn from_dataframe(df: &DataFrame, config: &DatasetConfig) -> Result<SalesDataset> {
        let dates = column_as_dates(df, DATE_COLUMN)?;
        let stores = column_as_codes(df, CategoryField::StoreId.column_name())?;
        let products = column_as_codes(df, CategoryField::ProductName.column_name())?;
        let categories = column_as_codes(df, CategoryField::Category.column_name())?;
        let regions = column_as_codes(df, CategoryField::Region.column_name())?;

        let columns = df.get_column_names();
        let smoothed = if columns.contains(&EWMA_COLUMN) {
            column_as_f64(df, EWMA_COLUMN)?
        } else if columns.contains(&RAW_SALES_COLUMN) {
            debug!(span = config.smoothing_span, "deriving smoothed sales from raw sales");
            let raw = column_as_f64(df, RAW_SALES_COLUMN)?;
            smooth_by_pair(&dates, &stores, &products, &raw, config.smoothing_span)?
        } else {
            return Err(InsightError::DataError(format!(
                "Dataset needs either an '{EWMA_COLUMN}' or a '{RAW_SALES_COLUMN}' column"
            )));
        };

        let records = (0..df.height())
            .map(|i| {
                SalesRecord::new(
                    dates[i],
                    stores[i],
                    products[i],
                    categories[i],
                    regions[i],
                    smoothed[i],
                )
            })
            .collect();

        SalesDataset::from_records(records)
    }
}

/// EWMA of raw sales computed independently for each (store, product) pair
fn smooth_by_pair(
    dates: &[NaiveDate],
    stores: &[Code],
    products: &[Code],
    raw: &[f64],
    span: usize,
) -> Result<Vec<f64>> {
    let mut order: Vec<usize> = (0..raw.len()).collect();
    order.sort_by_key(|&i| (stores[i], products[i], dates[i]));

    let mut average = ExponentialMovingAverage::new(span)
        .map_err(|e| InsightError::ConfigError(e.to_string()))?;
    let mut smoothed = vec![0.0; raw.len()];
    let mut current_pair = None;

    for i in order {
        let pair = Some((stores[i], products[i]));
        if pair != current_pair {
            average.reset();
            current_pair = pair;
        }
        smoothed[i] = average.update(raw[i]);
    }

    Ok(smoothed)
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map_err(|e| InsightError::DataError(format!("Column '{}' not found: {}", name, e)))
}

fn missing(name: &str, row: usize) -> InsightError {
    InsightError::DataError(format!("Column '{}' has no value at row {}", name, row))
}

fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = column(df, name)?.cast(&DataType::Float64)?;
    let values = series.f64()?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.ok_or_else(|| missing(name, row)))
        .collect()
}

fn column_as_codes(df: &DataFrame, name: &str) -> Result<Vec<Code>> {
    let series = column(df, name)?.cast(&DataType::Int64)?;
    let values = series.i64()?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let value = value.ok_or_else(|| missing(name, row))?;
            Code::try_from(value).map_err(|_| {
                InsightError::DataError(format!(
                    "Column '{}' has invalid code {} at row {}",
                    name, value, row
                ))
            })
        })
        .collect()
}

fn column_as_dates(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let series = column(df, name)?.cast(&DataType::Utf8)?;
    let values = series.utf8()?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let raw = value.ok_or_else(|| missing(name, row))?;
            parse_date(raw).map_err(|e| {
                InsightError::DataError(format!("Column '{}' row {}: {}", name, row, e))
            })
        })
        .collect()
}
