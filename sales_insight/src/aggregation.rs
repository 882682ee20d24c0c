//! Per (category, store) sales totals used by clustering

use crate::data::SalesDataset;
use crate::encoding::Code;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Summed smoothed sales of one category at one store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationRow {
    pub category: Code,
    pub store_id: Code,
    pub sales_total: f64,
}

/// Immutable snapshot of the aggregation, cheap to clone and share
///
/// Rows are sorted by (category, store_id) and never change after
/// construction.
#[derive(Debug, Clone, Default)]
pub struct AggregationView {
    rows: Arc<[AggregationRow]>,
}

impl AggregationView {
    /// Sum smoothed sales over every record of each (category, store) pair
    pub fn from_dataset(dataset: &SalesDataset) -> Self {
        let mut totals: BTreeMap<(Code, Code), f64> = BTreeMap::new();
        for record in dataset.records() {
            *totals.entry((record.category, record.store_id)).or_insert(0.0) +=
                record.smoothed_sales;
        }

        let rows: Vec<AggregationRow> = totals
            .into_iter()
            .map(|((category, store_id), sales_total)| AggregationRow {
                category,
                store_id,
                sales_total,
            })
            .collect();

        Self { rows: rows.into() }
    }

    /// Build a view from precomputed rows, sorting them
    pub fn from_rows(mut rows: Vec<AggregationRow>) -> Self {
        rows.sort_by_key(|row| (row.category, row.store_id));
        Self { rows: rows.into() }
    }

    pub fn rows(&self) -> &[AggregationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One-dimensional feature vectors `[sales_total]`, in row order
    pub fn features(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|row| vec![row.sales_total]).collect()
    }
}
