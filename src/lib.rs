//! # Sales Insight Workspace
//!
//! Umbrella crate re-exporting the workspace members.
//!
//! - [`sales_math`]: least squares, Fourier features, k-means and sample statistics
//! - [`sales_insight`]: dataset loading, categorical encoding, forecasting, clustering
//!   and the request/response contracts built on them
//!
//! ## Example
//!
//! ```
//! use sales_insight_workspace::sales_insight::encoding::{CategoryEncoder, CategoryField};
//!
//! let encoder = CategoryEncoder::builtin();
//! assert_eq!(encoder.encode(CategoryField::StoreId, "S003"), Some(2));
//! assert_eq!(encoder.decode(CategoryField::ProductName, 2), Some("Battery"));
//! ```

pub use sales_insight;
pub use sales_math;
