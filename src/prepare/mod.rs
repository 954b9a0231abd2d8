//! Data Preparation
//!
//! Local part of the report pipeline: raw CSV reports become bronze Parquet
//! files with normalised headers, and bronze files become the single silver
//! dataset the assistant queries.

pub mod columns;
pub mod ingest;
pub mod transform;

pub use columns::{normalize_column_name, normalize_column_names};
pub use ingest::ingest_reports;
pub use transform::transform_bronze;
