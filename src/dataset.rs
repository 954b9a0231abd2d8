//! Dataset Loader
//!
//! Loads the prepared (silver) table into memory and derives the schema
//! snapshot from it.

use crate::error::{AssistantError, Result};
use polars::prelude::*;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Ordered column names of the loaded dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSnapshot {
    columns: Vec<String>,
}

impl SchemaSnapshot {
    fn of(frame: &DataFrame) -> Self {
        Self {
            columns: frame.get_column_names().iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

impl fmt::Display for SchemaSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.columns.join(", "))
    }
}

/// The in-memory table plus the snapshot derived from it.
///
/// There is no way to replace the frame without building a new `Dataset`,
/// so the snapshot always matches what is loaded.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    schema: SchemaSnapshot,
}

impl Dataset {
    pub fn from_frame(frame: DataFrame) -> Self {
        let schema = SchemaSnapshot::of(&frame);
        Self { frame, schema }
    }

    /// Load a Parquet (or CSV) file fully into memory
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AssistantError::Dataset(format!("Dataset not found: {}", path.display())));
        }

        info!("Loading dataset from {}", path.display());
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        let lazy = if is_csv {
            LazyCsvReader::new(path)
                .with_has_header(true)
                .with_try_parse_dates(true)
                .finish()
                .map_err(|e| AssistantError::Dataset(format!("Failed to read CSV: {}", e)))?
        } else {
            LazyFrame::scan_parquet(path, ScanArgsParquet::default())
                .map_err(|e| AssistantError::Dataset(format!("Failed to scan parquet: {}", e)))?
        };

        let frame = lazy
            .collect()
            .map_err(|e| AssistantError::Dataset(format!("Failed to load dataset: {}", e)))?;

        let dataset = Self::from_frame(frame);
        info!("Loaded {} rows, columns: {}", dataset.height(), dataset.schema);
        Ok(dataset)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn schema(&self) -> &SchemaSnapshot {
        &self.schema
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }
}
