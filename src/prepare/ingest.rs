//! Raw report ingestion: semicolon CSV reports into bronze Parquet files.

use crate::error::{AssistantError, Result};
use crate::prepare::columns::normalize_column_names;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bronze file name for a report: `ca-2004-01.csv` -> `preco_combustivel_2004_01.parquet`
pub fn bronze_file_name(report: &Path) -> String {
    let stem = report
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("relatorio");
    let parts: Vec<&str> = stem.split('-').collect();
    let suffix = if parts.len() >= 3 {
        format!("{}_{}", parts[1], parts[2])
    } else {
        stem.to_string()
    };
    format!("preco_combustivel_{}.parquet", suffix)
}

/// Read one report with every column as text and normalised headers
pub fn read_report(path: &Path) -> Result<DataFrame> {
    let mut df = LazyCsvReader::new(path)
        .with_separator(b';')
        .with_has_header(true)
        .with_encoding(CsvEncoding::LossyUtf8)
        .with_ignore_errors(true)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;

    let raw_names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    df.set_column_names(&normalize_column_names(&raw_names))?;
    Ok(df)
}

/// Convert every `.csv` report in `reports_dir` into a Parquet file in `bronze_dir`.
///
/// A report that fails is logged and skipped. Returns the files written.
pub fn ingest_reports(reports_dir: &Path, bronze_dir: &Path) -> Result<Vec<PathBuf>> {
    if !reports_dir.is_dir() {
        return Err(AssistantError::Dataset(format!(
            "Reports directory not found: {}",
            reports_dir.display()
        )));
    }
    fs::create_dir_all(bronze_dir)?;

    let mut reports: Vec<PathBuf> = fs::read_dir(reports_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    reports.sort();

    let mut written = Vec::new();
    for report in reports {
        let target = bronze_dir.join(bronze_file_name(&report));
        match read_report(&report).and_then(|mut df| write_parquet(&mut df, &target)) {
            Ok(()) => {
                info!("Ingested {} -> {}", report.display(), target.display());
                written.push(target);
            }
            Err(e) => warn!("Skipping {}: {}", report.display(), e),
        }
    }

    Ok(written)
}

pub(crate) fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = fs::File::create(path)?;
    ParquetWriter::new(&mut file).finish(df)?;
    Ok(())
}
