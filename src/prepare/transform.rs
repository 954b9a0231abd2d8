//! Bronze to silver: typed, filtered, one table with the fixed column set.

use crate::error::{AssistantError, Result};
use crate::prepare::ingest::write_parquet;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const TEXT_COLUMNS: &[&str] = &["regiao_sigla", "estado_sigla", "municipio", "revenda", "bairro", "produto"];

fn text(name: &str) -> Expr {
    col(name).cast(DataType::String)
}

/// Prices arrive as "1,967"
fn price(name: &str) -> Expr {
    text(name)
        .str()
        .replace(lit(","), lit("."), true)
        .cast(DataType::Float64)
        .alias(name)
}

fn silver_projection() -> Vec<Expr> {
    let mut exprs: Vec<Expr> = TEXT_COLUMNS.iter().map(|name| text(name)).collect();
    exprs.insert(
        4,
        text("cnpj_da_revenda")
            .str()
            .replace_all(lit(r"\D"), lit(""), false)
            .alias("cnpj_da_revenda"),
    );
    exprs.extend([
        text("data_da_coleta")
            .str()
            .to_date(StrptimeOptions {
                format: Some("%d/%m/%Y".into()),
                strict: false,
                ..Default::default()
            })
            .alias("data_da_coleta"),
        price("valor_de_venda"),
        price("valor_de_compra"),
        text("unidade_de_medida"),
        text("bandeira"),
    ]);
    exprs
}

fn region_name() -> Expr {
    let sigla = || col("regiao_sigla");
    when(sigla().eq(lit("S")))
        .then(lit("Sul"))
        .when(sigla().eq(lit("SE")))
        .then(lit("Sudeste"))
        .when(sigla().eq(lit("CO")))
        .then(lit("Centro-Oeste"))
        .when(sigla().eq(lit("NE")))
        .then(lit("Nordeste"))
        .when(sigla().eq(lit("N")))
        .then(lit("Norte"))
        .otherwise(lit(NULL).cast(DataType::String))
        .alias("regiao")
}

/// Type and filter one bronze frame into the silver shape
pub fn to_silver(bronze: LazyFrame) -> LazyFrame {
    bronze
        .select(silver_projection())
        .filter(col("regiao_sigla").is_not_null().and(col("valor_de_venda").is_not_null()))
        .with_columns([region_name()])
}

/// Transform every bronze Parquet file into the single silver dataset.
///
/// Returns the number of rows written.
pub fn transform_bronze(bronze_dir: &Path, silver_path: &Path) -> Result<usize> {
    let mut files: Vec<PathBuf> = fs::read_dir(bronze_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("parquet"))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(AssistantError::Dataset(format!(
            "No bronze parquet files in {}",
            bronze_dir.display()
        )));
    }

    let frames = files
        .iter()
        .map(|path| {
            LazyFrame::scan_parquet(path, ScanArgsParquet::default())
                .map(to_silver)
                .map_err(|e| AssistantError::Dataset(format!("Failed to scan {}: {}", path.display(), e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut silver = concat(frames, UnionArgs::default())?.collect()?;

    if let Some(parent) = silver_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    write_parquet(&mut silver, silver_path)?;

    info!(
        "Wrote {} rows from {} bronze file(s) to {}",
        silver.height(),
        files.len(),
        silver_path.display()
    );
    Ok(silver.height())
}
