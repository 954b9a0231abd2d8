//! Analytical Engine
//!
//! Raw SQL text in, rows out. The dataset is registered as a single table in
//! a Polars `SQLContext`; correctness of the SQL is left entirely to execution.

use crate::dataset::Dataset;
use crate::error::{AssistantError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use polars::sql::SQLContext;
use std::fmt;
use tracing::debug;

/// A scalar cell in a result row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Datetime(NaiveDateTime),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            // Debug keeps the fractional part on whole floats (5.0, not 5)
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Datetime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// One result row, in column order
pub type Row = Vec<Value>;

/// Narrow capability over whatever executes the SQL
pub trait QueryEngine {
    fn execute(&self, sql: &str) -> Result<Vec<Row>>;
}

/// Polars SQL engine over the in-memory dataset
pub struct PolarsSqlEngine {
    table_name: String,
    frame: DataFrame,
}

impl PolarsSqlEngine {
    pub fn new(dataset: &Dataset, table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            frame: dataset.frame().clone(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn run(&self, sql: &str) -> PolarsResult<DataFrame> {
        // A fresh context per query keeps the registered table untouched by
        // whatever statements the model produces.
        let mut ctx = SQLContext::new();
        ctx.register(&self.table_name, self.frame.clone().lazy());
        ctx.execute(sql)?.collect()
    }
}

impl QueryEngine for PolarsSqlEngine {
    fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("Executing on {}: {}", self.table_name, sql);
        let result = self
            .run(sql)
            .map_err(|e| AssistantError::Execution(e.to_string()))?;
        dataframe_to_rows(&result)
    }
}

/// Convert a collected frame into rows of scalar values
pub fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<Row>> {
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());

    for idx in 0..df.height() {
        let mut row = Vec::with_capacity(columns.len());
        for series in columns {
            row.push(any_value_to_value(series.get(idx)?));
        }
        rows.push(row);
    }

    Ok(rows)
}

fn any_value_to_value(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::Text(s.to_string()),
        AnyValue::StringOwned(s) => Value::Text(s.to_string()),
        AnyValue::Int8(i) => Value::Int(i as i64),
        AnyValue::Int16(i) => Value::Int(i as i64),
        AnyValue::Int32(i) => Value::Int(i as i64),
        AnyValue::Int64(i) => Value::Int(i),
        AnyValue::UInt8(i) => Value::Int(i as i64),
        AnyValue::UInt16(i) => Value::Int(i as i64),
        AnyValue::UInt32(i) => Value::Int(i as i64),
        AnyValue::UInt64(i) => Value::Int(i as i64),
        AnyValue::Float32(x) => Value::Float(x as f64),
        AnyValue::Float64(x) => Value::Float(x),
        AnyValue::Date(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
            .map(Value::Date)
            .unwrap_or(Value::Int(days as i64)),
        AnyValue::Datetime(ts, unit, _) => {
            let micros = match unit {
                TimeUnit::Nanoseconds => ts / 1_000,
                TimeUnit::Microseconds => ts,
                TimeUnit::Milliseconds => ts * 1_000,
            };
            chrono::DateTime::from_timestamp_micros(micros)
                .map(|dt| Value::Datetime(dt.naive_utc()))
                .unwrap_or(Value::Int(ts))
        }
        other => Value::Text(other.to_string()),
    }
}
