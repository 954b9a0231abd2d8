//! Result Formatter
//!
//! Terse conversational rendering of a result set. No column alignment.

use crate::engine::{Row, Value};

pub const NO_RESULTS: &str = "Nenhum resultado encontrado.";

pub fn format_rows(rows: &[Row]) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    if rows.iter().all(|row| row.len() == 2) {
        return rows
            .iter()
            .map(|row| format!("'{}'={}", row[0], row[1]))
            .collect::<Vec<_>>()
            .join(", ");
    }

    rows.iter().map(|row| format_row(row)).collect::<Vec<_>>().join(", ")
}

/// Generic form of a row: a bare value for single-column rows, a tuple otherwise
fn format_row(row: &[Value]) -> String {
    match row {
        [single] => single.to_string(),
        _ => {
            let cells: Vec<String> = row
                .iter()
                .map(|value| match value {
                    Value::Text(s) => format!("'{}'", s),
                    other => other.to_string(),
                })
                .collect();
            format!("({})", cells.join(", "))
        }
    }
}
