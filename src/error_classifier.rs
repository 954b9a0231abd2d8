//! Error Classifier
//!
//! Sorts engine error messages into a small taxonomy so the repair prompt can
//! carry a targeted hint.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlErrorClass {
    ColumnNotFound,
    TableNotFound,
    InvalidAggregation,
    TypeMismatch,
    Syntax,
    Other,
}

impl fmt::Display for SqlErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlErrorClass::ColumnNotFound => write!(f, "ColumnNotFound"),
            SqlErrorClass::TableNotFound => write!(f, "TableNotFound"),
            SqlErrorClass::InvalidAggregation => write!(f, "InvalidAggregation"),
            SqlErrorClass::TypeMismatch => write!(f, "TypeMismatch"),
            SqlErrorClass::Syntax => write!(f, "Syntax"),
            SqlErrorClass::Other => write!(f, "Other"),
        }
    }
}

impl SqlErrorClass {
    /// Line added to the repair prompt, if the class has a useful one
    pub fn hint(&self, table_name: &str) -> Option<String> {
        match self {
            SqlErrorClass::ColumnNotFound => {
                Some("Uma coluna usada não existe: use somente as COLUNAS VÁLIDAS, com o nome exato.".to_string())
            }
            SqlErrorClass::TableNotFound => Some(format!("A única tabela disponível é {}.", table_name)),
            SqlErrorClass::InvalidAggregation => Some(
                "Toda coluna fora de AVG(), COUNT(), SUM(), MIN() ou MAX() precisa estar no GROUP BY.".to_string(),
            ),
            SqlErrorClass::TypeMismatch => {
                Some("Compare datas com datas e números com números; use CAST quando necessário.".to_string())
            }
            SqlErrorClass::Syntax => Some("Corrija a sintaxe; não inclua texto fora da query.".to_string()),
            SqlErrorClass::Other => None,
        }
    }
}

pub fn classify(error_msg: &str) -> SqlErrorClass {
    let msg = error_msg.to_lowercase();

    // Polars: "relation 'precos' was not found"
    if (msg.contains("relation") && msg.contains("not found"))
        || (msg.contains("table")
            && (msg.contains("not found") || msg.contains("does not exist") || msg.contains("not registered")))
    {
        return SqlErrorClass::TableNotFound;
    }

    // Polars: "not found: preco_medio: 'select' failed"
    if msg.contains("not found:")
        || (msg.contains("column")
            && (msg.contains("not found") || msg.contains("does not exist") || msg.contains("unable to find")))
    {
        return SqlErrorClass::ColumnNotFound;
    }

    if msg.contains("group by") || msg.contains("aggregat") {
        return SqlErrorClass::InvalidAggregation;
    }

    if msg.contains("cannot compare") || msg.contains("cast") || msg.contains("dtype") || msg.contains("type mismatch") {
        return SqlErrorClass::TypeMismatch;
    }

    if msg.contains("syntax") || msg.contains("parse") || msg.contains("expected") {
        return SqlErrorClass::Syntax;
    }

    SqlErrorClass::Other
}
