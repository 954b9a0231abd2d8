//! Question Parameter Extractor
//!
//! Pulls coarse hints out of the free-text question. The result is only ever
//! injected into prompts as a hint; nothing downstream checks that generated
//! SQL honours it.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Products recognised in questions, in match-priority order
pub const PRODUCT_VOCABULARY: &[&str] = &["gasolina", "diesel", "etanol", "gnv", "gasolina aditivada"];

lazy_static! {
    static ref YEAR_PATTERN: Regex = Regex::new(r"(20\d{2})").expect("valid year pattern");
}

/// Hints extracted from a question.
///
/// `mes`, `estado` and `regiao` have no extraction logic and are always `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionParams {
    pub ano: Option<String>,
    pub mes: Option<String>,
    pub estado: Option<String>,
    pub regiao: Option<String>,
    pub produto: Option<String>,
}

impl QuestionParams {
    /// Compact JSON form used inside prompts
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

pub fn extract_parameters(question: &str) -> QuestionParams {
    let ano = YEAR_PATTERN
        .captures(question)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let lowered = question.to_lowercase();
    let produto = PRODUCT_VOCABULARY
        .iter()
        .find(|product| lowered.contains(*product))
        .map(|product| product.to_uppercase());

    QuestionParams {
        ano,
        produto,
        ..Default::default()
    }
}
