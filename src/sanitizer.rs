//! Query Sanitizer
//!
//! Turns raw model output into an executable query in three passes:
//! extraction, cleaning and domain rewriting. Everything is textual; nothing
//! here parses SQL or fails. Malformed text is passed along and left for the
//! engine to reject.

use crate::config::DomainColumns;
use chrono::{Local, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref LEADING_KEYWORD: Regex =
        Regex::new(r"(?i)^\s*(SELECT|WITH|INSERT|UPDATE|DELETE|CREATE)\b").expect("valid keyword pattern");
    static ref FENCED_SQL: Regex = Regex::new(r"(?is)```sql\s*(.*?)\s*```").expect("valid fence pattern");
    static ref LOOSE_SELECT: Regex =
        Regex::new(r"(?is)(\bSELECT\s.+?\bFROM\s[^;`]*?)(?:\n\s*\n|;|`|$)").expect("valid select pattern");
    static ref LINE_COMMENT: Regex = Regex::new(r"(?m)--.*$").expect("valid line comment pattern");
    static ref BLOCK_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment pattern");

    /// Relative-date expressions, applied in order. Offsets are not preserved.
    static ref NOW_REWRITES: Vec<(Regex, &'static str)> = vec![
        (
            Regex::new(r"(?i)DATE\('now\(\)',\s*'-?\d+\s+days?'\)").expect("valid pattern"),
            "CURRENT_DATE",
        ),
        (Regex::new(r"(?i)DATE\('now\(\)'\)").expect("valid pattern"), "CURRENT_DATE"),
        (Regex::new(r"(?i)\bNOW\(\)").expect("valid pattern"), "CURRENT_TIMESTAMP"),
        (Regex::new(r"(?i)\bDATE_SUB\([^)]+\)").expect("valid pattern"), "CURRENT_DATE"),
    ];
    // Polars SQL has neither function, so both end up as literals
    static ref CURRENT_DATE: Regex = Regex::new(r"(?i)\bCURRENT_DATE\b(\(\))?").expect("valid pattern");
    static ref CURRENT_TIMESTAMP: Regex =
        Regex::new(r"(?i)\bCURRENT_TIMESTAMP\b(\(\))?").expect("valid pattern");
}

/// Products whose literal casing is canonicalised to the stored uppercase form
const CANONICAL_PRODUCTS: &[&str] = &["GASOLINA", "DIESEL", "ETANOL"];

/// Which extraction branch produced the candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    LeadingKeyword,
    FencedBlock,
    LooseSelect,
    PassThrough,
}

/// Pull a SQL statement out of a possibly chatty model response.
pub fn extract_sql(response: &str) -> (String, Extraction) {
    if LEADING_KEYWORD.is_match(response) {
        return (response.to_string(), Extraction::LeadingKeyword);
    }

    if let Some(block) = FENCED_SQL.captures(response).and_then(|caps| caps.get(1)) {
        return (block.as_str().trim().to_string(), Extraction::FencedBlock);
    }

    if let Some(select) = LOOSE_SELECT.captures(response).and_then(|caps| caps.get(1)) {
        return (select.as_str().trim().to_string(), Extraction::LooseSelect);
    }

    (response.to_string(), Extraction::PassThrough)
}

/// Strip comments, surrounding whitespace and one trailing `;`.
pub fn clean_sql(sql: &str) -> String {
    let without_lines = LINE_COMMENT.replace_all(sql.trim(), "");
    let without_comments = BLOCK_COMMENT.replace_all(&without_lines, "");
    let trimmed = without_comments.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim().to_string()
}

/// Domain-specific textual rewrites. Idempotent.
///
/// "Now" is pinned to a literal date or timestamp taken from the local clock
/// when the rewrite runs.
pub struct QueryRewriter {
    date_column: String,
    date_floor: Regex,
    product_literals: Vec<(Regex, String)>,
}

impl QueryRewriter {
    pub fn new(columns: &DomainColumns) -> Self {
        let date_column = regex::escape(&columns.date_column);
        let date_floor = Regex::new(&format!(r"(?i)\b{}\s*>=\s*CURRENT_DATE\b(\(\))?", date_column))
            .expect("escaped column name forms a valid pattern");

        let product_column = regex::escape(&columns.product_column);
        let product_literals = CANONICAL_PRODUCTS
            .iter()
            .map(|product| {
                let pattern = Regex::new(&format!(r"(?i)\b{}\s*=\s*'{}'", product_column, product))
                    .expect("escaped column name forms a valid pattern");
                (pattern, format!("{} = '{}'", columns.product_column, product))
            })
            .collect();

        Self {
            date_column: columns.date_column.clone(),
            date_floor,
            product_literals,
        }
    }

    pub fn rewrite(&self, sql: &str) -> String {
        self.rewrite_at(sql, Local::now().naive_local())
    }

    /// Rewrite with `now` as the current instant
    pub fn rewrite_at(&self, sql: &str, now: NaiveDateTime) -> String {
        let mut rewritten = sql.to_string();

        for (pattern, replacement) in NOW_REWRITES.iter() {
            rewritten = pattern.replace_all(&rewritten, *replacement).into_owned();
        }

        let today = now.date();
        let floor = format!(
            "{} >= CAST('{} 00:00:00' AS TIMESTAMP)",
            self.date_column,
            today.format("%Y-%m-%d")
        );
        rewritten = self.date_floor.replace_all(&rewritten, floor.as_str()).into_owned();

        let date_literal = format!("CAST('{}' AS DATE)", today.format("%Y-%m-%d"));
        let timestamp_literal = format!("CAST('{}' AS TIMESTAMP)", now.format("%Y-%m-%d %H:%M:%S"));
        rewritten = CURRENT_DATE.replace_all(&rewritten, date_literal.as_str()).into_owned();
        rewritten = CURRENT_TIMESTAMP
            .replace_all(&rewritten, timestamp_literal.as_str())
            .into_owned();

        for (pattern, replacement) in &self.product_literals {
            rewritten = pattern.replace_all(&rewritten, replacement.as_str()).into_owned();
        }

        rewritten
    }
}

/// Extraction, cleaning and rewriting in one step
pub struct QuerySanitizer {
    rewriter: QueryRewriter,
}

impl QuerySanitizer {
    pub fn new(columns: &DomainColumns) -> Self {
        Self {
            rewriter: QueryRewriter::new(columns),
        }
    }

    pub fn sanitize(&self, response: &str) -> String {
        let (extracted, how) = extract_sql(response);
        debug!(extraction = ?how, "extracted candidate query");
        let cleaned = clean_sql(&extracted);
        self.rewriter.rewrite(&cleaned)
    }
}
