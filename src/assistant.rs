//! Question Answering
//!
//! Drives one question through extraction, synthesis, sanitizing, execution
//! and the bounded repair loop. Every failure is turned into a message string
//! by [`SqlAssistant::answer`]; nothing escapes to the interactive loop.

use crate::config::{AppConfig, DomainColumns};
use crate::dataset::SchemaSnapshot;
use crate::engine::{QueryEngine, Row};
use crate::error::{AssistantError, Result};
use crate::error_classifier::classify;
use crate::formatter::format_rows;
use crate::llm::LanguageModel;
use crate::params::{extract_parameters, QuestionParams};
use crate::prompts::{build_repair_prompt, build_synthesis_prompt, PromptContext};
use crate::sanitizer::QuerySanitizer;
use tracing::{info, warn};

/// Outcome of a successfully answered question
#[derive(Debug, Clone)]
pub struct AnswerReport {
    /// The query that finally executed
    pub sql: String,
    pub rows: Vec<Row>,
    /// Repair rounds that were needed (0 when the first query worked)
    pub repairs: u8,
}

pub struct SqlAssistant<'a, M: ?Sized, E: ?Sized> {
    model: &'a M,
    engine: &'a E,
    schema: &'a SchemaSnapshot,
    table_name: String,
    columns: DomainColumns,
    sanitizer: QuerySanitizer,
    max_repair_attempts: u8,
}

impl<'a, M, E> SqlAssistant<'a, M, E>
where
    M: LanguageModel + ?Sized,
    E: QueryEngine + ?Sized,
{
    pub fn new(model: &'a M, engine: &'a E, schema: &'a SchemaSnapshot, config: &AppConfig) -> Self {
        Self {
            model,
            engine,
            schema,
            table_name: config.table_name.clone(),
            columns: config.columns.clone(),
            sanitizer: QuerySanitizer::new(&config.columns),
            max_repair_attempts: config.max_repair_attempts,
        }
    }

    pub fn with_max_repair_attempts(mut self, attempts: u8) -> Self {
        self.max_repair_attempts = attempts;
        self
    }

    fn context<'p>(&'p self, params: &'p QuestionParams) -> PromptContext<'p> {
        PromptContext {
            table_name: &self.table_name,
            schema: self.schema,
            params,
            columns: &self.columns,
        }
    }

    /// Answer a question as a user-facing string
    pub async fn answer(&self, question: &str) -> String {
        match self.ask(question).await {
            Ok(report) => format_rows(&report.rows),
            Err(e @ AssistantError::Repair { .. }) => format!("Falha na correção: {}", e),
            Err(e) => format!("Erro no processamento: {}", e),
        }
    }

    /// Answer a question, keeping the executed query and raw rows
    pub async fn ask(&self, question: &str) -> Result<AnswerReport> {
        let params = extract_parameters(question);
        let ctx = self.context(&params);

        let prompt = build_synthesis_prompt(question, &ctx);
        let response = self.model.invoke(&prompt).await?;
        let sql = self.sanitizer.sanitize(&response);
        info!("Generated query: {}", sql);

        match self.engine.execute(&sql) {
            Ok(rows) => Ok(AnswerReport { sql, rows, repairs: 0 }),
            Err(e) => {
                warn!(class = %classify(&e.to_string()), "Query failed: {}", e);
                self.repair(question, &ctx, sql, e.to_string()).await
            }
        }
    }

    async fn repair(
        &self,
        question: &str,
        ctx: &PromptContext<'_>,
        mut failed_sql: String,
        mut last_error: String,
    ) -> Result<AnswerReport> {
        for attempt in 1..=self.max_repair_attempts {
            info!("Repair attempt {} of {}", attempt, self.max_repair_attempts);

            let prompt = build_repair_prompt(question, &failed_sql, &last_error, ctx);
            let response = match self.model.invoke(&prompt).await {
                Ok(response) => response,
                Err(e) => {
                    return Err(AssistantError::Repair { attempts: attempt, reason: e.to_string() });
                }
            };

            let sql = self.sanitizer.sanitize(&response);
            info!("Corrected query: {}", sql);

            match self.engine.execute(&sql) {
                Ok(rows) => return Ok(AnswerReport { sql, rows, repairs: attempt }),
                Err(e) => {
                    warn!(class = %classify(&e.to_string()), "Corrected query failed: {}", e);
                    failed_sql = sql;
                    last_error = e.to_string();
                }
            }
        }

        Err(AssistantError::Repair {
            attempts: self.max_repair_attempts,
            reason: last_error,
        })
    }
}
