//! Interactive Loop
//!
//! Reads one question per line and prints the answer. Questions are handled
//! strictly one after another; Ctrl-C is only observed while waiting for input.

use crate::assistant::SqlAssistant;
use crate::engine::QueryEngine;
use crate::error::Result;
use crate::llm::LanguageModel;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, info_span, Instrument};

pub const EXIT_TOKENS: &[&str] = &["sair", "exit", "quit"];

/// Consecutive input failures after which the loop gives up
pub const MAX_READ_ERRORS: u32 = 3;

/// What to do with one line of input
#[derive(Debug, PartialEq, Eq)]
pub enum LineAction<'a> {
    Exit,
    Skip,
    Ask(&'a str),
}

pub fn classify_line(line: &str) -> LineAction<'_> {
    let question = line.trim();
    if EXIT_TOKENS.iter().any(|token| question.eq_ignore_ascii_case(token)) {
        LineAction::Exit
    } else if question.is_empty() {
        LineAction::Skip
    } else {
        LineAction::Ask(question)
    }
}

pub fn print_banner<W: Write>(out: &mut W) -> std::io::Result<()> {
    let rule = "=".repeat(60);
    writeln!(out, "\n{}", rule)?;
    writeln!(out, "IA ATIVADA - Sistema pronto para consultas")?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "- Digite 'sair' para encerrar")?;
    writeln!(out, "{}", rule)
}

/// Run the loop until an exit token, end of input, Ctrl-C or
/// [`MAX_READ_ERRORS`] read failures in a row.
///
/// Returns the number of questions answered.
pub async fn run<R, W, M, E>(input: R, out: &mut W, assistant: &SqlAssistant<'_, M, E>) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    M: LanguageModel + ?Sized,
    E: QueryEngine + ?Sized,
{
    let mut lines = input.lines();
    let mut answered = 0;
    let mut read_errors = 0;

    loop {
        write!(out, "\n Sua pergunta: ")?;
        out.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                writeln!(out, "\n Encerrando")?;
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                read_errors += 1;
                error!("Failed to read input ({}/{}): {}", read_errors, MAX_READ_ERRORS, e);
                writeln!(out, "Erro inesperado: {}", e)?;
                if read_errors >= MAX_READ_ERRORS {
                    writeln!(out, "\n Encerrando")?;
                    break;
                }
                continue;
            }
        };
        read_errors = 0;

        let question = match classify_line(&line) {
            LineAction::Exit => break,
            LineAction::Skip => continue,
            LineAction::Ask(question) => question,
        };

        let span = info_span!("question", id = %uuid::Uuid::new_v4());
        let answer = assistant.answer(question).instrument(span).await;
        answered += 1;

        if let Err(e) = writeln!(out, "\n resposta: {}", answer) {
            error!("Failed to write answer: {}", e);
        }
    }

    info!("Session finished after {} question(s)", answered);
    Ok(answered)
}
