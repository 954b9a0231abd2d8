use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fuel_query::assistant::SqlAssistant;
use fuel_query::config::AppConfig;
use fuel_query::engine::PolarsSqlEngine;
use fuel_query::error::AssistantError;
use fuel_query::llm::OllamaClient;
use fuel_query::prepare::{ingest_reports, transform_bronze};
use fuel_query::{repl, session};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fuel-query")]
#[command(about = "Ask questions about ANP fuel prices in plain language")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert raw semicolon CSV reports into bronze Parquet files
    Ingest {
        /// Directory holding the downloaded .csv reports
        reports_dir: PathBuf,
    },
    /// Build the silver dataset from the bronze Parquet files
    Transform,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;

    match args.command {
        None => run_session(&config).await,
        Some(Commands::Ingest { reports_dir }) => {
            let bronze_dir = config.require_bronze_dir()?;
            let written = ingest_reports(&reports_dir, bronze_dir)?;
            println!("{} relatório(s) convertidos para {}", written.len(), bronze_dir.display());
            Ok(())
        }
        Some(Commands::Transform) => {
            let bronze_dir = config.require_bronze_dir()?;
            let rows = transform_bronze(bronze_dir, &config.silver_path)?;
            println!("{} linhas gravadas em {}", rows, config.silver_path.display());
            Ok(())
        }
    }
}

async fn run_session(config: &AppConfig) -> Result<()> {
    println!("Iniciando sistema de consulta com Ollama");

    let client = OllamaClient::new(config.model.clone())?;
    let start = match session::start_session(&client, config, session::load_configured_dataset).await {
        Ok(start) => start,
        Err(AssistantError::ModelUnavailable(reason)) => {
            error!("Model service unavailable: {}", reason);
            println!("Ollama não está respondendo ({})", reason);
            println!("Não foi possível inicializar o LLM. Encerrando.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let engine = PolarsSqlEngine::new(&start.dataset, config.table_name.clone());
    let assistant = SqlAssistant::new(&client, &engine, start.dataset.schema(), config);
    info!("Querying table '{}' with model '{}'", engine.table_name(), client.model());

    let mut stdout = std::io::stdout();
    repl::print_banner(&mut stdout)?;
    repl::run(BufReader::new(tokio::io::stdin()), &mut stdout, &assistant).await?;
    Ok(())
}
