use async_trait::async_trait;
use chrono::NaiveDate;
use fuel_query::assistant::SqlAssistant;
use fuel_query::config::AppConfig;
use fuel_query::dataset::Dataset;
use fuel_query::engine::{PolarsSqlEngine, QueryEngine, Row};
use fuel_query::error::{AssistantError, Result};
use fuel_query::llm::{InstalledModel, LanguageModel, ModelService};
use fuel_query::{repl, session};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, BufReader, ReadBuf};

/// Write a small silver dataset to a fresh temp directory
fn create_silver_file() -> (PathBuf, PathBuf) {
    let root = std::env::temp_dir().join(format!("fuel-query-it-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).unwrap();

    let mut df = df![
        "regiao_sigla" => ["SE", "SE", "NE"],
        "estado_sigla" => ["SP", "RJ", "BA"],
        "municipio" => ["GUARULHOS", "NITEROI", "SALVADOR"],
        "produto" => ["GASOLINA", "GASOLINA", "DIESEL"],
        "data_da_coleta" => [
            NaiveDate::from_ymd_opt(2014, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
            // later than any clock the tests run on
            NaiveDate::from_ymd_opt(2099, 1, 1).unwrap()
        ],
        "valor_de_venda" => [5.0, 6.0, 4.5],
        "bandeira" => ["PETROBRAS", "SHELL", "BRANCA"],
        "regiao" => ["Sudeste", "Sudeste", "Nordeste"]
    ]
    .unwrap();

    let path = root.join("combustiveis.parquet");
    let mut file = std::fs::File::create(&path).unwrap();
    ParquetWriter::new(&mut file).finish(&mut df).unwrap();
    (root, path)
}

fn config_for(silver: &Path) -> AppConfig {
    let silver = silver.display().to_string();
    AppConfig::from_lookup(move |key| match key {
        "URL_DATA_SILVER" => Some(silver.clone()),
        "OLLAMA_READY_BACKOFF_SECS" => Some("0".to_string()),
        _ => None,
    })
    .unwrap()
}

struct ScriptedModel {
    responses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(AssistantError::Llm("no scripted response left".to_string()))
        } else {
            Ok(responses.remove(0))
        }
    }
}

/// Records every query that reaches the real engine
struct RecordingEngine {
    inner: PolarsSqlEngine,
    executed: Mutex<Vec<String>>,
}

impl QueryEngine for RecordingEngine {
    fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.inner.execute(sql)
    }
}

#[tokio::test]
async fn test_grouped_average_end_to_end() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let dataset = Dataset::load(&config.silver_path).unwrap();
    let engine = PolarsSqlEngine::new(&dataset, config.table_name.clone());
    let model = ScriptedModel::new(&[
        "```sql\nSELECT produto, AVG(valor_de_venda) AS media FROM combustiveis GROUP BY produto ORDER BY produto;\n```",
    ]);
    let assistant = SqlAssistant::new(&model, &engine, dataset.schema(), &config);

    let answer = assistant.answer("preço médio por produto").await;
    assert_eq!(answer, "'DIESEL'=4.5, 'GASOLINA'=5.5");

    // the prompt was built from the loaded columns
    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("COLUNAS: regiao_sigla, estado_sigla, municipio, produto, data_da_coleta, valor_de_venda, bandeira, regiao"));

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_mixed_case_product_never_reaches_engine() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let dataset = Dataset::load(&config.silver_path).unwrap();
    let engine = RecordingEngine {
        inner: PolarsSqlEngine::new(&dataset, config.table_name.clone()),
        executed: Mutex::new(Vec::new()),
    };
    let model = ScriptedModel::new(&[
        "Claro! Aqui está a consulta:\n```sql\nSELECT AVG(valor_de_venda) FROM combustiveis WHERE produto = 'Gasolina'\n```",
    ]);
    let assistant = SqlAssistant::new(&model, &engine, dataset.schema(), &config);

    let answer = assistant.answer("preço médio da gasolina").await;
    assert_eq!(answer, "5.5");

    let executed = engine.executed.lock().unwrap();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].contains("produto = 'GASOLINA'"));
    assert!(!executed[0].contains("'Gasolina'"));

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_fenced_product_and_year_filter_end_to_end() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let dataset = Dataset::load(&config.silver_path).unwrap();
    let engine = RecordingEngine {
        inner: PolarsSqlEngine::new(&dataset, config.table_name.clone()),
        executed: Mutex::new(Vec::new()),
    };
    let model = ScriptedModel::new(&[
        "```sql\nSELECT AVG(valor_de_venda) FROM combustiveis WHERE produto = 'Gasolina' AND EXTRACT(YEAR FROM data_da_coleta)=2014\n```",
    ]);
    let assistant = SqlAssistant::new(&model, &engine, dataset.schema(), &config);

    let answer = assistant.answer("preço da gasolina em 2014").await;
    assert_eq!(answer, "5.0");
    assert_eq!(model.prompt_count(), 1);

    let executed = engine.executed.lock().unwrap();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].contains("produto = 'GASOLINA'"));
    assert!(executed[0].contains("EXTRACT(YEAR FROM data_da_coleta)=2014"));

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_relative_date_floor_runs_on_engine() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let dataset = Dataset::load(&config.silver_path).unwrap();
    let engine = RecordingEngine {
        inner: PolarsSqlEngine::new(&dataset, config.table_name.clone()),
        executed: Mutex::new(Vec::new()),
    };
    let model = ScriptedModel::new(&[
        "SELECT COUNT(*) FROM combustiveis WHERE data_da_coleta >= DATE('now()', '-30 days')",
    ]);
    let assistant = SqlAssistant::new(&model, &engine, dataset.schema(), &config);

    let report = assistant.ask("quantas coletas nos últimos 30 dias?").await.unwrap();
    assert_eq!(report.repairs, 0);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0][0].to_string(), "1");
    assert!(report.sql.contains("data_da_coleta >= CAST('"));
    assert!(!report.sql.to_uppercase().contains("CURRENT_DATE"));
    assert_eq!(engine.executed.lock().unwrap().len(), 1);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_now_comparison_runs_on_engine() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let dataset = Dataset::load(&config.silver_path).unwrap();
    let engine = PolarsSqlEngine::new(&dataset, config.table_name.clone());
    let model = ScriptedModel::new(&["SELECT produto FROM combustiveis WHERE data_da_coleta > NOW()"]);
    let assistant = SqlAssistant::new(&model, &engine, dataset.schema(), &config);

    let report = assistant.ask("quais produtos têm coleta agendada?").await.unwrap();
    assert_eq!(report.repairs, 0);
    assert!(report.sql.contains("AS TIMESTAMP)"));
    assert_eq!(fuel_query::formatter::format_rows(&report.rows), "DIESEL");
    assert_eq!(model.prompt_count(), 1);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_unknown_column_is_repaired_once() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let dataset = Dataset::load(&config.silver_path).unwrap();
    let engine = RecordingEngine {
        inner: PolarsSqlEngine::new(&dataset, config.table_name.clone()),
        executed: Mutex::new(Vec::new()),
    };
    let model = ScriptedModel::new(&[
        "SELECT AVG(preco_venda) FROM combustiveis",
        "SELECT COUNT(*) FROM combustiveis WHERE estado_sigla = 'SP'",
    ]);
    let assistant = SqlAssistant::new(&model, &engine, dataset.schema(), &config);

    let report = assistant.ask("quantas coletas em SP?").await.unwrap();
    assert_eq!(report.repairs, 1);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(model.prompt_count(), 2);
    assert_eq!(engine.executed.lock().unwrap().len(), 2);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_failed_repair_stops_after_one_attempt() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let dataset = Dataset::load(&config.silver_path).unwrap();
    let engine = RecordingEngine {
        inner: PolarsSqlEngine::new(&dataset, config.table_name.clone()),
        executed: Mutex::new(Vec::new()),
    };
    let model = ScriptedModel::new(&[
        "SELECT AVG(preco_venda) FROM combustiveis",
        "SELECT AVG(preco_de_venda) FROM combustiveis",
        "SELECT AVG(valor_de_venda) FROM combustiveis",
    ]);
    let assistant = SqlAssistant::new(&model, &engine, dataset.schema(), &config);

    let answer = assistant.answer("preço médio").await;
    assert!(answer.starts_with("Falha na correção:"), "{}", answer);
    assert_eq!(model.prompt_count(), 2);
    assert_eq!(engine.executed.lock().unwrap().len(), 2);

    std::fs::remove_dir_all(&root).ok();
}

struct DeadService {
    calls: AtomicU32,
}

#[async_trait]
impl ModelService for DeadService {
    async fn list_models(&self) -> Result<Vec<InstalledModel>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AssistantError::ModelUnavailable("connection refused".to_string()))
    }
}

struct ReadyService;

#[async_trait]
impl ModelService for ReadyService {
    async fn list_models(&self) -> Result<Vec<InstalledModel>> {
        Ok(vec![InstalledModel { name: "phi3:latest".to_string(), size: Some(2_300_000_000) }])
    }
}

#[tokio::test]
async fn test_unready_model_aborts_before_dataset_load() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let service = DeadService { calls: AtomicU32::new(0) };
    let loaded = AtomicBool::new(false);

    let result = session::start_session(&service, &config, |config| {
        loaded.store(true, Ordering::SeqCst);
        Dataset::load(&config.silver_path)
    })
    .await;

    assert!(matches!(result, Err(AssistantError::ModelUnavailable(_))));
    assert_eq!(service.calls.load(Ordering::SeqCst), config.readiness.retries);
    assert!(!loaded.load(Ordering::SeqCst));

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_ready_model_loads_dataset() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);

    let start = session::start_session(&ReadyService, &config, session::load_configured_dataset)
        .await
        .unwrap();
    assert_eq!(start.models.len(), 1);
    assert_eq!(start.dataset.height(), 3);
    assert!(start.dataset.schema().contains("valor_de_venda"));

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_repl_answers_until_exit_token() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let dataset = Dataset::load(&config.silver_path).unwrap();
    let engine = PolarsSqlEngine::new(&dataset, config.table_name.clone());
    let model = ScriptedModel::new(&["SELECT MAX(valor_de_venda) FROM combustiveis"]);
    let assistant = SqlAssistant::new(&model, &engine, dataset.schema(), &config);

    let input: &[u8] = b"\n   \nqual o maior preco?\nSAIR\nnunca lida\n";
    let mut out = Vec::new();
    let answered = repl::run(input, &mut out, &assistant).await.unwrap();

    assert_eq!(answered, 1);
    assert_eq!(model.prompt_count(), 1);
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("resposta: 6.0"), "{}", printed);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_repl_survives_model_errors() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let dataset = Dataset::load(&config.silver_path).unwrap();
    let engine = PolarsSqlEngine::new(&dataset, config.table_name.clone());
    // no scripted responses: every model call fails
    let model = ScriptedModel::new(&[]);
    let assistant = SqlAssistant::new(&model, &engine, dataset.schema(), &config);

    let input: &[u8] = b"primeira pergunta\nsegunda pergunta\n";
    let mut out = Vec::new();
    let answered = repl::run(input, &mut out, &assistant).await.unwrap();

    assert_eq!(answered, 2);
    let printed = String::from_utf8(out).unwrap();
    assert_eq!(printed.matches("Erro no processamento").count(), 2);

    std::fs::remove_dir_all(&root).ok();
}

/// Input that fails on every read
struct BrokenInput;

impl AsyncRead for BrokenInput {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin closed")))
    }
}

#[tokio::test]
async fn test_repl_stops_on_persistent_read_errors() {
    let (root, path) = create_silver_file();
    let config = config_for(&path);
    let dataset = Dataset::load(&config.silver_path).unwrap();
    let engine = PolarsSqlEngine::new(&dataset, config.table_name.clone());
    let model = ScriptedModel::new(&[]);
    let assistant = SqlAssistant::new(&model, &engine, dataset.schema(), &config);

    let mut out = Vec::new();
    let answered = repl::run(BufReader::new(BrokenInput), &mut out, &assistant).await.unwrap();

    assert_eq!(answered, 0);
    assert_eq!(model.prompt_count(), 0);
    let printed = String::from_utf8(out).unwrap();
    assert_eq!(printed.matches("Erro inesperado").count(), repl::MAX_READ_ERRORS as usize);

    std::fs::remove_dir_all(&root).ok();
}
