//! Session Startup
//!
//! Readiness probe first, dataset second. If the model service never becomes
//! ready the dataset is never touched.

use crate::config::AppConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::llm::{wait_until_ready, InstalledModel, ModelService};
use tracing::{info, warn};

pub struct SessionStart {
    pub models: Vec<InstalledModel>,
    pub dataset: Dataset,
}

/// Probe the model service, then load the dataset with `load`.
pub async fn start_session<S, F>(service: &S, config: &AppConfig, load: F) -> Result<SessionStart>
where
    S: ModelService + ?Sized,
    F: FnOnce(&AppConfig) -> Result<Dataset>,
{
    println!("Conectando ao Ollama");
    let models = wait_until_ready(service, &config.readiness).await?;

    println!("Modelos disponíveis:");
    for model in &models {
        println!("   - {}", model.name);
    }

    let wanted = &config.model.model;
    let installed = models
        .iter()
        .any(|m| m.name == *wanted || m.name.split(':').next() == Some(wanted.as_str()));
    if !installed {
        warn!("Configured model '{}' is not in the installed list", wanted);
    }
    println!("Usando modelo: {}", wanted);

    println!("Carregando dados para o modelo");
    let dataset = load(config)?;
    info!("Session ready: {} rows, {} columns", dataset.height(), dataset.schema().columns().len());
    println!("Dados carregados");

    Ok(SessionStart { models, dataset })
}

/// Default loader: the silver dataset named in the configuration
pub fn load_configured_dataset(config: &AppConfig) -> Result<Dataset> {
    Dataset::load(&config.silver_path)
}
