use crate::config::{ModelSettings, ReadinessPolicy};
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Given prompt text, return response text, or fail.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String>;
}

/// Listing side of the model service, used by the readiness probe
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn list_models(&self) -> Result<Vec<InstalledModel>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledModel {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<InstalledModel>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_thread: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP client for a local Ollama server
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    settings: ModelSettings,
}

impl OllamaClient {
    pub fn new(settings: ModelSettings) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { http, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }
}

#[async_trait]
impl ModelService for OllamaClient {
    async fn list_models(&self) -> Result<Vec<InstalledModel>> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.settings.base_url))
            .send()
            .await
            .map_err(|e| AssistantError::ModelUnavailable(format!("Ollama not reachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AssistantError::ModelUnavailable(format!(
                "Ollama answered {} on /api/tags",
                response.status()
            )));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.settings.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.settings.temperature,
                num_thread: self.settings.num_thread,
            },
        };

        debug!("Calling {} with a {} byte prompt", self.settings.model, prompt.len());
        let response = self
            .http
            .post(format!("{}/api/generate", self.settings.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AssistantError::Llm(format!("LLM API returned {}: {}", status, text)));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        Ok(generated.response)
    }
}

/// Poll the model listing until it answers, with fixed retries and backoff.
///
/// Returns the installed models. An empty listing counts as unavailable.
pub async fn wait_until_ready<S>(service: &S, policy: &ReadinessPolicy) -> Result<Vec<InstalledModel>>
where
    S: ModelService + ?Sized,
{
    let attempts = policy.retries.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match service.list_models().await {
            Ok(models) if models.is_empty() => {
                return Err(AssistantError::ModelUnavailable("no models installed".to_string()));
            }
            Ok(models) => {
                info!("Model service ready after {} attempt(s)", attempt);
                return Ok(models);
            }
            Err(e) => {
                warn!("Model service not ready (attempt {}/{}): {}", attempt, attempts, e);
                last_error = Some(e);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    Err(AssistantError::ModelUnavailable(format!(
        "no answer after {} attempt(s): {}",
        attempts,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}
