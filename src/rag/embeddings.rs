//! Embedding provider fallback chain.
//!
//! Turns text into vectors by trying providers in priority order: Gemini,
//! Hugging Face, OpenRouter, then OpenAI. Each provider returns its vector
//! in a different envelope (keyed object, nested array, flat array); the
//! providers normalize those shapes so the chain always hands back a flat
//! `Vec<f32>` tagged with the provider that produced it.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{AppError, Embedding, ProviderError, Result};
use crate::utils::config::{AppConfig, ProviderEndpoint};

/// Attempts per provider for retryable ("model loading") failures.
const MAX_ATTEMPTS: usize = 2;
/// Base backoff between retry attempts; grows linearly with the attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(2000);

/// Batch size for corpus seeding.
const BATCH_SIZE: usize = 5;
/// Stagger between requests inside one batch (index multiples).
const BATCH_STAGGER: Duration = Duration::from_millis(200);
/// Pause between batches.
const BATCH_PAUSE: Duration = Duration::from_millis(1000);

/// One embedding backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;
}

/// Ordered fallback chain over embedding providers.
pub struct EmbeddingChain {
    providers: Vec<Arc<dyn EmbeddingProvider>>,
}

impl EmbeddingChain {
    pub fn new(providers: Vec<Arc<dyn EmbeddingProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain from configuration. Disabled providers are left out;
    /// OpenAI participates only when a credential is configured.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut providers: Vec<Arc<dyn EmbeddingProvider>> = Vec::new();

        if config.providers.gemini.enabled {
            providers.push(Arc::new(GeminiEmbedding::new(&config.providers.gemini)));
        }
        if config.providers.huggingface.enabled {
            providers.push(Arc::new(HuggingFaceEmbedding::new(
                &config.providers.huggingface,
            )));
        }
        if config.providers.openrouter.enabled {
            providers.push(Arc::new(
                OpenAiCompatEmbedding::new(
                    "openrouter",
                    &config.providers.openrouter,
                    "openai/text-embedding-ada-002",
                )
                .with_attribution(&config.providers.referer, &config.providers.app_title),
            ));
        }
        if config.providers.openai.enabled {
            providers.push(Arc::new(OpenAiCompatEmbedding::new(
                "openai",
                &config.providers.openai,
                "text-embedding-ada-002",
            )));
        }

        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Embed a single text, first-success-wins.
    ///
    /// Retryable failures are retried with backoff up to [`MAX_ATTEMPTS`]
    /// before the chain advances; rate-limit signals advance immediately.
    ///
    /// # Errors
    ///
    /// Fails only after every provider is exhausted, carrying the last
    /// provider error.
    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut last_error: Option<ProviderError> = None;

        for provider in &self.providers {
            let mut attempt = 1;
            loop {
                match provider.embed(text).await {
                    Ok(values) => {
                        debug!(provider = provider.name(), dims = values.len(), "embedded text");
                        return Ok(Embedding::new(provider.name(), values));
                    }
                    Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                        let delay = RETRY_BACKOFF * attempt as u32;
                        warn!(
                            provider = provider.name(),
                            attempt,
                            error = %e,
                            "embedding provider unavailable, retrying after backoff"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(e) => {
                        warn!(
                            provider = provider.name(),
                            error = %e,
                            "embedding provider failed, trying next"
                        );
                        last_error = Some(e);
                        break;
                    }
                }
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no embedding providers configured".to_string());
        Err(AppError::Embedding(format!(
            "all embedding providers failed: {detail}"
        )))
    }

    /// Embed many texts for corpus seeding.
    ///
    /// Texts are processed in fixed-size batches; requests inside a batch
    /// run concurrently with a small per-index stagger and batches are
    /// separated by a pause, keeping provider rate limits happy.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        let batches = texts.chunks(BATCH_SIZE).count();

        for (batch_index, batch) in texts.chunks(BATCH_SIZE).enumerate() {
            let staggered = batch.iter().enumerate().map(|(i, text)| async move {
                tokio::time::sleep(BATCH_STAGGER * i as u32).await;
                self.embed(text).await
            });
            embeddings.extend(try_join_all(staggered).await?);

            if batch_index + 1 < batches {
                tokio::time::sleep(BATCH_PAUSE).await;
            }
        }

        Ok(embeddings)
    }
}

// ============= Gemini =============

/// Gemini `embedContent` provider.
///
/// Requests 768-dimensional vectors optimized for document retrieval. At
/// non-native dimensionality Gemini's output is not unit-norm, so the
/// vector is normalized here before anyone compares it by cosine.
pub struct GeminiEmbedding {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiEmbedding {
    const MODEL: &'static str = "gemini-embedding-001";
    const DIMENSIONS: u32 = 768;

    pub fn new(endpoint: &ProviderEndpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.endpoint.trim_end_matches('/').to_string(),
            api_key: endpoint.api_key.clone(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedding {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent?key={}",
            self.endpoint,
            Self::MODEL,
            self.api_key
        );
        let body = json!({
            "model": format!("models/{}", Self::MODEL),
            "content": { "parts": [{ "text": text }] },
            "taskType": "RETRIEVAL_DOCUMENT",
            "outputDimensionality": Self::DIMENSIONS,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ProviderError::from_response(status, &text));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("malformed Gemini embedding: {e}")))?;
        let values = parsed
            .pointer("/embedding/values")
            .and_then(flatten_embedding)
            .ok_or_else(|| {
                ProviderError::Other("Gemini response missing embedding values".to_string())
            })?;

        Ok(unit_normalize(values))
    }
}

// ============= Hugging Face =============

/// Hugging Face inference API provider.
///
/// The `pipeline/feature-extraction` endpoint shape has been retired and
/// resurrected more than once, so a deprecated/unreachable signal on the
/// primary URL falls back to the `models/` shape before the provider gives
/// up. Responses arrive as a flat array, a nested array, or a keyed object
/// depending on the deployment.
pub struct HuggingFaceEmbedding {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HuggingFaceEmbedding {
    const MODEL: &'static str = "sentence-transformers/all-MiniLM-L6-v2";

    pub fn new(endpoint: &ProviderEndpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.endpoint.trim_end_matches('/').to_string(),
            api_key: endpoint.api_key.clone(),
        }
    }

    async fn call(&self, url: &str, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "inputs": text }))
            .send()
            .await
            .map_err(ProviderError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ProviderError::from_response(status, &body));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("malformed Hugging Face response: {e}")))?;
        flatten_embedding(&parsed).ok_or_else(|| {
            ProviderError::Other("unrecognized Hugging Face embedding envelope".to_string())
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedding {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let primary = format!(
            "{}/pipeline/feature-extraction/{}",
            self.endpoint,
            Self::MODEL
        );
        match self.call(&primary, text).await {
            Ok(values) => Ok(values),
            Err(ProviderError::Gone(detail)) | Err(ProviderError::Unavailable(detail)) => {
                debug!(
                    %detail,
                    "primary Hugging Face endpoint unusable, trying models/ shape"
                );
                let alternate = format!("{}/models/{}", self.endpoint, Self::MODEL);
                self.call(&alternate, text).await
            }
            Err(e) => Err(e),
        }
    }
}

// ============= OpenAI-compatible =============

/// OpenAI-wire embeddings, used for both OpenRouter and direct OpenAI.
pub struct OpenAiCompatEmbedding {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    headers: Vec<(String, String)>,
}

impl OpenAiCompatEmbedding {
    pub fn new(name: impl Into<String>, endpoint: &ProviderEndpoint, model: &str) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            endpoint: endpoint.endpoint.trim_end_matches('/').to_string(),
            api_key: endpoint.api_key.clone(),
            model: model.to_string(),
            headers: Vec::new(),
        }
    }

    /// Attach OpenRouter's attribution headers.
    pub fn with_attribution(mut self, referer: &str, title: &str) -> Self {
        self.headers
            .push(("HTTP-Referer".to_string(), referer.to_string()));
        self.headers.push(("X-Title".to_string(), title.to_string()));
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatEmbedding {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let mut request = self
            .client
            .post(format!("{}/embeddings", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": text }));
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(ProviderError::transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ProviderError::from_response(status, &body));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("malformed embeddings response: {e}")))?;
        parsed
            .pointer("/data/0/embedding")
            .and_then(flatten_embedding)
            .ok_or_else(|| {
                ProviderError::Other("embeddings response missing data[0].embedding".to_string())
            })
    }
}

// ============= Envelope Normalization =============

/// Collapse any known embedding envelope into a flat numeric vector.
///
/// Accepts a flat array of numbers, a nested array (first row taken), or a
/// keyed object carrying `embeddings`/`values`.
fn flatten_embedding(value: &Value) -> Option<Vec<f32>> {
    match value {
        Value::Array(items) => match items.first() {
            Some(Value::Array(_)) => flatten_embedding(items.first()?),
            _ => items
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32))
                .collect(),
        },
        Value::Object(fields) => fields
            .get("embeddings")
            .or_else(|| fields.get("values"))
            .and_then(flatten_embedding),
        _ => None,
    }
}

/// Scale a vector to unit length. Zero vectors pass through untouched.
fn unit_normalize(values: Vec<f32>) -> Vec<f32> {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return values;
    }
    values.into_iter().map(|v| v / norm).collect()
}
