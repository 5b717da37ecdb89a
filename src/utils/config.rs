//! Environment-driven configuration.
//!
//! All provider credentials and endpoints are resolved once at startup into
//! an explicit [`AppConfig`] that is passed into the chain constructors.
//! Nothing downstream reads the process environment at call time, so the
//! fallback order and the set of enabled providers are fixed for the
//! lifetime of the process.

use serde::Deserialize;
use std::env;

use crate::types::{AppError, Result};

/// Root configuration assembled from the environment (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub rag: RagConfig,
    pub llm: LlmConfig,
    pub providers: ProviderSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Cookie name carrying the session id.
    pub cookie_name: String,
    /// Session time-to-live in seconds (default 30 days).
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    /// Number of highest-scoring FAQ entries injected as context.
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Gemini model variants in preference order (cheaper/faster first).
    pub gemini_models: Vec<String>,
    /// OpenRouter model variants in preference order.
    pub openrouter_models: Vec<String>,
    pub temperature: f32,
}

/// One external provider endpoint with its credential.
///
/// `enabled` is derived from credential presence; disabled providers are
/// left out of the chains entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEndpoint {
    pub endpoint: String,
    pub api_key: String,
    pub enabled: bool,
}

impl ProviderEndpoint {
    fn from_env(key_var: &str, endpoint_var: &str, default_endpoint: &str) -> Self {
        let api_key = env::var(key_var).unwrap_or_default();
        let endpoint =
            env::var(endpoint_var).unwrap_or_else(|_| default_endpoint.to_string());
        let enabled = !api_key.is_empty();
        Self {
            endpoint,
            api_key,
            enabled,
        }
    }
}

/// Per-provider endpoints plus the attribution headers OpenRouter expects.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub gemini: ProviderEndpoint,
    pub huggingface: ProviderEndpoint,
    pub openrouter: ProviderEndpoint,
    pub openai: ProviderEndpoint,
    /// Sent as `HTTP-Referer` to OpenRouter.
    pub referer: String,
    /// Sent as `X-Title` to OpenRouter.
    pub app_title: String,
}

fn parse_models(var: &str, defaults: &[&str]) -> Vec<String> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect(),
        _ => defaults.iter().map(|m| m.to_string()).collect(),
    }
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a numeric variable fails to parse. Missing
    /// provider credentials are not an error; the provider is disabled.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("invalid PORT: {e}")))?;

        let ttl_seconds = env::var("SESSION_TTL")
            .unwrap_or_else(|_| "2592000".to_string())
            .parse::<u64>()
            .map_err(|e| AppError::Config(format!("invalid SESSION_TTL: {e}")))?;

        let top_k = env::var("RAG_TOP_K")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<usize>()
            .map_err(|e| AppError::Config(format!("invalid RAG_TOP_K: {e}")))?;

        Ok(AppConfig {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port,
            },
            session: SessionConfig {
                cookie_name: env::var("SESSION_COOKIE")
                    .unwrap_or_else(|_| "chatbot_session".to_string()),
                ttl_seconds,
            },
            rag: RagConfig { top_k },
            llm: LlmConfig {
                gemini_models: parse_models(
                    "GEMINI_MODELS",
                    &["gemini-1.5-flash", "gemini-1.5-pro"],
                ),
                openrouter_models: parse_models("OPENROUTER_MODELS", &["openai/gpt-4o-mini"]),
                temperature: 0.7,
            },
            providers: ProviderSettings {
                gemini: ProviderEndpoint::from_env(
                    "GOOGLE_GEMINI_API_KEY",
                    "GEMINI_ENDPOINT",
                    "https://generativelanguage.googleapis.com",
                ),
                huggingface: ProviderEndpoint::from_env(
                    "HUGGING_FACE_API_KEY",
                    "HUGGING_FACE_ENDPOINT",
                    "https://api-inference.huggingface.co",
                ),
                openrouter: ProviderEndpoint::from_env(
                    "OPENROUTER_API_KEY",
                    "OPENROUTER_ENDPOINT",
                    "https://openrouter.ai/api/v1",
                ),
                openai: ProviderEndpoint::from_env(
                    "OPENAI_API_KEY",
                    "OPENAI_ENDPOINT",
                    "https://api.openai.com/v1",
                ),
                referer: env::var("CHATBOT_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                app_title: env::var("CHATBOT_TITLE")
                    .unwrap_or_else(|_| "Portfolio Chatbot".to_string()),
            },
        })
    }
}
