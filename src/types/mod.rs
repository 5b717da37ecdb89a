//! Core types shared across the Portico server: chat messages, FAQ
//! metadata, embeddings, sessions, and the error taxonomy.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============= Chat Types =============

/// A single conversation turn with flattened text content.
///
/// Invariant: `content` is always a flat string. Raw history entries with
/// structured content are collapsed by [`crate::llm::messages::normalize`]
/// before they ever become a `ChatMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Wire name of the role as used by the OpenAI-compatible providers.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

// ============= Session Types =============

/// A message as persisted in the session store, with its arrival time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    pub fn now(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

impl From<&StoredMessage> for ChatMessage {
    fn from(stored: &StoredMessage) -> Self {
        ChatMessage {
            role: stored.role,
            content: stored.content.clone(),
        }
    }
}

/// A visitor conversation identified by a cookie-carried session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub messages: Vec<StoredMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, message: StoredMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }
}

// ============= RAG Types =============

/// Question/answer pair attached to a stored FAQ vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqMetadata {
    pub question: String,
    pub answer: String,
}

/// An embedding vector tagged with the provider that produced it.
///
/// Embeddings from different providers have different dimensionality and
/// semantics and are not mutually comparable; the provider tag lets the
/// search engine refuse cross-provider comparisons instead of silently
/// producing meaningless scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub provider: String,
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(provider: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            provider: provider.into(),
            values,
        }
    }
}

// ============= Error Types =============

/// Application-level errors surfaced to callers and HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Llm(msg) | AppError::Embedding(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Config(msg)
            | AppError::VectorStore(msg)
            | AppError::Session(msg)
            | AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// ============= Provider Error Classification =============

/// Failure classification for a single external provider call.
///
/// Both fallback chains (LLM and embedding) route on this classification
/// uniformly instead of inspecting raw errors per provider:
/// - [`RateLimited`](ProviderError::RateLimited) aborts the provider
///   immediately (no retry) and advances the chain.
/// - [`Unavailable`](ProviderError::Unavailable) is retried with backoff a
///   small fixed number of times before the chain advances.
/// - [`Gone`](ProviderError::Gone) marks a deprecated/unreachable endpoint;
///   providers with an alternate endpoint shape fall back to it internally.
/// - [`Other`](ProviderError::Other) advances the chain without retry.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("endpoint gone: {0}")]
    Gone(String),

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Classify an HTTP error response by status code and body text.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let lower = body.to_lowercase();
        if status == StatusCode::TOO_MANY_REQUESTS
            || lower.contains("quota")
            || lower.contains("too many requests")
            || lower.contains("rate limit")
        {
            return ProviderError::RateLimited(format!("{status}: {body}"));
        }
        if status == StatusCode::SERVICE_UNAVAILABLE || lower.contains("loading") {
            return ProviderError::Unavailable(format!("{status}: {body}"));
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return ProviderError::Gone(format!("{status}: {body}"));
        }
        ProviderError::Other(format!("{status}: {body}"))
    }

    /// Wrap a transport-level failure (connect, timeout, body read).
    pub fn transport(err: reqwest::Error) -> Self {
        ProviderError::Other(format!("transport error: {err}"))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_))
    }
}
