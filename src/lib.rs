//! # Portico - portfolio chatbot backend
//!
//! A self-hosted RAG chatbot backend for a personal portfolio site. A fixed
//! FAQ corpus is embedded into vectors, visitor questions are matched via
//! in-memory cosine similarity search, and the matched context is injected
//! into a prompt sent through a multi-provider LLM fallback chain, with the
//! reply streamed back to the widget over SSE.
//!
//! ## Overview
//!
//! Portico can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `portico-server` binary
//! 2. **As a library** - Wire the chains and stores into your own service
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use portico::{AppConfig, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let state = AppState::from_config(config);
//!
//!     // Seed the FAQ corpus, then answer a question with context
//!     portico::rag::seed_corpus(&state.embeddings, state.vectors.as_ref()).await?;
//!     let context = state.retriever.build_context("Where is Arnob located?").await;
//!     let reply = state
//!         .chat
//!         .respond_text(
//!             &[portico::types::ChatMessage::user("Where is Arnob located?")],
//!             Some(&context),
//!         )
//!         .await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Providers are tried strictly in configuration order and never in
//! parallel, keeping fallback deterministic and avoiding duplicate billing.
//! Every provider's native response shape (streamed or complete) is coerced
//! into one [`ProviderReply`](llm::ProviderReply) contract before it
//! reaches a caller.

/// HTTP API handlers and routes.
pub mod api;
/// LLM provider clients and the response fallback chain.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Vector and session storage abstractions.
pub mod store;
/// Core types (messages, sessions, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use llm::{ChatChain, ProviderReply, RawHistoryEntry};
pub use rag::{ContextBuilder, EmbeddingChain};
pub use types::{AppError, Result};
pub use utils::config::AppConfig;

use std::sync::Arc;
use store::{InMemorySessionStore, InMemoryVectorStore, SessionStore, VectorStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Resolved startup configuration.
    pub config: Arc<AppConfig>,
    /// LLM fallback chain.
    pub chat: Arc<ChatChain>,
    /// Embedding fallback chain.
    pub embeddings: Arc<EmbeddingChain>,
    /// Retrieval composer over the embedding chain and vector store.
    pub retriever: Arc<ContextBuilder>,
    /// FAQ vector store.
    pub vectors: Arc<dyn VectorStore>,
    /// Visitor session store.
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Wire the chains and in-memory stores from configuration.
    pub fn from_config(config: AppConfig) -> Self {
        let vectors: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let sessions: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::new(config.session.ttl_seconds));

        let embeddings = Arc::new(EmbeddingChain::from_config(&config));
        let retriever = Arc::new(ContextBuilder::new(
            Arc::clone(&embeddings),
            Arc::clone(&vectors),
            config.rag.top_k,
        ));
        let chat = Arc::new(ChatChain::from_config(&config));

        Self {
            config: Arc::new(config),
            chat,
            embeddings,
            retriever,
            vectors,
            sessions,
        }
    }
}
