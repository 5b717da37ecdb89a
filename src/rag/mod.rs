//! Retrieval Augmented Generation (RAG) components.
//!
//! The retrieval side of the chatbot:
//!
//! 1. [`corpus`] - the FAQ knowledge base and seeding
//! 2. [`embeddings`] - multi-provider embedding fallback chain
//! 3. [`search`] - brute-force cosine similarity over stored vectors
//! 4. [`context`] - composes retrieved entries into prompt context,
//!    degrading to empty on any failure

pub mod context;
pub mod corpus;
pub mod embeddings;
pub mod search;

pub use context::ContextBuilder;
pub use corpus::{seed_corpus, FAQ_ENTRIES};
pub use embeddings::{EmbeddingChain, EmbeddingProvider};
pub use search::{cosine_similarity, search, SearchHit};
