//! Storage abstraction traits.
//!
//! Two small traits decouple the core from its persistence collaborators:
//! [`VectorStore`] holds the embedded FAQ corpus, [`SessionStore`] holds
//! visitor conversations with expiry. The bundled implementations are
//! in-memory; swapping in a networked key-value store only requires
//! implementing these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Embedding, FaqMetadata, Result, Session};

pub mod memory;

pub use memory::{InMemorySessionStore, InMemoryVectorStore};

/// A stored FAQ vector as raw serialized payloads.
///
/// Vector and metadata are kept as JSON strings, the way a key-value store
/// hands them back. Parsing happens at scan time so that one corrupt record
/// can be skipped without failing the whole search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    /// Name of the embedding provider that produced the vector.
    pub provider: String,
    /// JSON-encoded `Vec<f32>`.
    pub vector: String,
    /// JSON-encoded [`FaqMetadata`].
    pub metadata: String,
}

/// Read/write access to the embedded FAQ corpus.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return every stored record. The corpus is tens of entries, so the
    /// search engine scans the full list.
    async fn list_all(&self) -> Result<Vec<VectorRecord>>;

    /// Insert or replace a record. Used only by corpus seeding.
    async fn put(&self, id: &str, embedding: &Embedding, metadata: &FaqMetadata) -> Result<()>;
}

/// Conversation persistence keyed by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Session>>;

    async fn save(&self, session: &Session) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;
}
