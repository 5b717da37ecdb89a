//! In-memory store implementations.
//!
//! Ephemeral backends for local development and testing. Vector records
//! keep insertion order so that equal-similarity search results are
//! deterministic.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{SessionStore, VectorRecord, VectorStore};
use crate::types::{AppError, Embedding, FaqMetadata, Result, Session};

/// Ephemeral vector store backed by an insertion-ordered `Vec`.
#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record without serialization. Lets tests and migration
    /// tooling plant records with arbitrary (including malformed) payloads.
    pub fn insert_raw(&self, record: VectorRecord) {
        let mut records = self.records.write();
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else {
            records.push(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn list_all(&self) -> Result<Vec<VectorRecord>> {
        Ok(self.records.read().clone())
    }

    async fn put(&self, id: &str, embedding: &Embedding, metadata: &FaqMetadata) -> Result<()> {
        let vector = serde_json::to_string(&embedding.values)
            .map_err(|e| AppError::VectorStore(format!("failed to encode vector: {e}")))?;
        let metadata = serde_json::to_string(metadata)
            .map_err(|e| AppError::VectorStore(format!("failed to encode metadata: {e}")))?;
        self.insert_raw(VectorRecord {
            id: id.to_string(),
            provider: embedding.provider.clone(),
            vector,
            metadata,
        });
        Ok(())
    }
}

/// Ephemeral session store with TTL-based expiry.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

struct Entry {
    session: Session,
    expires_at: DateTime<Utc>,
}

impl InMemorySessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str) -> Result<Option<Session>> {
        let now = Utc::now();
        let sessions = self.sessions.read();
        Ok(sessions
            .get(id)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.session.clone()))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write();
        sessions.insert(
            session.id.clone(),
            Entry {
                session: session.clone(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.write().remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoredMessage;

    #[tokio::test]
    async fn put_then_list_roundtrip() {
        let store = InMemoryVectorStore::new();
        let embedding = Embedding::new("gemini", vec![0.1, 0.2, 0.3]);
        let metadata = FaqMetadata {
            question: "Where?".to_string(),
            answer: "Frankfurt".to_string(),
        };

        store.put("faq-1", &embedding, &metadata).await.unwrap();

        let records = store.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "faq-1");
        assert_eq!(records[0].provider, "gemini");

        let vector: Vec<f32> = serde_json::from_str(&records[0].vector).unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        let parsed: FaqMetadata = serde_json::from_str(&records[0].metadata).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[tokio::test]
    async fn put_replaces_existing_id() {
        let store = InMemoryVectorStore::new();
        let metadata = FaqMetadata {
            question: "q".to_string(),
            answer: "a".to_string(),
        };

        store
            .put("faq-1", &Embedding::new("gemini", vec![1.0]), &metadata)
            .await
            .unwrap();
        store
            .put("faq-1", &Embedding::new("openai", vec![2.0]), &metadata)
            .await
            .unwrap();

        let records = store.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].provider, "openai");
    }

    #[tokio::test]
    async fn session_roundtrip_and_delete() {
        let store = InMemorySessionStore::new(60);
        let mut session = Session::new("sess-1");
        session.push(StoredMessage::now(crate::types::MessageRole::User, "hi"));

        store.save(&session).await.unwrap();
        let loaded = store.get("sess-1").await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);

        store.delete("sess-1").await.unwrap();
        assert!(store.get("sess-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_is_absent() {
        let store = InMemorySessionStore::new(0);
        let session = Session::new("sess-2");
        store.save(&session).await.unwrap();
        assert!(store.get("sess-2").await.unwrap().is_none());
    }
}
