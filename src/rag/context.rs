//! Retrieval composition: free-text query in, formatted FAQ context out.
//!
//! This is the one component that must never fail. Missing context degrades
//! the answer into an ungrounded one; it must not block the conversation.

use std::sync::Arc;
use tracing::warn;

use super::embeddings::EmbeddingChain;
use super::search::search;
use crate::store::VectorStore;

/// Builds the `Q:`/`A:` context block injected into the system prompt.
pub struct ContextBuilder {
    embeddings: Arc<EmbeddingChain>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl ContextBuilder {
    pub fn new(embeddings: Arc<EmbeddingChain>, store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self {
            embeddings,
            store,
            top_k,
        }
    }

    /// Retrieve and format context for a query.
    ///
    /// Swallows every retrieval failure into the empty string: an embedding
    /// outage or a store error is logged and the chat proceeds ungrounded.
    pub async fn build_context(&self, query: &str) -> String {
        let embedding = match self.embeddings.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "query embedding failed, answering without context");
                return String::new();
            }
        };

        let hits = match search(self.store.as_ref(), &embedding, self.top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "vector search failed, answering without context");
                return String::new();
            }
        };

        hits.iter()
            .map(|hit| format!("Q: {}\nA: {}", hit.metadata.question, hit.metadata.answer))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryVectorStore;
    use crate::types::{Embedding, FaqMetadata};

    #[tokio::test]
    async fn failing_embedding_degrades_to_empty_context() {
        // a chain with no providers fails every embed call
        let builder = ContextBuilder::new(
            Arc::new(EmbeddingChain::new(Vec::new())),
            Arc::new(InMemoryVectorStore::new()),
            3,
        );
        assert_eq!(builder.build_context("anything").await, "");
    }

    #[tokio::test]
    async fn hits_format_as_question_answer_blocks() {
        use crate::rag::embeddings::EmbeddingProvider;
        use crate::types::ProviderError;

        struct FixedEmbedder;

        #[async_trait::async_trait]
        impl EmbeddingProvider for FixedEmbedder {
            fn name(&self) -> &str {
                "gemini"
            }
            async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
                Ok(vec![1.0, 0.0])
            }
        }

        let store = Arc::new(InMemoryVectorStore::new());
        store
            .put(
                "faq-1",
                &Embedding::new("gemini", vec![1.0, 0.0]),
                &FaqMetadata {
                    question: "Where is Arnob located?".to_string(),
                    answer: "Frankfurt, Germany.".to_string(),
                },
            )
            .await
            .unwrap();
        store
            .put(
                "faq-2",
                &Embedding::new("gemini", vec![0.9, 0.436]),
                &FaqMetadata {
                    question: "What does Arnob do?".to_string(),
                    answer: "Full-stack development.".to_string(),
                },
            )
            .await
            .unwrap();

        let chain = EmbeddingChain::new(vec![Arc::new(FixedEmbedder)]);
        let builder = ContextBuilder::new(Arc::new(chain), store, 3);

        let context = builder.build_context("where is he?").await;
        let blocks: Vec<&str> = context.split("\n\n").collect();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "Q: Where is Arnob located?\nA: Frankfurt, Germany.");
        assert!(blocks[1].starts_with("Q: What does Arnob do?"));
    }

    #[tokio::test]
    async fn empty_corpus_yields_empty_context() {
        use crate::rag::embeddings::EmbeddingProvider;
        use crate::types::ProviderError;

        struct FixedEmbedder;

        #[async_trait::async_trait]
        impl EmbeddingProvider for FixedEmbedder {
            fn name(&self) -> &str {
                "gemini"
            }
            async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
                Ok(vec![1.0, 0.0])
            }
        }

        let chain = EmbeddingChain::new(vec![Arc::new(FixedEmbedder)]);
        let builder = ContextBuilder::new(Arc::new(chain), Arc::new(InMemoryVectorStore::new()), 3);
        assert_eq!(builder.build_context("anything").await, "");
    }
}
