//! Cosine similarity search over the stored FAQ corpus.
//!
//! An exhaustive linear scan, not an index: the corpus is tens of entries,
//! so brute force is simpler and fast enough. Anyone lifting this onto a
//! corpus of thousands of records should move to a real vector index
//! instead of widening this scan.

use tracing::warn;

use crate::store::VectorStore;
use crate::types::{Embedding, FaqMetadata, Result};

/// One scored retrieval result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub similarity: f32,
    pub metadata: FaqMetadata,
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 on length mismatch or zero magnitude instead of erroring;
/// cross-provider embeddings have different dimensionality and must never
/// abort a scan.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Scan the whole store and return the `top_k` highest-scoring records in
/// descending similarity order (ties keep store order).
///
/// Records that fail to parse are skipped with a warning; records embedded
/// by a different provider than the query are skipped too, because their
/// scores would be meaningless rather than merely low.
pub async fn search(
    store: &dyn VectorStore,
    query: &Embedding,
    top_k: usize,
) -> Result<Vec<SearchHit>> {
    let records = store.list_all().await?;
    let mut hits: Vec<SearchHit> = Vec::with_capacity(records.len());

    for record in &records {
        if record.provider != query.provider {
            warn!(
                id = %record.id,
                stored = %record.provider,
                query = %query.provider,
                "skipping record embedded by a different provider"
            );
            continue;
        }

        let vector: Vec<f32> = match serde_json::from_str(&record.vector) {
            Ok(vector) => vector,
            Err(e) => {
                warn!(id = %record.id, error = %e, "skipping record with unparsable vector");
                continue;
            }
        };
        let metadata: FaqMetadata = match serde_json::from_str(&record.metadata) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(id = %record.id, error = %e, "skipping record with unparsable metadata");
                continue;
            }
        };

        hits.push(SearchHit {
            similarity: cosine_similarity(&query.values, &vector),
            metadata,
        });
    }

    // stable sort keeps insertion order for equal scores
    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);
    Ok(hits)
}
