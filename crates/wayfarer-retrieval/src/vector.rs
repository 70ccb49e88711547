//! Similarity search over the destination index.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use wayfarer_llm::LlmProvider;

use crate::embedding_cache::EmbeddingCache;
use crate::error::Result;
use crate::vector_store::{ScoredVectorPoint, VectorStore};

const UNKNOWN: &str = "Unknown";
const UNSPECIFIED_BEST_TIME: &str = "Not specified";

/// Destination metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorMetadata {
    pub name: String,
    pub region: String,
    pub kind: String,
    pub description: Option<String>,
    /// Long-form text the index was built from; stands in for a missing description.
    pub semantic_text: Option<String>,
    pub tags: Vec<String>,
    pub best_time_to_visit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

impl VectorMatch {
    /// Build a match from a raw index point, substituting defaults for missing fields.
    #[must_use]
    pub fn from_point(point: ScoredVectorPoint) -> Self {
        let payload = point.payload;
        Self {
            id: point.id,
            score: point.score,
            metadata: VectorMetadata {
                name: text_field(&payload, "name").unwrap_or_else(|| UNKNOWN.into()),
                region: text_field(&payload, "region").unwrap_or_else(|| UNKNOWN.into()),
                kind: text_field(&payload, "type").unwrap_or_else(|| UNKNOWN.into()),
                description: text_field(&payload, "description"),
                semantic_text: text_field(&payload, "semantic_text"),
                tags: tags_field(&payload),
                best_time_to_visit: text_field(&payload, "best_time_to_visit")
                    .unwrap_or_else(|| UNSPECIFIED_BEST_TIME.into()),
            },
        }
    }
}

fn text_field(payload: &HashMap<String, serde_json::Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn tags_field(payload: &HashMap<String, serde_json::Value>) -> Vec<String> {
    match payload.get("tags") {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        Some(serde_json::Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Embeds a query through the shared cache and asks the vector index for its nearest neighbours.
pub struct VectorRetriever<P> {
    embeddings: Arc<EmbeddingCache<P>>,
    store: Arc<dyn VectorStore>,
    collection: String,
    top_k: u64,
}

impl<P: LlmProvider> VectorRetriever<P> {
    #[must_use]
    pub fn new(
        embeddings: Arc<EmbeddingCache<P>>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        top_k: u64,
    ) -> Self {
        Self {
            embeddings,
            store,
            collection: collection.into(),
            top_k,
        }
    }

    #[must_use]
    pub fn embeddings(&self) -> &EmbeddingCache<P> {
        &self.embeddings
    }

    /// Return the index's top-k matches for `query` in the order the index ranked them.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query or querying the index fails.
    pub async fn search(&self, query: &str) -> Result<Vec<VectorMatch>> {
        let vector = self.embeddings.embed(query).await?;
        let points = self
            .store
            .search(&self.collection, vector, self.top_k)
            .await?;
        tracing::debug!(
            collection = %self.collection,
            count = points.len(),
            "vector index returned matches"
        );
        Ok(points.into_iter().map(VectorMatch::from_point).collect())
    }

    /// Whether the index is reachable and holds the configured collection.
    pub async fn is_connected(&self) -> bool {
        match self.store.collection_exists(&self.collection).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::debug!("vector index health probe failed: {e:#}");
                false
            }
        }
    }
}
