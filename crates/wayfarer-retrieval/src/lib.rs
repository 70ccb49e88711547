//! Retrieval backends for Wayfarer: cached query embeddings, vector similarity search,
//! and knowledge-graph lookups driven by lexical term extraction.

pub mod embedding_cache;
pub mod error;
pub mod graph;
pub mod in_memory_store;
pub mod qdrant_ops;
pub mod terms;
pub mod vector;
pub mod vector_store;

pub use embedding_cache::{CacheStats, EmbeddingCache};
pub use error::RetrievalError;
pub use graph::{
    GraphFact, GraphRecord, GraphRetrieval, GraphRetriever, GraphStore, GraphStoreError,
    InMemoryGraphStore, LocationNode, Neo4jStore,
};
pub use in_memory_store::InMemoryVectorStore;
pub use qdrant_ops::QdrantOps;
pub use terms::TermExtractor;
pub use vector::{VectorMatch, VectorMetadata, VectorRetriever};
pub use vector_store::{ScoredVectorPoint, VectorStore, VectorStoreError};
