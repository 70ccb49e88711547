use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(#[source] Arc<wayfarer_llm::LlmError>),

    #[error("vector store error: {0}")]
    VectorStore(#[from] crate::vector_store::VectorStoreError),

    #[error("graph store error: {0}")]
    GraphStore(#[from] crate::graph::GraphStoreError),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
