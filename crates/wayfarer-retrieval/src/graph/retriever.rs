use std::sync::Arc;

use super::{GraphFact, GraphStore, GraphStoreError};
use crate::terms::TermExtractor;

/// Maximum number of locations fetched per query.
pub const DEFAULT_GRAPH_LIMIT: usize = 10;

/// Turns a free-text query into vocabulary terms and looks matching locations up in the graph.
pub struct GraphRetriever {
    store: Arc<dyn GraphStore>,
    terms: TermExtractor,
    limit: usize,
}

impl GraphRetriever {
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>, terms: TermExtractor) -> Self {
        Self {
            store,
            terms,
            limit: DEFAULT_GRAPH_LIMIT,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// # Errors
    ///
    /// Returns an error if the graph store query fails.
    pub async fn search(&self, query: &str) -> Result<Vec<GraphFact>, GraphStoreError> {
        let terms: Vec<String> = self.terms.extract(query).into_iter().collect();
        let records = self.store.query(&terms, self.limit).await?;
        let mut facts: Vec<GraphFact> = records
            .into_iter()
            .filter_map(GraphFact::from_record)
            .collect();
        facts.truncate(self.limit);
        tracing::debug!(?terms, count = facts.len(), "graph lookup found locations");
        Ok(facts)
    }

    /// # Errors
    ///
    /// Returns an error if the graph store cannot be reached.
    pub async fn verify_connectivity(&self) -> Result<(), GraphStoreError> {
        self.store.verify_connectivity().await
    }
}
