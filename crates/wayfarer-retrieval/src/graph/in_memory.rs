use std::sync::RwLock;

use super::{BoxFuture, GraphRecord, GraphStore, GraphStoreError, passes_quality};

/// A location node with its relations already resolved.
#[derive(Debug, Clone, Default)]
pub struct LocationNode {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub region: String,
    pub region_name: Option<String>,
    pub description: String,
    pub best_time: Option<String>,
    pub tags: Vec<String>,
    pub nearby: Vec<String>,
}

impl LocationNode {
    fn matches(&self, terms: &[String]) -> bool {
        let fields = [
            self.name.to_lowercase(),
            self.kind.to_lowercase(),
            self.region.to_lowercase(),
            self.description.to_lowercase(),
        ];
        terms.iter().any(|term| {
            let term = term.to_lowercase();
            fields.iter().any(|f| f.contains(&term))
        })
    }

    fn to_record(&self) -> GraphRecord {
        GraphRecord {
            node_id: Some(self.id.clone()),
            name: Some(self.name.clone()),
            kind: Some(self.kind.clone()),
            region: Some(self.region.clone()),
            region_name: self.region_name.clone(),
            description: Some(self.description.clone()),
            best_time: self.best_time.clone(),
            tags: self.tags.iter().cloned().map(Some).collect(),
            nearby_locations: self.nearby.iter().cloned().map(Some).collect(),
        }
    }
}

/// Process-local graph store for tests and offline runs.
///
/// Applies the same term predicate, quality predicate, name ordering and limit as the
/// Neo4j query, in that order.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    nodes: RwLock<Vec<LocationNode>>,
}

impl InMemoryGraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_nodes(nodes: Vec<LocationNode>) -> Self {
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn insert(&self, node: LocationNode) -> Result<(), GraphStoreError> {
        self.nodes
            .write()
            .map_err(|e| GraphStoreError::Connection(e.to_string()))?
            .push(node);
        Ok(())
    }
}

impl GraphStore for InMemoryGraphStore {
    fn query(
        &self,
        terms: &[String],
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<GraphRecord>, GraphStoreError>> {
        let terms = terms.to_vec();
        Box::pin(async move {
            let nodes = self
                .nodes
                .read()
                .map_err(|e| GraphStoreError::Query(e.to_string()))?;
            let mut hits: Vec<&LocationNode> = nodes
                .iter()
                .filter(|n| n.matches(&terms) && passes_quality(&n.name, &n.description))
                .collect();
            hits.sort_by(|a, b| a.name.cmp(&b.name));
            hits.truncate(limit);
            Ok(hits.into_iter().map(LocationNode::to_record).collect())
        })
    }

    fn verify_connectivity(&self) -> BoxFuture<'_, Result<(), GraphStoreError>> {
        Box::pin(async { Ok(()) })
    }
}
