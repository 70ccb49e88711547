//! Knowledge-graph lookups: store abstraction, raw records and the facts surfaced to prompts.

mod in_memory;
mod neo4j;
mod retriever;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

pub use in_memory::{InMemoryGraphStore, LocationNode};
pub use neo4j::Neo4jStore;
pub use retriever::{DEFAULT_GRAPH_LIMIT, GraphRetriever};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

const UNKNOWN_NAME: &str = "Unknown";
const MIN_DESCRIPTION_CHARS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("graph store connection error: {0}")]
    Connection(String),
    #[error("graph query failed: {0}")]
    Query(String),
    #[error("graph response decode error: {0}")]
    Decode(String),
}

/// Backend able to answer the location lookup behind graph retrieval.
///
/// `query` returns at most `limit` locations whose name, type, region or description
/// contains any of `terms` (case-insensitive), one record per location with its tags
/// and nearby locations collected, ordered by name.
pub trait GraphStore: Send + Sync {
    fn query(
        &self,
        terms: &[String],
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<GraphRecord>, GraphStoreError>>;

    fn verify_connectivity(&self) -> BoxFuture<'_, Result<(), GraphStoreError>>;
}

/// Location row as returned by a graph store, before quality filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphRecord {
    pub node_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub region: Option<String>,
    pub region_name: Option<String>,
    pub description: Option<String>,
    pub best_time: Option<String>,
    pub tags: Vec<Option<String>>,
    pub nearby_locations: Vec<Option<String>>,
}

/// A graph location good enough to show the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphFact {
    pub node_id: String,
    pub name: String,
    pub kind: String,
    pub region: String,
    pub description: String,
    pub best_time: String,
    pub tags: Vec<String>,
    pub nearby_locations: Vec<String>,
}

impl GraphFact {
    /// Accept a record only when its name is present and not `"Unknown"` and its
    /// description is longer than 20 characters.
    #[must_use]
    pub fn from_record(record: GraphRecord) -> Option<Self> {
        let name = record.name?;
        let description = record.description?;
        if !passes_quality(&name, &description) {
            return None;
        }
        let region = record
            .region_name
            .filter(|r| !r.is_empty())
            .or(record.region)
            .unwrap_or_default();

        Some(Self {
            node_id: record.node_id.unwrap_or_default(),
            name,
            kind: record.kind.unwrap_or_default(),
            region,
            description,
            best_time: record.best_time.unwrap_or_default(),
            tags: distinct(record.tags),
            nearby_locations: distinct(record.nearby_locations),
        })
    }
}

/// Name present and not `"Unknown"`, description longer than 20 characters.
pub(crate) fn passes_quality(name: &str, description: &str) -> bool {
    !name.is_empty() && name != UNKNOWN_NAME && description.chars().count() > MIN_DESCRIPTION_CHARS
}

fn distinct(values: Vec<Option<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values.into_iter().flatten() {
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// Outcome of the graph branch for one request.
///
/// `NotConfigured` means no graph store is wired in at all, which is a permanent mode
/// and distinct from a lookup that ran and found nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "facts", rename_all = "snake_case")]
pub enum GraphRetrieval {
    NotConfigured,
    Queried(Vec<GraphFact>),
}

impl GraphRetrieval {
    #[must_use]
    pub fn facts(&self) -> &[GraphFact] {
        match self {
            Self::NotConfigured => &[],
            Self::Queried(facts) => facts,
        }
    }

    #[must_use]
    pub fn into_facts(self) -> Vec<GraphFact> {
        match self {
            Self::NotConfigured => Vec::new(),
            Self::Queried(facts) => facts,
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Queried(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: Option<&str>, description: Option<&str>) -> GraphRecord {
        GraphRecord {
            node_id: Some("loc_1".into()),
            name: name.map(Into::into),
            kind: Some("City".into()),
            region: Some("Central".into()),
            description: description.map(Into::into),
            ..GraphRecord::default()
        }
    }

    const GOOD_DESCRIPTION: &str = "Lantern-lit riverside trading port";

    #[test]
    fn accepts_meaningful_record() {
        let fact = GraphFact::from_record(record(Some("Hoi An"), Some(GOOD_DESCRIPTION))).unwrap();
        assert_eq!(fact.name, "Hoi An");
        assert_eq!(fact.region, "Central");
        assert_eq!(fact.kind, "City");
    }

    #[test]
    fn rejects_missing_or_empty_name() {
        assert!(GraphFact::from_record(record(None, Some(GOOD_DESCRIPTION))).is_none());
        assert!(GraphFact::from_record(record(Some(""), Some(GOOD_DESCRIPTION))).is_none());
    }

    #[test]
    fn rejects_unknown_name() {
        assert!(GraphFact::from_record(record(Some("Unknown"), Some(GOOD_DESCRIPTION))).is_none());
    }

    #[test]
    fn rejects_short_description() {
        let twenty = "a".repeat(20);
        let twenty_one = "a".repeat(21);
        assert!(GraphFact::from_record(record(Some("Hue"), Some(&twenty))).is_none());
        assert!(GraphFact::from_record(record(Some("Hue"), None)).is_none());
        assert!(GraphFact::from_record(record(Some("Hue"), Some(&twenty_one))).is_some());
    }

    #[test]
    fn region_name_wins_over_region_property() {
        let mut r = record(Some("Hue"), Some(GOOD_DESCRIPTION));
        r.region_name = Some("Central Vietnam".into());
        assert_eq!(GraphFact::from_record(r).unwrap().region, "Central Vietnam");
    }

    #[test]
    fn tags_and_nearby_are_deduplicated_in_order() {
        let mut r = record(Some("Hue"), Some(GOOD_DESCRIPTION));
        r.tags = vec![
            Some("heritage".into()),
            None,
            Some("food".into()),
            Some("heritage".into()),
        ];
        r.nearby_locations = vec![Some("Da Nang".into()), Some("Da Nang".into())];
        let fact = GraphFact::from_record(r).unwrap();
        assert_eq!(fact.tags, vec!["heritage", "food"]);
        assert_eq!(fact.nearby_locations, vec!["Da Nang"]);
    }

    #[test]
    fn record_deserializes_with_nulls() {
        let json = serde_json::json!({
            "node_id": "loc_7",
            "name": "Sapa",
            "type": null,
            "tags": ["hiking", null],
        });
        let r: GraphRecord = serde_json::from_value(json).unwrap();
        assert_eq!(r.name.as_deref(), Some("Sapa"));
        assert!(r.kind.is_none());
        assert_eq!(r.tags.len(), 2);
        assert!(r.nearby_locations.is_empty());
    }

    #[test]
    fn retrieval_modes_are_distinguishable() {
        let absent = GraphRetrieval::NotConfigured;
        let empty = GraphRetrieval::Queried(Vec::new());
        assert!(absent.facts().is_empty());
        assert!(empty.facts().is_empty());
        assert!(!absent.is_configured());
        assert!(empty.is_configured());
        assert_ne!(absent, empty);
    }
}
