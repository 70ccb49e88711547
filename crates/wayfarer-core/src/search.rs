//! Concurrent fan-out over the vector and graph backends.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tokio_util::task::AbortOnDropHandle;
use wayfarer_llm::LlmProvider;
use wayfarer_retrieval::{GraphRetrieval, GraphRetriever, VectorMatch, VectorRetriever};

/// Which retrieval backend a branch talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Vector,
    Graph,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vector => "vector",
            Self::Graph => "graph",
        })
    }
}

/// Why a branch contributed no results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchError {
    #[error("{branch} retrieval timed out after {timeout:?}")]
    TimedOut { branch: Branch, timeout: Duration },
    #[error("{branch} retrieval failed: {message}")]
    Backend { branch: Branch, message: String },
    #[error("{branch} retrieval task aborted: {message}")]
    Aborted { branch: Branch, message: String },
}

impl BranchError {
    #[must_use]
    pub fn branch(&self) -> Branch {
        match self {
            Self::TimedOut { branch, .. }
            | Self::Backend { branch, .. }
            | Self::Aborted { branch, .. } => *branch,
        }
    }

    /// The task itself died rather than the backend answering badly.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Per-branch deadlines. Hitting one is treated like the backend being unavailable.
#[derive(Debug, Clone, Copy)]
pub struct BranchTimeouts {
    pub vector: Duration,
    pub graph: Duration,
}

impl Default for BranchTimeouts {
    fn default() -> Self {
        Self {
            vector: Duration::from_secs(10),
            graph: Duration::from_secs(10),
        }
    }
}

/// Results of one hybrid search with timings and any branch failures.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub vector_matches: Vec<VectorMatch>,
    pub graph: GraphRetrieval,
    /// Wall clock from launch until both branches joined.
    pub elapsed: Duration,
    pub vector_elapsed: Duration,
    pub graph_elapsed: Duration,
    pub errors: Vec<BranchError>,
}

impl SearchOutcome {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn aborted(&self) -> Option<&BranchError> {
        self.errors.iter().find(|e| e.is_abort())
    }
}

type Timed<T, E> = (Result<Result<T, E>, Elapsed>, Duration);

/// Runs the vector and graph retrievers side by side and joins them at a single point.
pub struct HybridSearch<P> {
    vector: Arc<VectorRetriever<P>>,
    graph: Option<Arc<GraphRetriever>>,
    timeouts: BranchTimeouts,
}

impl<P> HybridSearch<P>
where
    P: LlmProvider + 'static,
{
    #[must_use]
    pub fn new(
        vector: Arc<VectorRetriever<P>>,
        graph: Option<Arc<GraphRetriever>>,
        timeouts: BranchTimeouts,
    ) -> Self {
        Self {
            vector,
            graph,
            timeouts,
        }
    }

    #[must_use]
    pub fn vector(&self) -> &VectorRetriever<P> {
        &self.vector
    }

    #[must_use]
    pub fn graph(&self) -> Option<&GraphRetriever> {
        self.graph.as_deref()
    }

    #[must_use]
    pub fn timeouts(&self) -> BranchTimeouts {
        self.timeouts
    }

    /// Search both backends concurrently.
    ///
    /// Dropping the returned future aborts both branch tasks. A missing graph retriever
    /// resolves immediately to [`GraphRetrieval::NotConfigured`].
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let started = Instant::now();

        let vector_task = {
            let retriever = Arc::clone(&self.vector);
            let query = query.to_owned();
            spawn_timed(self.timeouts.vector, async move { retriever.search(&query).await })
        };

        let graph_task = self.graph.as_ref().map(|retriever| {
            let retriever = Arc::clone(retriever);
            let query = query.to_owned();
            spawn_timed(self.timeouts.graph, async move { retriever.search(&query).await })
        });
        let graph_branch = async move {
            match graph_task {
                Some(task) => Some(task.await),
                None => None,
            }
        };

        let (vector_joined, graph_joined) = tokio::join!(vector_task, graph_branch);
        let elapsed = started.elapsed();

        let mut errors = Vec::new();

        let (vector_matches, vector_elapsed) =
            settle(Branch::Vector, self.timeouts.vector, vector_joined, &mut errors);
        let vector_matches = vector_matches.unwrap_or_default();

        let (graph, graph_elapsed) = match graph_joined {
            None => (GraphRetrieval::NotConfigured, Duration::ZERO),
            Some(joined) => {
                let (facts, took) = settle(Branch::Graph, self.timeouts.graph, joined, &mut errors);
                (GraphRetrieval::Queried(facts.unwrap_or_default()), took)
            }
        };

        tracing::debug!(
            vector = vector_matches.len(),
            graph = graph.facts().len(),
            elapsed_ms = elapsed.as_millis(),
            "hybrid search joined"
        );

        SearchOutcome {
            vector_matches,
            graph,
            elapsed,
            vector_elapsed,
            graph_elapsed,
            errors,
        }
    }
}

fn spawn_timed<T, E, F>(timeout: Duration, fut: F) -> AbortOnDropHandle<Timed<T, E>>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    AbortOnDropHandle::new(tokio::spawn(async move {
        let started = Instant::now();
        let result = tokio::time::timeout(timeout, fut).await;
        (result, started.elapsed())
    }))
}

fn settle<T, E: fmt::Display>(
    branch: Branch,
    timeout: Duration,
    joined: Result<Timed<T, E>, JoinError>,
    errors: &mut Vec<BranchError>,
) -> (Option<T>, Duration) {
    let (error, took) = match joined {
        Ok((Ok(Ok(value)), took)) => return (Some(value), took),
        Ok((Ok(Err(e)), took)) => (
            BranchError::Backend {
                branch,
                message: e.to_string(),
            },
            took,
        ),
        Ok((Err(_), took)) => (BranchError::TimedOut { branch, timeout }, took),
        Err(e) => (
            BranchError::Aborted {
                branch,
                message: e.to_string(),
            },
            Duration::ZERO,
        ),
    };
    tracing::warn!("{error}, continuing without it");
    errors.push(error);
    (None, took)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use wayfarer_llm::mock::MockProvider;
    use wayfarer_retrieval::graph::{BoxFuture, GraphRecord, GraphStore, GraphStoreError};
    use wayfarer_retrieval::{
        EmbeddingCache, InMemoryGraphStore, InMemoryVectorStore, LocationNode, TermExtractor,
    };

    use super::*;

    fn vector_retriever(provider: MockProvider) -> Arc<VectorRetriever<MockProvider>> {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .insert(
                "travel",
                "1",
                vec![1.0, 0.0],
                serde_json::json!({"name": "Ha Long Bay"}),
            )
            .unwrap();
        let cache = Arc::new(EmbeddingCache::new(Arc::new(provider), 2, 64));
        Arc::new(VectorRetriever::new(cache, store, "travel", 5))
    }

    fn graph_retriever(store: impl GraphStore + 'static) -> Arc<GraphRetriever> {
        Arc::new(GraphRetriever::new(Arc::new(store), TermExtractor::default()))
    }

    fn location(name: &str) -> LocationNode {
        LocationNode {
            id: name.to_lowercase(),
            name: name.into(),
            kind: "Bay".into(),
            region: "Northern".into(),
            description: "Limestone karsts rising from emerald water".into(),
            tags: vec!["cruise".into()],
            ..LocationNode::default()
        }
    }

    /// Graph store that sleeps before answering and records whether it finished.
    struct SlowGraph {
        delay: Duration,
        finished: Arc<AtomicBool>,
    }

    impl GraphStore for SlowGraph {
        fn query(
            &self,
            _terms: &[String],
            _limit: usize,
        ) -> BoxFuture<'_, Result<Vec<GraphRecord>, GraphStoreError>> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                self.finished.store(true, Ordering::SeqCst);
                Ok(Vec::new())
            })
        }

        fn verify_connectivity(&self) -> BoxFuture<'_, Result<(), GraphStoreError>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn both_branches_return_results() {
        let search = HybridSearch::new(
            vector_retriever(MockProvider::default().with_embedding(vec![1.0, 0.0])),
            Some(graph_retriever(InMemoryGraphStore::with_nodes(vec![location(
                "Ha Long Bay",
            )]))),
            BranchTimeouts::default(),
        );

        let outcome = search.search("a cruise in ha long").await;
        assert_eq!(outcome.vector_matches.len(), 1);
        assert!(outcome.graph.is_configured());
        assert_eq!(outcome.graph.facts().len(), 1);
        assert!(!outcome.is_degraded());
    }

    #[tokio::test]
    async fn absent_graph_is_not_configured_with_zero_latency() {
        let search = HybridSearch::new(
            vector_retriever(MockProvider::default()),
            None,
            BranchTimeouts::default(),
        );

        let outcome = search.search("hanoi").await;
        assert_eq!(outcome.graph, GraphRetrieval::NotConfigured);
        assert_eq!(outcome.graph_elapsed, Duration::ZERO);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn vector_failure_degrades_to_empty() {
        let search = HybridSearch::new(
            vector_retriever(MockProvider::failing()),
            Some(graph_retriever(InMemoryGraphStore::with_nodes(vec![location(
                "Ha Long Bay",
            )]))),
            BranchTimeouts::default(),
        );

        let outcome = search.search("ha long").await;
        assert!(outcome.vector_matches.is_empty());
        assert_eq!(outcome.graph.facts().len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].branch(), Branch::Vector);
        assert!(outcome.aborted().is_none());
    }

    #[tokio::test]
    async fn graph_timeout_is_treated_as_unavailable() {
        let finished = Arc::new(AtomicBool::new(false));
        let search = HybridSearch::new(
            vector_retriever(MockProvider::default()),
            Some(graph_retriever(SlowGraph {
                delay: Duration::from_secs(5),
                finished: Arc::clone(&finished),
            })),
            BranchTimeouts {
                vector: Duration::from_secs(5),
                graph: Duration::from_millis(50),
            },
        );

        let outcome = search.search("hue").await;
        assert!(outcome.graph.is_configured());
        assert!(outcome.graph.facts().is_empty());
        assert!(matches!(
            outcome.errors.as_slice(),
            [BranchError::TimedOut {
                branch: Branch::Graph,
                ..
            }]
        ));
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn elapsed_is_wall_clock_not_sum() {
        let search = HybridSearch::new(
            vector_retriever(MockProvider::default().with_delay(150)),
            Some(graph_retriever(SlowGraph {
                delay: Duration::from_millis(150),
                finished: Arc::new(AtomicBool::new(false)),
            })),
            BranchTimeouts::default(),
        );

        let outcome = search.search("sapa").await;
        assert!(outcome.elapsed >= Duration::from_millis(150));
        assert!(outcome.elapsed < outcome.vector_elapsed + outcome.graph_elapsed);
    }

    #[tokio::test]
    async fn dropping_search_aborts_branches() {
        let finished = Arc::new(AtomicBool::new(false));
        let search = HybridSearch::new(
            vector_retriever(MockProvider::default()),
            Some(graph_retriever(SlowGraph {
                delay: Duration::from_millis(200),
                finished: Arc::clone(&finished),
            })),
            BranchTimeouts::default(),
        );

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), search.search("hoi an")).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[test]
    fn branch_error_messages_name_the_branch() {
        let e = BranchError::TimedOut {
            branch: Branch::Graph,
            timeout: Duration::from_secs(2),
        };
        assert!(e.to_string().starts_with("graph retrieval timed out"));
        assert!(!e.is_abort());
    }
}
