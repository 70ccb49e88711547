//! Query façade: search, render, generate, and report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use wayfarer_llm::LlmProvider;
use wayfarer_retrieval::{GraphFact, GraphRetrieval, VectorMatch};

use crate::context::ContextBuilder;
use crate::generator::ResponseGenerator;
use crate::metrics::MetricsCollector;
use crate::search::{BranchError, HybridSearch};

const GENERATION_APOLOGY: &str =
    "I apologize, but I encountered an error while generating the response:";
const FAILURE_APOLOGY: &str = "I apologize, but I couldn't process your request:";

/// How completely a request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// Every configured backend answered and the model produced a response.
    Complete,
    /// A backend or the model failed; the response is built from what remained.
    Degraded,
    /// Nothing was retrieved or generated.
    Failed,
}

/// Something that went wrong while serving a request but did not stop it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum PipelineIssue {
    Retrieval(String),
    Generation(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("query is empty")]
    EmptyQuery,
    #[error(transparent)]
    Branch(#[from] BranchError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMetrics {
    pub vector_results: usize,
    pub graph_results: usize,
    pub search_duration: Duration,
    pub generation_duration: Duration,
    pub total_duration: Duration,
    pub status: QueryStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub vector_matches: Vec<VectorMatch>,
    pub graph: GraphRetrieval,
    pub response: String,
    pub metrics: SearchMetrics,
    pub issues: Vec<PipelineIssue>,
}

impl QueryResult {
    #[must_use]
    pub fn graph_facts(&self) -> &[GraphFact] {
        self.graph.facts()
    }

    fn failed(error: &PipelineError, total: Duration, graph_configured: bool) -> Self {
        Self {
            vector_matches: Vec::new(),
            graph: if graph_configured {
                GraphRetrieval::Queried(Vec::new())
            } else {
                GraphRetrieval::NotConfigured
            },
            response: format!("{FAILURE_APOLOGY} {error}"),
            metrics: SearchMetrics {
                vector_results: 0,
                graph_results: 0,
                search_duration: Duration::ZERO,
                generation_duration: Duration::ZERO,
                total_duration: total,
                status: QueryStatus::Failed,
            },
            issues: vec![PipelineIssue::Retrieval(error.to_string())],
        }
    }
}

/// Health of each collaborator, probed live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemStatus {
    pub vector_connected: bool,
    pub graph_connected: bool,
    pub completion_configured: bool,
    pub embedder_loaded: bool,
}

/// Single entry point for callers: hybrid search, prompt assembly and one completion call.
pub struct QueryPipeline<E, C> {
    search: HybridSearch<E>,
    context: ContextBuilder,
    generator: ResponseGenerator<C>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl<E, C> QueryPipeline<E, C>
where
    E: LlmProvider + 'static,
    C: LlmProvider,
{
    #[must_use]
    pub fn new(search: HybridSearch<E>, context: ContextBuilder, generator: ResponseGenerator<C>) -> Self {
        Self {
            search,
            context,
            generator,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn has_graph(&self) -> bool {
        self.search.graph().is_some()
    }

    /// Answer `query`. Never fails outright; check `metrics.status` for degradation.
    pub async fn process(&self, query: &str) -> QueryResult {
        let started = Instant::now();
        let result = match self.try_process(query, started).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("query failed: {e}");
                QueryResult::failed(&e, started.elapsed(), self.has_graph())
            }
        };
        self.record(&result);
        result
    }

    async fn try_process(&self, query: &str, started: Instant) -> Result<QueryResult, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        let outcome = self.search.search(query).await;
        if let Some(aborted) = outcome.aborted() {
            return Err(aborted.clone().into());
        }

        let mut issues: Vec<PipelineIssue> = outcome
            .errors
            .iter()
            .map(|e| PipelineIssue::Retrieval(e.to_string()))
            .collect();

        let prompt = self
            .context
            .build(query, &outcome.vector_matches, outcome.graph.facts());

        let generation_started = Instant::now();
        let response = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("response generation failed: {e}");
                issues.push(PipelineIssue::Generation(e.to_string()));
                format!("{GENERATION_APOLOGY} {e}")
            }
        };
        let generation_duration = generation_started.elapsed();
        let total_duration = started.elapsed();

        tracing::info!(
            "search: {:.2}s, response: {:.2}s, total: {:.2}s",
            outcome.elapsed.as_secs_f64(),
            generation_duration.as_secs_f64(),
            total_duration.as_secs_f64()
        );

        let status = if issues.is_empty() {
            QueryStatus::Complete
        } else {
            QueryStatus::Degraded
        };

        Ok(QueryResult {
            metrics: SearchMetrics {
                vector_results: outcome.vector_matches.len(),
                graph_results: outcome.graph.facts().len(),
                search_duration: outcome.elapsed,
                generation_duration,
                total_duration,
                status,
            },
            vector_matches: outcome.vector_matches,
            graph: outcome.graph,
            response,
            issues,
        })
    }

    fn record(&self, result: &QueryResult) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let cache = self.search.vector().embeddings().stats();
        let graph_configured = self.has_graph();
        let m = &result.metrics;
        metrics.update(|s| {
            s.queries += 1;
            match m.status {
                QueryStatus::Complete => {}
                QueryStatus::Degraded => s.degraded_queries += 1,
                QueryStatus::Failed => s.failed_queries += 1,
            }
            s.last_vector_results = m.vector_results;
            s.last_graph_results = m.graph_results;
            s.last_search_ms = millis(m.search_duration);
            s.last_generation_ms = millis(m.generation_duration);
            s.last_total_ms = millis(m.total_duration);
            s.embedding_cache_hits = cache.hits;
            s.embedding_cache_misses = cache.misses;
            s.graph_configured = graph_configured;
        });
    }

    /// Probe every collaborator concurrently. Safe to call while queries are in flight.
    ///
    /// Each probe is bounded by its branch timeout; a probe that runs out of time reports `false`.
    pub async fn status(&self) -> SystemStatus {
        let timeouts = self.search.timeouts();
        let vector_probe = async {
            tokio::time::timeout(timeouts.vector, self.search.vector().is_connected())
                .await
                .unwrap_or_else(|_| {
                    tracing::debug!("vector health probe timed out after {:?}", timeouts.vector);
                    false
                })
        };
        let graph_probe = async {
            let Some(graph) = self.search.graph() else {
                return false;
            };
            match tokio::time::timeout(timeouts.graph, graph.verify_connectivity()).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    tracing::debug!("graph health probe failed: {e}");
                    false
                }
                Err(_) => {
                    tracing::debug!("graph health probe timed out after {:?}", timeouts.graph);
                    false
                }
            }
        };
        let (vector_connected, graph_connected) = tokio::join!(vector_probe, graph_probe);

        SystemStatus {
            vector_connected,
            graph_connected,
            completion_configured: self.generator.provider().is_configured(),
            embedder_loaded: self.search.vector().embeddings().provider().supports_embeddings(),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
