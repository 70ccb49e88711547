use tokio::sync::watch;

/// Running totals across every query the pipeline has served.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub queries: u64,
    pub degraded_queries: u64,
    pub failed_queries: u64,
    pub last_vector_results: usize,
    pub last_graph_results: usize,
    pub last_search_ms: u64,
    pub last_generation_ms: u64,
    pub last_total_ms: u64,
    pub embedding_cache_hits: u64,
    pub embedding_cache_misses: u64,
    pub graph_configured: bool,
}

pub struct MetricsCollector {
    tx: watch::Sender<MetricsSnapshot>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<MetricsSnapshot>) {
        let (tx, rx) = watch::channel(MetricsSnapshot::default());
        (Self { tx }, rx)
    }

    pub fn update(&self, f: impl FnOnce(&mut MetricsSnapshot)) {
        self.tx.send_modify(f);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.tx.borrow().clone()
    }
}
