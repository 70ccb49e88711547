//! Hybrid retrieval orchestration: configuration, parallel search, prompt assembly, and generation.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod generator;
pub mod metrics;
pub mod pipeline;
pub mod search;
pub mod vault;

pub use config::Config;
pub use context::{ContextBuilder, PromptContext};
pub use generator::{GenerationError, ResponseGenerator};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use pipeline::{
    PipelineError, PipelineIssue, QueryPipeline, QueryResult, QueryStatus, SearchMetrics,
    SystemStatus,
};
pub use search::{Branch, BranchError, BranchTimeouts, HybridSearch, SearchOutcome};
