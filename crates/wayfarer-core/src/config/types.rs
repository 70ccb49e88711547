use serde::{Deserialize, Serialize};

use crate::vault::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub terms: TermsConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

fn default_assistant_name() -> String {
    "VietnamTravel AI".into()
}

fn default_domain() -> String {
    "Vietnam".into()
}

/// Persona the system directive is rendered for.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_name")]
    pub name: String,
    #[serde(default = "default_domain")]
    pub domain: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
            domain: default_domain(),
        }
    }
}

/// Model backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_llm_provider() -> ProviderKind {
    ProviderKind::OpenAi
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}

fn default_llm_model() -> String {
    "llama-3.1-8b-instant".into()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

/// Completion backend used by the response generator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: ProviderKind,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_embedding_provider() -> ProviderKind {
    ProviderKind::Ollama
}

fn default_embedding_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

fn default_dimension() -> usize {
    768
}

fn default_cache_capacity() -> u64 {
    10_000
}

/// Query embedding backend and the cache in front of it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: ProviderKind,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Vector length the index expects; provider output is padded or truncated to it.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_collection() -> String {
    "vietnam_travel".into()
}

fn default_top_k() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_top_k")]
    pub top_k: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection: default_collection(),
            top_k: default_top_k(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_neo4j_url() -> String {
    "http://localhost:7474".into()
}

fn default_neo4j_database() -> String {
    "neo4j".into()
}

fn default_neo4j_username() -> String {
    "neo4j".into()
}

fn default_graph_limit() -> usize {
    10
}

/// Optional knowledge graph. When disabled or unreachable at startup the assistant runs vector-only.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_neo4j_url")]
    pub url: String,
    #[serde(default = "default_neo4j_database")]
    pub database: String,
    #[serde(default = "default_neo4j_username")]
    pub username: String,
    #[serde(default = "default_graph_limit")]
    pub limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_neo4j_url(),
            database: default_neo4j_database(),
            username: default_neo4j_username(),
            limit: default_graph_limit(),
        }
    }
}

fn default_vector_timeout() -> u64 {
    10
}

fn default_graph_timeout() -> u64 {
    10
}

fn default_generation_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_vector_timeout")]
    pub vector_seconds: u64,
    #[serde(default = "default_graph_timeout")]
    pub graph_seconds: u64,
    #[serde(default = "default_generation_timeout")]
    pub generation_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            vector_seconds: default_vector_timeout(),
            graph_seconds: default_graph_timeout(),
            generation_seconds: default_generation_timeout(),
        }
    }
}

/// Vocabulary added on top of the built-in location and intent terms.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TermsConfig {
    #[serde(default)]
    pub extra_locations: Vec<String>,
    #[serde(default)]
    pub extra_intents: Vec<String>,
}

/// Secrets resolved from the vault at startup.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub llm_api_key: Option<Secret>,
    pub embedding_api_key: Option<Secret>,
    pub qdrant_api_key: Option<Secret>,
    pub neo4j_password: Option<Secret>,
}
