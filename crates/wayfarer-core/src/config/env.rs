use super::{Config, ProviderKind};

fn parse_provider(var: &str, value: &str) -> Option<ProviderKind> {
    let parsed = serde_json::from_value(serde_json::Value::String(value.to_owned())).ok();
    if parsed.is_none() {
        tracing::warn!("ignoring invalid {var} value: {value}");
    }
    parsed
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_models();
        self.apply_env_overrides_backends();
    }

    fn apply_env_overrides_models(&mut self) {
        if let Ok(v) = std::env::var("WAYFARER_ASSISTANT_NAME") {
            self.assistant.name = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_ASSISTANT_DOMAIN") {
            self.assistant.domain = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_LLM_PROVIDER")
            && let Some(kind) = parse_provider("WAYFARER_LLM_PROVIDER", &v)
        {
            self.llm.provider = kind;
        }
        if let Ok(v) = std::env::var("WAYFARER_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_LLM_TEMPERATURE")
            && let Ok(t) = v.parse::<f32>()
        {
            self.llm.temperature = t;
        }
        if let Ok(v) = std::env::var("WAYFARER_LLM_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = n;
        }
        if let Ok(v) = std::env::var("WAYFARER_EMBEDDING_PROVIDER")
            && let Some(kind) = parse_provider("WAYFARER_EMBEDDING_PROVIDER", &v)
        {
            self.embedding.provider = kind;
        }
        if let Ok(v) = std::env::var("WAYFARER_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_EMBEDDING_DIMENSION")
            && let Ok(dim) = v.parse::<usize>()
        {
            self.embedding.dimension = dim;
        }
        if let Ok(v) = std::env::var("WAYFARER_EMBEDDING_CACHE_CAPACITY")
            && let Ok(cap) = v.parse::<u64>()
        {
            self.embedding.cache_capacity = cap;
        }
    }

    fn apply_env_overrides_backends(&mut self) {
        if let Ok(v) = std::env::var("WAYFARER_QDRANT_URL") {
            self.vector.url = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_VECTOR_COLLECTION") {
            self.vector.collection = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_VECTOR_TOP_K")
            && let Ok(k) = v.parse::<u64>()
        {
            self.vector.top_k = k;
        }
        if let Ok(v) = std::env::var("WAYFARER_GRAPH_ENABLED")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.graph.enabled = enabled;
        }
        if let Ok(v) = std::env::var("WAYFARER_NEO4J_URL") {
            self.graph.url = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_NEO4J_DATABASE") {
            self.graph.database = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_NEO4J_USERNAME") {
            self.graph.username = v;
        }
        if let Ok(v) = std::env::var("WAYFARER_TIMEOUT_VECTOR")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.vector_seconds = secs;
        }
        if let Ok(v) = std::env::var("WAYFARER_TIMEOUT_GRAPH")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.graph_seconds = secs;
        }
        if let Ok(v) = std::env::var("WAYFARER_TIMEOUT_GENERATION")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.generation_seconds = secs;
        }
        if let Ok(v) = std::env::var("WAYFARER_TERMS_EXTRA_LOCATIONS") {
            self.terms.extra_locations = split_list(&v);
        }
        if let Ok(v) = std::env::var("WAYFARER_TERMS_EXTRA_INTENTS") {
            self.terms.extra_intents = split_list(&v);
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}
