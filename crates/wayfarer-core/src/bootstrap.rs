//! Application bootstrap: config resolution and pipeline construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use wayfarer_llm::LlmProvider;
use wayfarer_llm::any::AnyProvider;
use wayfarer_llm::ollama::OllamaProvider;
use wayfarer_llm::openai::OpenAiProvider;
use wayfarer_retrieval::{
    EmbeddingCache, GraphRetriever, GraphStore, Neo4jStore, QdrantOps, TermExtractor,
    VectorRetriever,
};

use crate::config::{Config, ProviderKind};
use crate::context::ContextBuilder;
use crate::generator::ResponseGenerator;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::pipeline::QueryPipeline;
use crate::search::{BranchTimeouts, HybridSearch};
use crate::vault::{EnvVaultProvider, VaultProvider};

pub type Pipeline = QueryPipeline<AnyProvider, AnyProvider>;

/// Priority: explicit path > `WAYFARER_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("WAYFARER_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// Load, validate and resolve secrets for the config at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed, a value is invalid, or the vault fails.
pub async fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = Config::load(path)?;
    config.validate()?;
    let vault: Box<dyn VaultProvider> = Box::new(EnvVaultProvider);
    config.resolve_secrets(vault.as_ref()).await?;
    Ok(config)
}

/// Completion backend for the response generator.
#[must_use]
pub fn create_completion_provider(config: &Config) -> AnyProvider {
    let llm = &config.llm;
    match llm.provider {
        ProviderKind::OpenAi => {
            let api_key = config
                .secrets
                .llm_api_key
                .as_ref()
                .map(|s| s.expose().to_owned())
                .unwrap_or_default();
            AnyProvider::OpenAi(OpenAiProvider::new(
                api_key,
                llm.base_url.clone(),
                llm.model.clone(),
                llm.temperature,
                llm.max_tokens,
                None,
            ))
        }
        ProviderKind::Ollama => AnyProvider::Ollama(
            OllamaProvider::new(&llm.base_url, llm.model.clone(), String::new())
                .with_sampling(llm.temperature, llm.max_tokens),
        ),
    }
}

/// Embedding backend for query vectors.
#[must_use]
pub fn create_embedding_provider(config: &Config) -> AnyProvider {
    let emb = &config.embedding;
    match emb.provider {
        ProviderKind::OpenAi => {
            let api_key = config
                .secrets
                .embedding_api_key
                .as_ref()
                .or(config.secrets.llm_api_key.as_ref())
                .map(|s| s.expose().to_owned())
                .unwrap_or_default();
            AnyProvider::OpenAi(OpenAiProvider::new(
                api_key,
                emb.base_url.clone(),
                emb.model.clone(),
                0.0,
                1,
                Some(emb.model.clone()),
            ))
        }
        ProviderKind::Ollama => AnyProvider::Ollama(OllamaProvider::new(
            &emb.base_url,
            emb.model.clone(),
            emb.model.clone(),
        )),
    }
}

pub async fn health_check(provider: &AnyProvider) {
    if let AnyProvider::Ollama(ollama) = provider {
        match ollama.health_check().await {
            Ok(()) => tracing::info!("ollama health check passed"),
            Err(e) => tracing::warn!("ollama health check failed: {e:#}"),
        }
    } else if !provider.is_configured() {
        tracing::warn!("no API key configured for {} provider", provider.name());
    }
}

/// HTTP client for the graph store, bounded by the graph branch timeout.
fn graph_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    let timeout = Duration::from_secs(config.timeouts.graph_seconds);
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .user_agent(concat!("wayfarer/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Connect to the graph store and keep it only if it answers within the graph timeout.
pub async fn connect_graph(config: &Config) -> Option<Arc<dyn GraphStore>> {
    if !config.graph.enabled {
        tracing::info!("graph store disabled, using vector search only");
        return None;
    }

    let password = config
        .secrets
        .neo4j_password
        .as_ref()
        .map(|s| s.expose().to_owned())
        .unwrap_or_default();
    let client = match graph_client(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("failed to build graph HTTP client: {e}; continuing with vector search only");
            return None;
        }
    };
    let store = Neo4jStore::new(
        client,
        &config.graph.url,
        &config.graph.database,
        config.graph.username.clone(),
        password,
    );

    let timeout = Duration::from_secs(config.timeouts.graph_seconds);
    match tokio::time::timeout(timeout, store.verify_connectivity()).await {
        Ok(Ok(())) => {
            tracing::info!(url = %config.graph.url, "connected to graph store");
            Some(Arc::new(store))
        }
        Ok(Err(e)) => {
            tracing::warn!("graph store not available: {e}; continuing with vector search only");
            None
        }
        Err(_) => {
            tracing::warn!(
                "graph store did not answer within {timeout:?}; continuing with vector search only"
            );
            None
        }
    }
}

/// Build the full query pipeline from configuration.
///
/// # Errors
///
/// Returns an error if the vector index client cannot be created.
pub async fn build_pipeline(
    config: &Config,
) -> anyhow::Result<(Pipeline, watch::Receiver<MetricsSnapshot>)> {
    let embedder = create_embedding_provider(config);
    health_check(&embedder).await;
    let completion = create_completion_provider(config);
    health_check(&completion).await;

    let qdrant_key = config.secrets.qdrant_api_key.as_ref().map(|s| s.expose());
    let vector_store =
        QdrantOps::new(&config.vector.url, qdrant_key).context("failed to create Qdrant client")?;

    let cache = Arc::new(EmbeddingCache::new(
        Arc::new(embedder),
        config.embedding.dimension,
        config.embedding.cache_capacity,
    ));
    let vector = Arc::new(VectorRetriever::new(
        cache,
        Arc::new(vector_store),
        config.vector.collection.clone(),
        config.vector.top_k,
    ));

    let terms = TermExtractor::default()
        .with_extra_terms(&config.terms.extra_locations, &config.terms.extra_intents);
    let graph = connect_graph(config).await.map(|store| {
        Arc::new(GraphRetriever::new(store, terms).with_limit(config.graph.limit))
    });

    let timeouts = BranchTimeouts {
        vector: Duration::from_secs(config.timeouts.vector_seconds),
        graph: Duration::from_secs(config.timeouts.graph_seconds),
    };
    let generator = ResponseGenerator::new(
        Arc::new(completion),
        Duration::from_secs(config.timeouts.generation_seconds),
    );

    let (collector, metrics_rx) = MetricsCollector::new();
    let pipeline = QueryPipeline::new(
        HybridSearch::new(vector, graph, timeouts),
        ContextBuilder::new(&config.assistant.name, &config.assistant.domain),
        generator,
    )
    .with_metrics(Arc::new(collector));

    Ok((pipeline, metrics_rx))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::vault::Secret;

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.embedding.base_url = "http://127.0.0.1:1".into();
        config.llm.base_url = "http://127.0.0.1:1".into();
        config.graph.url = "http://127.0.0.1:1".into();
        config
    }

    #[test]
    #[serial]
    fn resolve_config_path_priority() {
        unsafe { std::env::remove_var("WAYFARER_CONFIG") };
        assert_eq!(resolve_config_path(None), PathBuf::from("config/default.toml"));

        unsafe { std::env::set_var("WAYFARER_CONFIG", "/etc/wayfarer.toml") };
        assert_eq!(resolve_config_path(None), PathBuf::from("/etc/wayfarer.toml"));
        assert_eq!(
            resolve_config_path(Some(Path::new("cli.toml"))),
            PathBuf::from("cli.toml")
        );
        unsafe { std::env::remove_var("WAYFARER_CONFIG") };
    }

    #[test]
    fn completion_provider_follows_config() {
        let mut config = Config::default();
        config.secrets.llm_api_key = Some(Secret::new("gsk-test"));
        let provider = create_completion_provider(&config);
        assert!(matches!(provider, AnyProvider::OpenAi(_)));
        assert!(provider.is_configured());

        config.llm.provider = ProviderKind::Ollama;
        assert!(matches!(create_completion_provider(&config), AnyProvider::Ollama(_)));
    }

    #[test]
    fn completion_without_key_is_unconfigured() {
        let provider = create_completion_provider(&Config::default());
        assert!(!provider.is_configured());
    }

    #[test]
    fn embedding_provider_follows_config() {
        let mut config = Config::default();
        let provider = create_embedding_provider(&config);
        assert!(matches!(provider, AnyProvider::Ollama(_)));
        assert!(provider.supports_embeddings());

        config.embedding.provider = ProviderKind::OpenAi;
        assert!(matches!(create_embedding_provider(&config), AnyProvider::OpenAi(_)));
    }

    #[tokio::test]
    async fn unreachable_graph_falls_back_to_vector_only() {
        let (pipeline, _rx) = build_pipeline(&offline_config()).await.unwrap();
        assert!(!pipeline.has_graph());
    }

    #[tokio::test]
    async fn silent_graph_host_does_not_block_startup() {
        // Accepts the TCP connection but never answers the HTTP request.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut config = offline_config();
        config.graph.url = format!("http://{addr}");
        config.timeouts.graph_seconds = 1;

        let graph = tokio::time::timeout(Duration::from_secs(5), connect_graph(&config))
            .await
            .expect("graph probe must respect the graph timeout");
        assert!(graph.is_none());
    }

    #[tokio::test]
    async fn disabled_graph_is_not_probed() {
        let mut config = offline_config();
        config.graph.enabled = false;
        assert!(connect_graph(&config).await.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn load_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[embedding]\ndimension = 0\n").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("dimension"));
    }
}
