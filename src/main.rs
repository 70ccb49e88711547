use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use wayfarer_core::bootstrap::{self, Pipeline};
use wayfarer_core::{MetricsSnapshot, QueryResult, QueryStatus, SearchMetrics, SystemStatus};

#[derive(Parser, Debug)]
#[command(
    name = "wayfarer",
    version,
    about = "Vietnam travel assistant backed by vector search and a location graph"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a single question and exit.
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Probe every backend and print its health.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = bootstrap::resolve_config_path(cli.config.as_deref());
    let config = bootstrap::load_config(&config_path)
        .await
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let (pipeline, metrics) = bootstrap::build_pipeline(&config).await?;

    match cli.command {
        Some(Command::Ask { query }) => {
            let result = pipeline.process(&query.join(" ")).await;
            print_result(&result);
        }
        Some(Command::Status) => print_status(&pipeline.status().await),
        None => {
            println!("{} v{}", config.assistant.name, env!("CARGO_PKG_VERSION"));
            if !pipeline.has_graph() {
                println!("Graph store unavailable, answers use vector search only.");
            }
            chat_loop(&pipeline).await?;
            print_summary(&metrics);
        }
    }

    Ok(())
}

async fn chat_loop(pipeline: &Pipeline) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nAsk a travel question (empty, 'exit' or 'quit' to leave): ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let query = line.trim();
        if query.is_empty() || matches!(query.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let result = pipeline.process(query).await;
        print_result(&result);
    }

    println!("Goodbye!");
    Ok(())
}

fn print_result(result: &QueryResult) {
    let m = &result.metrics;
    println!("\n{}\n", result.response);
    println!("{}", timing_line(m));
    println!(
        "Found {} vector results and {} graph results",
        m.vector_results, m.graph_results
    );
    if m.status != QueryStatus::Complete {
        for issue in &result.issues {
            tracing::warn!(?issue, "query served with degraded context");
        }
    }
}

fn timing_line(m: &SearchMetrics) -> String {
    format!(
        "Search completed in {:.2}s (search: {:.2}s, response: {:.2}s)",
        m.total_duration.as_secs_f64(),
        m.search_duration.as_secs_f64(),
        m.generation_duration.as_secs_f64()
    )
}

fn print_status(status: &SystemStatus) {
    let mark = |ok: bool| if ok { "ok" } else { "unavailable" };
    println!("vector index:     {}", mark(status.vector_connected));
    println!("graph store:      {}", mark(status.graph_connected));
    println!("completion model: {}", mark(status.completion_configured));
    println!("embedding model:  {}", mark(status.embedder_loaded));
}

fn print_summary(metrics: &watch::Receiver<MetricsSnapshot>) {
    let snapshot = metrics.borrow();
    if snapshot.queries == 0 {
        return;
    }
    tracing::info!(
        queries = snapshot.queries,
        degraded = snapshot.degraded_queries,
        failed = snapshot.failed_queries,
        cache_hits = snapshot.embedding_cache_hits,
        cache_misses = snapshot.embedding_cache_misses,
        "session summary"
    );
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
