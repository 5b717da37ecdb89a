//! Portico server binary.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use portico::api::router;
use portico::rag::seed_corpus;
use portico::{AppConfig, AppState};

#[derive(Debug, Parser)]
#[command(name = "portico-server", about = "Self-hosted RAG chatbot backend", version)]
struct Args {
    /// Bind address; overrides HOST from the environment.
    #[arg(long)]
    host: Option<String>,

    /// Bind port; overrides PORT from the environment.
    #[arg(long)]
    port: Option<u16>,

    /// Embed and store the FAQ corpus before serving.
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let state = AppState::from_config(config);
    info!(
        chat_providers = ?state.chat.provider_names(),
        embedding_providers = ?state.embeddings.provider_names(),
        "provider chains configured"
    );

    if args.seed {
        let count = seed_corpus(&state.embeddings, state.vectors.as_ref()).await?;
        info!(count, "FAQ corpus seeded");
    }

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "portico server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
