use anyhow::{Context, Result};
use pooldash::db::PositionRepository;
use pooldash::{
    api, init_db, Config, FallbackLookup, PositionLookup, PositionStore, Repository,
    SimulatedLookup, SnapshotFile, SubgraphLookup,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let port = config.port;

    let repo: Option<Arc<dyn PositionRepository>> = match &config.database_path {
        Some(path) => {
            let pool = init_db(path)
                .await
                .with_context(|| format!("failed to initialize database at {}", path))?;
            Some(Arc::new(Repository::new(pool)))
        }
        None => {
            info!("DATABASE_PATH not set, running local-only");
            None
        }
    };
    let snapshot = config.snapshot_path.as_ref().map(SnapshotFile::new);

    let store = Arc::new(PositionStore::with_parts(repo, snapshot));
    let status = store.load().await;
    info!(?status, "Position store ready");

    let subgraph = SubgraphLookup::new(config.subgraph_url.clone(), config.lookup_timeout);
    let lookup: Arc<dyn PositionLookup> = if config.simulated_fallback {
        Arc::new(FallbackLookup::new(
            Arc::new(subgraph),
            Arc::new(SimulatedLookup::new()),
        ))
    } else {
        Arc::new(subgraph)
    };

    let app = api::create_router(api::AppState::new(store, lookup, config));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
