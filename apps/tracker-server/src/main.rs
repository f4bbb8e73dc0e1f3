//! Defect tracker server binary.

use std::net::SocketAddr;

use record_store::{MemoryRecordStore, RecordStore, SqliteRecordStore};
use tracker_server::{bootstrap_admin, config::Config, create_app, create_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(database_url = %config.database_url, "Starting tracker server");

    if config.uses_memory_store() {
        serve(config, MemoryRecordStore::new()).await
    } else {
        let store = SqliteRecordStore::connect(&config.database_url).await?;
        serve(config, store).await
    }
}

async fn serve<S: RecordStore + 'static>(config: Config, store: S) -> anyhow::Result<()> {
    let addr: SocketAddr = config.server_addr().parse()?;

    let state = create_state(config, store);
    bootstrap_admin(&state).await?;

    let app = create_app(state);

    tracing::info!(addr = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
