use anyhow::{Context, Result};
use tracing::info;

use flexdata_proxy::{AppState, ProxyConfig, init_tracing, router};
use flexdata_storage::SqliteStorage;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = ProxyConfig::from_env();
    let storage = SqliteStorage::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path))?;
    let app = router(AppState::new(storage));

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    info!(addr = %config.addr, db = %config.db_path, "proxy listening");
    axum::serve(listener, app).await?;

    Ok(())
}
