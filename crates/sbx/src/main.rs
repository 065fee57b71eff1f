use std::sync::Arc;

use sbx_core::{blocklist::BlockStore, config::Config};
use sbx_sqlite::SqliteBlockStore;

#[tokio::main]
async fn main() -> Result<(), sbx_core::Error> {
    sbx_core::logging::init("sbx")?;

    let cfg = Arc::new(Config::load()?);

    let store: Arc<dyn BlockStore> =
        Arc::new(SqliteBlockStore::open(&cfg.db_path.to_string_lossy()).await?);

    sbx_telegram::router::run(cfg, store)
        .await
        .map_err(|e| sbx_core::Error::Delivery(format!("telegram bot failed: {e}")))?;

    Ok(())
}
