//! Database setup and initialization

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use imagestore_core::Config;
use imagestore_db::{ImageIndex, SqliteImageIndex};
use sqlx::sqlite::SqlitePoolOptions;

/// Connect the SQLite pool and apply migrations.
pub async fn setup_database(config: &Config) -> Result<Arc<dyn ImageIndex>> {
    tracing::info!("Connecting to database...");
    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(30))
        .connect(config.database_url())
        .await
        .with_context(|| format!("Failed to connect to {}", config.database_url()))?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database connected successfully"
    );

    let index = SqliteImageIndex::new(pool);
    index
        .migrate()
        .await
        .context("Failed to run database migrations")?;

    Ok(Arc::new(index))
}
