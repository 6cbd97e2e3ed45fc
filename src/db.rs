use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn init_db(config: &Config) -> Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(0)
        .idle_timeout(Duration::from_secs(config.db_idle_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

/// Pings the database, giving up after five seconds.
pub async fn check_database_connection(pool: &MySqlPool) -> bool {
    let ping = sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool);

    match actix_web::rt::time::timeout(HEALTH_CHECK_TIMEOUT, ping).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "Database health check failed");
            false
        }
        Err(_) => {
            warn!("Database health check timed out");
            false
        }
    }
}
