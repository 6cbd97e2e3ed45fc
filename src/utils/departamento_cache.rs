use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::debug;

use crate::error::AppResult;

/// Department name => Deptid. Only found departments are cached.
static DEPT_IDS: Lazy<Cache<String, i64>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1_000)
        .time_to_live(Duration::from_secs(600))
        .build()
});

/// Resolves a department name to its id, `None` when no such department.
pub async fn dept_id(pool: &MySqlPool, dept_name: &str) -> AppResult<Option<i64>> {
    if let Some(id) = DEPT_IDS.get(dept_name).await {
        return Ok(Some(id));
    }

    let id = sqlx::query_scalar::<_, i64>("SELECT Deptid FROM Dept WHERE DeptName = ?")
        .bind(dept_name)
        .fetch_optional(pool)
        .await?;

    if let Some(id) = id {
        debug!(dept_name, id, "Caching department id");
        DEPT_IDS.insert(dept_name.to_string(), id).await;
    }

    Ok(id)
}

/// Drops every cached entry; department names may have changed.
pub fn invalidate_all() {
    DEPT_IDS.invalidate_all();
}

#[cfg(test)]
pub async fn prime(dept_name: &str, id: i64) {
    DEPT_IDS.insert(dept_name.to_string(), id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::mysql::MySqlPoolOptions;

    #[actix_web::test]
    async fn cached_name_resolves_without_querying() {
        // lazy pool never connects unless a query runs
        let pool = MySqlPoolOptions::new()
            .connect_lazy("mysql://nobody@127.0.0.1:1/none")
            .unwrap();

        prime("CACHE_TEST_DEPT", 42).await;

        assert_eq!(dept_id(&pool, "CACHE_TEST_DEPT").await.unwrap(), Some(42));
    }
}
