use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::error;

use crate::auth::handlers::SELECT_WEB_USER;
use crate::error::AppResult;
use crate::model::usuario::{Usuario, WebUserSql};

/// Current state of web users, consulted on every authenticated request
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsuarioStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<Usuario>>;
}

pub struct MySqlUsuarioStore {
    pool: MySqlPool,
}

impl MySqlUsuarioStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsuarioStore for MySqlUsuarioStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<Usuario>> {
        let row = sqlx::query_as::<_, WebUserSql>(&format!("{SELECT_WEB_USER} WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, username, "Failed to load web user");
                e
            })?;

        Ok(row.map(Usuario::from))
    }
}
