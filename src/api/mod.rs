pub mod departamentos;
pub mod marcadas;
pub mod personal;
pub mod usuarios;

use crate::error::AppError;
use actix_web::web;
use tracing::debug;

/// Missing or malformed query parameters answer with the usual JSON error body
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, req| {
        debug!(error = %err, path = %req.path(), "Rejected query string");
        AppError::bad_request("Faltan parámetros").into()
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::auth::jwt::generate_token;
    use crate::auth::store::{MockUsuarioStore, UsuarioStore};
    use crate::config::Config;
    use crate::model::usuario::Usuario;
    use actix_web::web;
    use sqlx::MySqlPool;
    use sqlx::mysql::MySqlPoolOptions;
    use std::sync::Arc;

    pub fn usuario(username: &str, role: &str, departamento: &str) -> Usuario {
        Usuario {
            id: 9,
            username: username.into(),
            role: role.into(),
            departamento: Some(departamento.into()),
            departamentos_permitidos: vec![],
        }
    }

    /// `Authorization` header value for `username`
    pub fn bearer(username: &str) -> String {
        let token = generate_token(
            &usuario(username, "usuario", ""),
            &Config::for_tests().jwt_secret,
            60,
        )
        .unwrap();
        format!("Bearer {token}")
    }

    /// User store holding exactly `stored`
    pub fn usuarios_with(stored: Vec<Usuario>) -> web::Data<dyn UsuarioStore> {
        let mut store = MockUsuarioStore::new();
        store
            .expect_find_by_username()
            .returning(move |username| Ok(stored.iter().find(|u| u.username == username).cloned()));
        web::Data::from(Arc::new(store) as Arc<dyn UsuarioStore>)
    }

    /// `admin` is an admin of TALLERES, `jperez` a plain user of TALLERES
    pub fn usuarios() -> web::Data<dyn UsuarioStore> {
        usuarios_with(vec![
            usuario("admin", "admin", "TALLERES"),
            usuario("jperez", "usuario", "TALLERES"),
        ])
    }

    /// Pool that never connects; for handlers that fail before querying
    pub fn lazy_pool() -> MySqlPool {
        MySqlPoolOptions::new()
            .connect_lazy("mysql://nobody@127.0.0.1:1/none")
            .unwrap()
    }
}
