use crate::{
    auth::{auth::AuthUser, handlers::SELECT_WEB_USER, password::hash_password},
    error::{AppError, AppResult},
    model::usuario::{Usuario, WebUserSql},
    utils::db_utils::{SqlValue, build_update_sql, execute_update},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUsuario {
    #[schema(example = "jperez")]
    pub username: String,
    #[schema(example = "secreto1", format = "password")]
    pub password: String,
    #[serde(default = "default_role")]
    #[schema(example = "usuario")]
    pub role: String,
    #[schema(example = "TALLERES")]
    pub departamento: Option<String>,
    #[serde(rename = "departamentosPermitidos", default)]
    pub departamentos_permitidos: Vec<String>,
}

fn default_role() -> String {
    "usuario".to_string()
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUsuario {
    pub role: Option<String>,
    pub departamento: Option<String>,
    #[serde(rename = "departamentosPermitidos")]
    pub departamentos_permitidos: Option<Vec<String>>,
    #[schema(format = "password")]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepartamentosPermitidos {
    #[serde(rename = "departamentosPermitidos")]
    #[schema(example = json!(["ARMAMENTO", "TALLERES"]))]
    pub departamentos_permitidos: Vec<String>,
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "La contraseña debe tener al menos {MIN_PASSWORD_LEN} caracteres"
        )));
    }
    Ok(())
}

fn departamentos_json(departamentos: &[String]) -> AppResult<String> {
    serde_json::to_string(departamentos)
        .map_err(|e| AppError::Internal(format!("Failed to encode departments: {e}")))
}

impl UpdateUsuario {
    /// Column assignments for the fields present; the password is hashed here.
    fn assignments(&self) -> AppResult<Vec<(&'static str, SqlValue)>> {
        let mut assignments = Vec::new();

        if let Some(role) = &self.role {
            assignments.push(("role", SqlValue::String(role.trim().to_string())));
        }
        if let Some(departamento) = &self.departamento {
            let departamento = departamento.trim();
            let value = if departamento.is_empty() {
                SqlValue::Null
            } else {
                SqlValue::String(departamento.to_string())
            };
            assignments.push(("departamento", value));
        }
        if let Some(departamentos) = &self.departamentos_permitidos {
            assignments.push((
                "departamentosPermitidos",
                SqlValue::String(departamentos_json(departamentos)?),
            ));
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
            assignments.push(("password", SqlValue::String(hash_password(password)?)));
        }

        Ok(assignments)
    }
}

async fn require_usuario(pool: &MySqlPool, username: &str) -> AppResult<Usuario> {
    sqlx::query_as::<_, WebUserSql>(&format!("{SELECT_WEB_USER} WHERE username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await?
        .map(Usuario::from)
        .ok_or_else(|| AppError::not_found(format!("Usuario {username} no encontrado")))
}

/// List web users
#[utoipa::path(
    get,
    path = "/api/usuarios",
    responses(
        (status = 200, description = "All web users", body = [Usuario]),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Usuarios"
)]
pub async fn list_usuarios(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let rows = sqlx::query_as::<_, WebUserSql>(&format!("{SELECT_WEB_USER} ORDER BY username"))
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list web users");
            e
        })?;

    let usuarios: Vec<Usuario> = rows.into_iter().map(Usuario::from).collect();
    Ok(HttpResponse::Ok().json(usuarios))
}

/// Create a web user
#[utoipa::path(
    post,
    path = "/api/usuarios",
    request_body = CreateUsuario,
    responses(
        (status = 201, description = "User created", body = Usuario),
        (status = 400, description = "Invalid payload", body = Object, example = json!({
            "error": "La contraseña debe tener al menos 6 caracteres"
        })),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Username taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Usuarios"
)]
#[instrument(skip(auth, pool, payload), fields(user = %auth.username, new_user = %payload.username))]
pub async fn create_usuario(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUsuario>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let username = payload.username.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("El usuario es obligatorio"));
    }
    validate_password(&payload.password)?;

    let departamento = payload
        .departamento
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    let hash = hash_password(&payload.password)?;

    let result = sqlx::query(
        r#"
        INSERT INTO WebUsers (username, password, role, departamento, departamentosPermitidos)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(hash)
    .bind(payload.role.trim())
    .bind(&departamento)
    .bind(departamentos_json(&payload.departamentos_permitidos)?)
    .execute(pool.get_ref())
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("El usuario {username} ya existe"))
        }
        other => {
            error!(error = %other, "Failed to insert web user");
            AppError::from(other)
        }
    })?;

    info!("Web user created");

    Ok(HttpResponse::Created().json(Usuario {
        id: result.last_insert_id() as i64,
        username: username.to_string(),
        role: payload.role.trim().to_string(),
        departamento,
        departamentos_permitidos: payload.departamentos_permitidos.clone(),
    }))
}

/// Partially update a web user
#[utoipa::path(
    put,
    path = "/api/usuarios/{username}",
    params(("username" = String, Path, description = "Username")),
    request_body = UpdateUsuario,
    responses(
        (status = 200, description = "Updated, or nothing to change", body = Object, example = json!({
            "message": "Usuario actualizado"
        })),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Usuarios"
)]
#[instrument(skip(auth, pool, payload), fields(user = %auth.username))]
pub async fn update_usuario(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<UpdateUsuario>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let username = path.into_inner();

    let assignments = payload.assignments()?;
    require_usuario(&pool, &username).await?;

    let Some(update) = build_update_sql(
        "WebUsers",
        assignments,
        "username",
        SqlValue::String(username.clone()),
    ) else {
        return Ok(HttpResponse::Ok().json(json!({ "message": "Sin cambios" })));
    };

    execute_update(pool.get_ref(), update).await?;
    info!(%username, "Web user updated");

    Ok(HttpResponse::Ok().json(json!({ "message": "Usuario actualizado" })))
}

/// Delete a web user
#[utoipa::path(
    delete,
    path = "/api/usuarios/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Usuarios"
)]
#[instrument(skip(auth, pool), fields(user = %auth.username))]
pub async fn delete_usuario(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let username = path.into_inner();

    if username == auth.username {
        return Err(AppError::bad_request("No puede eliminar su propio usuario"));
    }

    let result = sqlx::query("DELETE FROM WebUsers WHERE username = ?")
        .bind(&username)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Usuario {username} no encontrado")));
    }

    info!(%username, "Web user deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Replace the departments a web user may see besides their own
#[utoipa::path(
    put,
    path = "/api/usuarios/{username}/departamentos",
    params(("username" = String, Path, description = "Username")),
    request_body = DepartamentosPermitidos,
    responses(
        (status = 200, description = "Updated user", body = Usuario),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Usuarios"
)]
#[instrument(skip(auth, pool, payload), fields(user = %auth.username))]
pub async fn set_departamentos(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<DepartamentosPermitidos>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let username = path.into_inner();

    let mut usuario = require_usuario(&pool, &username).await?;

    sqlx::query("UPDATE WebUsers SET departamentosPermitidos = ? WHERE username = ?")
        .bind(departamentos_json(&payload.departamentos_permitidos)?)
        .bind(&username)
        .execute(pool.get_ref())
        .await?;

    usuario.departamentos_permitidos = payload.into_inner().departamentos_permitidos;
    info!(%username, count = usuario.departamentos_permitidos.len(), "Allowed departments set");

    Ok(HttpResponse::Ok().json(usuario))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{bearer, lazy_pool, usuarios};
    use crate::config::Config;
    use actix_web::{App, http::StatusCode, test};

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(Config::for_tests()))
                    .app_data(web::Data::new(lazy_pool()))
                    .app_data(usuarios())
                    .route("/usuarios", web::get().to(list_usuarios))
                    .route("/usuarios", web::post().to(create_usuario))
                    .route("/usuarios/{username}", web::delete().to(delete_usuario)),
            )
            .await
        };
    }

    #[core::prelude::v1::test]
    fn short_password_is_rejected() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        // counted in characters, not bytes
        assert!(validate_password("ñññññ").is_err());
    }

    #[core::prelude::v1::test]
    fn update_hashes_password_and_encodes_departments() {
        let update = UpdateUsuario {
            departamentos_permitidos: Some(vec!["ARMAMENTO".into()]),
            password: Some("secreto1".into()),
            ..Default::default()
        };

        let assignments = update.assignments().unwrap();

        assert_eq!(assignments[0].0, "departamentosPermitidos");
        assert_eq!(assignments[0].1, SqlValue::String(r#"["ARMAMENTO"]"#.into()));
        assert_eq!(assignments[1].0, "password");
        match &assignments[1].1 {
            SqlValue::String(hash) => assert!(hash.starts_with("$argon2")),
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[core::prelude::v1::test]
    fn empty_update_has_no_assignments() {
        assert!(UpdateUsuario::default().assignments().unwrap().is_empty());
    }

    #[core::prelude::v1::test]
    fn blank_departamento_clears_it() {
        let update = UpdateUsuario {
            departamento: Some("  ".into()),
            ..Default::default()
        };

        assert_eq!(
            update.assignments().unwrap(),
            vec![("departamento", SqlValue::Null)]
        );
    }

    #[actix_web::test]
    async fn test_non_admin_cannot_list_users() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/usuarios")
            .insert_header(("Authorization", bearer("jperez")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_create_with_short_password_is_bad_request() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/usuarios")
            .insert_header(("Authorization", bearer("admin")))
            .set_json(json!({ "username": "nuevo", "password": "123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_admin_cannot_delete_itself() {
        let app = app!();

        let req = test::TestRequest::delete()
            .uri("/usuarios/admin")
            .insert_header(("Authorization", bearer("admin")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
