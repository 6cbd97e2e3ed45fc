use crate::{
    auth::{
        auth::{AuthUser, TOKEN_COOKIE},
        jwt::generate_token,
        password::verify_password,
    },
    config::Config,
    error::AppError,
    model::usuario::{Usuario, WebUserSql},
    models::{LoginReqDto, LoginResponse},
};
use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{HttpResponse, Responder, get, web};
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

pub const SELECT_WEB_USER: &str = r#"
    SELECT id, username, password, role, departamento, departamentosPermitidos AS departamentos_permitidos
    FROM WebUsers
"#;

fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(Duration::seconds(config.token_ttl as i64))
        .finish()
}

/// Login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in; the token is also set as the `token` cookie", body = LoginResponse),
        (status = 400, description = "Missing credentials", body = Object, example = json!({
            "error": "Faltan credenciales"
        })),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "error": "Credenciales incorrectas"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::bad_request("Faltan credenciales"));
    }

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, WebUserSql>(&format!("{SELECT_WEB_USER} WHERE username = ?"))
        .bind(user.username.trim())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Database error while fetching user");
            e
        })?;

    let Some(db_user) = db_user else {
        info!("Invalid credentials: user not found");
        return Err(AppError::Unauthorized("Credenciales incorrectas".into()));
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Credenciales incorrectas".into()));
    }

    debug!(user_id = db_user.id, "Password verified");

    let usuario = Usuario::from(db_user);
    let token = generate_token(&usuario, &config.jwt_secret, config.token_ttl)?;

    info!(role = ?usuario.role(), "Login successful");

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token.clone(), &config))
        .json(LoginResponse { token, usuario }))
}

/// Logout
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Session cookie cleared")),
    tag = "Auth"
)]
pub async fn logout(config: web::Data<Config>) -> impl Responder {
    let mut cookie = session_cookie(String::new(), &config);
    cookie.make_removal();

    HttpResponse::NoContent().cookie(cookie).finish()
}

/// Current user, as currently stored
#[utoipa::path(
    get,
    path = "/api/usuario/me",
    responses(
        (status = 200, description = "Authenticated user", body = Object, example = json!({
            "id": 1,
            "username": "jperez",
            "role": "admin",
            "departamento": "TALLERES",
            "departamentosPermitidos": ["ARMAMENTO"]
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[get("/usuario/me")]
pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "id": auth.user_id,
        "username": auth.username,
        "role": auth.role_name,
        "departamento": auth.departamento,
        "departamentosPermitidos": auth.departamentos_permitidos,
    }))
}
