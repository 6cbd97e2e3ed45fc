use crate::auth::jwt::verify_token;
use crate::auth::store::UsuarioStore;
use crate::config::Config;
use crate::error::AppError;
use crate::model::role::Role;
use crate::model::usuario::Usuario;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{FutureExt, LocalBoxFuture, ready};
use tracing::debug;

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    /// Role as stored on the web user
    pub role_name: String,
    pub departamento: Option<String>,
    pub departamentos_permitidos: Vec<String>,
}

impl From<Usuario> for AuthUser {
    fn from(usuario: Usuario) -> Self {
        Self {
            role: usuario.role(),
            role_name: usuario.role,
            user_id: usuario.id,
            username: usuario.username,
            departamento: usuario.departamento,
            departamentos_permitidos: usuario.departamentos_permitidos,
        }
    }
}

/// Session token from `Authorization: Bearer ...`, falling back to the `token` cookie.
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Some(header) = req.headers().get("Authorization") {
        return header
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);
    }

    req.cookie(TOKEN_COOKIE).map(|c| c.value().to_string())
}

/// Verifies `token` and loads its user as currently stored. Role and
/// departments always come from the store, never from the token.
pub async fn resolve_user(
    token: &str,
    config: &Config,
    store: &dyn UsuarioStore,
) -> Result<AuthUser, AppError> {
    let claims = verify_token(token, &config.jwt_secret).map_err(|e| {
        debug!(error = %e, "Token verification failed");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    let usuario = store.find_by_username(&claims.sub).await?.ok_or_else(|| {
        debug!(username = %claims.sub, "Token for a user that no longer exists");
        AppError::Unauthorized("User not authenticated".into())
    })?;

    Ok(AuthUser::from(usuario))
}

async fn authenticate(req: HttpRequest) -> Result<AuthUser, AppError> {
    let token = extract_token(&req).ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("Config missing".into()))?;
    let store = req
        .app_data::<Data<dyn UsuarioStore>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("User store missing".into()))?;

    resolve_user(&token, &config, store.get_ref()).await
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>().cloned() {
            return ready(Ok(user)).boxed_local();
        }

        authenticate(req.clone())
            .map(|res| res.map_err(actix_web::Error::from))
            .boxed_local()
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only".into()))
        }
    }

    /// Admins see every department; everyone else only their own and the
    /// ones explicitly allowed.
    pub fn can_access(&self, departamento: &str) -> bool {
        self.role == Role::Admin
            || self.departamento.as_deref() == Some(departamento)
            || self.departamentos_permitidos.iter().any(|d| d == departamento)
    }

    pub fn require_departamento(&self, departamento: &str) -> Result<(), AppError> {
        if self.can_access(departamento) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "No tiene acceso al departamento {departamento}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_token;
    use crate::auth::store::MockUsuarioStore;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "jperez".into(),
            role,
            role_name: String::new(),
            departamento: Some("TALLERES".into()),
            departamentos_permitidos: vec!["ARMAMENTO".into()],
        }
    }

    #[test]
    fn admin_accesses_every_department() {
        assert!(user(Role::Admin).can_access("CONTADURIA"));
        assert!(user(Role::Admin).require_admin().is_ok());
    }

    #[test]
    fn user_accesses_own_and_allowed_departments_only() {
        let u = user(Role::Usuario);

        assert!(u.can_access("TALLERES"));
        assert!(u.can_access("ARMAMENTO"));
        assert!(!u.can_access("CONTADURIA"));
        assert!(matches!(
            u.require_departamento("CONTADURIA"),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(u.require_admin(), Err(AppError::Forbidden(_))));
    }

    fn stored(departamentos_permitidos: Vec<String>) -> Usuario {
        Usuario {
            id: 5,
            username: "jperez".into(),
            role: "usuario".into(),
            departamento: Some("TALLERES".into()),
            departamentos_permitidos,
        }
    }

    fn token_for(username: &str) -> String {
        let usuario = Usuario {
            username: username.into(),
            ..stored(vec![])
        };
        generate_token(&usuario, &Config::for_tests().jwt_secret, 60).unwrap()
    }

    #[actix_web::test]
    async fn resolved_user_reflects_stored_departments() {
        let mut store = MockUsuarioStore::new();
        store
            .expect_find_by_username()
            .withf(|username| username == "jperez")
            .times(1)
            .returning(|_| Ok(Some(stored(vec![]))));

        let user = resolve_user(&token_for("jperez"), &Config::for_tests(), &store)
            .await
            .unwrap();

        assert_eq!(user.user_id, 5);
        assert_eq!(user.role, Role::Usuario);
        assert!(user.can_access("TALLERES"));
        assert!(!user.can_access("ARMAMENTO"));
    }

    #[actix_web::test]
    async fn deleted_user_is_unauthorized() {
        let mut store = MockUsuarioStore::new();
        store.expect_find_by_username().returning(|_| Ok(None));

        let result = resolve_user(&token_for("jperez"), &Config::for_tests(), &store).await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[actix_web::test]
    async fn bad_token_never_reaches_store() {
        let mut store = MockUsuarioStore::new();
        store.expect_find_by_username().never();

        let result = resolve_user("not-a-jwt", &Config::for_tests(), &store).await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
