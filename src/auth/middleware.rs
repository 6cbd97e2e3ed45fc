use crate::auth::auth::{TOKEN_COOKIE, resolve_user};
use crate::auth::store::UsuarioStore;
use crate::config::Config;
use crate::error::AppError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let token = match req.headers().get("Authorization") {
        Some(h) => {
            let header_value = h.to_str().map_err(|_| {
                actix_web::error::ErrorUnauthorized(
                    json!({"error": "Invalid Authorization header encoding"}),
                )
            })?;
            match header_value.strip_prefix("Bearer ") {
                Some(t) => t.to_string(),
                None => {
                    let resp = HttpResponse::Unauthorized()
                        .json(json!({"error": "Authorization header must start with Bearer"}));
                    return Ok(req.into_response(resp.map_into_boxed_body()));
                }
            }
        }
        None => match req.cookie(TOKEN_COOKIE) {
            Some(c) => c.value().to_string(),
            None => {
                let resp = HttpResponse::Unauthorized()
                    .json(json!({"error": "User not authenticated"}));
                return Ok(req.into_response(resp.map_into_boxed_body()));
            }
        },
    };

    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;
    let store = req
        .app_data::<Data<dyn UsuarioStore>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("User store missing"))?;

    // role and departments are reloaded on every request
    let user = match resolve_user(&token, &config, store.get_ref()).await {
        Ok(user) => user,
        Err(e @ AppError::Unauthorized(_)) => {
            debug!(path = %req.path(), "Session rejected");
            return Ok(req.into_response(e.error_response()));
        }
        Err(e) => return Err(e.into()),
    };

    req.extensions_mut().insert(user);

    next.call(req).await
}
