use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::usuario::Usuario;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "jperez")]
    pub username: String,
    #[schema(example = "secreto123")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub usuario: Usuario,
}

/// Session token claims. Identity only; role and departments are loaded
/// from `WebUsers` on each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub jti: String,
}
