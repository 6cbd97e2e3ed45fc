use std::time::{SystemTime, UNIX_EPOCH};

use crate::{error::AppError, model::usuario::Usuario, models::Claims};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

/// Issues a session token for `usuario`, valid for `ttl` seconds.
pub fn generate_token(usuario: &Usuario, secret: &str, ttl: usize) -> Result<String, AppError> {
    let claims = Claims {
        sub: usuario.username.clone(),
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usuario() -> Usuario {
        Usuario {
            id: 5,
            username: "jperez".into(),
            role: "supervisor".into(),
            departamento: Some("TALLERES".into()),
            departamentos_permitidos: vec!["ARMAMENTO".into()],
        }
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let token = generate_token(&usuario(), "s3cret", 60).unwrap();

        let claims = verify_token(&token, "s3cret").unwrap();

        assert_eq!(claims.sub, "jperez");
        assert!(claims.exp > now());
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn token_carries_no_permissions() {
        let token = generate_token(&usuario(), "s3cret", 60).unwrap();

        let payload: serde_json::Value = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"s3cret"),
            &Validation::default(),
        )
        .unwrap()
        .claims;

        let mut keys: Vec<&str> = payload.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["exp", "jti", "sub"]);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = generate_token(&usuario(), "s3cret", 60).unwrap();

        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: "old".into(),
            exp: now() - 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();

        assert!(verify_token(&token, "s3cret").is_err());
    }
}
