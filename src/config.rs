use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    /// Lifetime of the session token, in seconds
    pub token_ttl: usize,

    // Database pool
    pub db_max_connections: u32,
    pub db_idle_timeout_secs: u64,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// "Destino" printed on the header of the parte diario
    pub parte_destino: String,
    pub cookie_secure: bool,
    pub log_dir: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            token_ttl: or_default("TOKEN_TTL", 8 * 60 * 60)?, // 8 hours

            db_max_connections: or_default("DB_MAX_CONNECTIONS", 20)?,
            db_idle_timeout_secs: or_default("DB_IDLE_TIMEOUT_SECS", 3)?,

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            parte_destino: env::var("PARTE_DESTINO")
                .unwrap_or_else(|_| "ARSENAL NAVAL PUERTO BELGRANO".to_string()),
            cookie_secure: or_default("COOKIE_SECURE", false)?,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/marcadas_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            token_ttl: 3600,
            db_max_connections: 1,
            db_idle_timeout_secs: 3,
            rate_login_per_min: 60,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            parte_destino: "DESTINO DE PRUEBA".to_string(),
            cookie_secure: false,
            log_dir: "logs".to_string(),
        }
    }
}
